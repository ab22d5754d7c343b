use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use super::*;
use crate::error::TreeError;
use crate::pset::builtins::{image_ops, symbolic_regression};
use crate::tree::MAX_DEPTH;
use crate::value::NdArray;

/// Layout engine that records calls instead of running Graphviz.
#[derive(Clone, Default)]
struct FakeEngine {
    calls: Rc<RefCell<Vec<String>>>,
}

impl LayoutEngine for FakeEngine {
    fn layout(&self, dot: &str) -> Result<String> {
        self.calls.borrow_mut().push("layout".to_string());
        Ok(format!("// laid out\n{}", dot))
    }

    fn draw(&self, dot: &str, format: &str, path: &Path) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(format!("draw {} {}", format, path.display()));
        std::fs::write(path, dot)?;
        Ok(())
    }
}

fn config_in(dir: &Path) -> RenderConfig {
    RenderConfig {
        scratch_dir: dir.join("scratch"),
        ..RenderConfig::default()
    }
}

fn drawer_in(dir: &Path) -> TreeDrawer {
    TreeDrawer::new()
        .with_config(config_in(dir))
        .with_layout_engine(FakeEngine::default())
}

fn symreg_tree(expr: &str) -> Tree {
    Tree::from_expr(expr, Arc::new(symbolic_regression())).unwrap()
}

fn companion_label(graph: &GraphDescription, tree: &Tree) -> Option<String> {
    graph
        .node(&result_id(tree))
        .and_then(|n| n.attrs.get("label"))
        .map(str::to_string)
}

#[test]
fn test_default_rule_order() {
    let drawer = TreeDrawer::new();
    assert_eq!(drawer.rule_names(), vec!["terminal", "image", "text"]);
}

#[test]
fn test_add_x_3_default_rules() {
    let dir = tempfile::tempdir().unwrap();
    let drawer = drawer_in(dir.path());
    let mut tree = symreg_tree("add(x, 3)");
    let graph = drawer.build_graph(&mut tree, &[Value::Int(7)]).unwrap();

    assert_eq!(companion_label(&graph, &tree), Some("10".to_string()));
    let root = graph.node(&tree.id().to_string()).unwrap();
    assert_eq!(root.attrs.get("label"), Some("add"));

    // `x` is a renamed argument, so the default matcher treats it as a
    // plain terminal; both leaves stay undecorated.
    for leaf in tree.children() {
        assert!(graph.has_node(&leaf.id().to_string()));
        assert!(!graph.has_node(&result_id(leaf)));
    }
    assert_eq!(graph.node_count(), 4);
    assert!(dir.path().join("scratch").is_dir());
}

#[test]
fn test_argument_kind_matcher_shows_bound_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let drawer = TreeDrawer::with_argument_matcher(argument_kind_matcher)
        .with_config(config_in(dir.path()))
        .with_layout_engine(FakeEngine::default());
    let mut tree = symreg_tree("add(x, 3)");
    let graph = drawer.build_graph(&mut tree, &[Value::Int(7)]).unwrap();

    let x = &tree.children()[0];
    let three = &tree.children()[1];
    assert_eq!(companion_label(&graph, x), Some("7".to_string()));
    assert_eq!(companion_label(&graph, three), None);
    assert_eq!(
        graph.node(&result_id(x)).unwrap().attrs.get("shape"),
        Some("plaintext")
    );
}

#[test]
fn test_child_edges_point_back() {
    let dir = tempfile::tempdir().unwrap();
    let drawer = drawer_in(dir.path());
    let mut tree = symreg_tree("sub(neg(x), 1)");
    let graph = drawer.build_graph(&mut tree, &[Value::Float(0.5)]).unwrap();

    let root = tree.id().to_string();
    let kids: Vec<String> = tree.children().iter().map(|c| c.id().to_string()).collect();
    for kid in &kids {
        assert_eq!(graph.edge(&root, kid).unwrap().attrs.get("dir"), Some("back"));
    }
    // the companion edge comes first, then children left to right
    let succ = graph.successors(&root);
    assert_eq!(succ[0], result_id(&tree));
    assert_eq!(&succ[1..], &[kids[0].as_str(), kids[1].as_str()]);
}

#[test]
fn test_registered_rule_fires_for_every_node() {
    let dir = tempfile::tempdir().unwrap();
    let mut drawer = drawer_in(dir.path());
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    drawer.register_draw_rule(
        "star",
        |_: &Tree| true,
        move |ctx, t| {
            counter.set(counter.get() + 1);
            draw_text(ctx, t, "*");
            Ok(())
        },
    );
    assert_eq!(drawer.rule_names()[0], "star");

    let mut tree = symreg_tree("mul(x, cos(x))");
    let graph = drawer.build_graph(&mut tree, &[Value::Float(0.0)]).unwrap();

    assert_eq!(hits.get(), tree.len());
    for node in tree.nodes() {
        assert_eq!(companion_label(&graph, node), Some("*".to_string()));
        let holder = format!("{}-resultholder", node.id());
        assert!(graph.subgraph(&holder).is_some());
    }
}

#[test]
fn test_panicking_predicate_falls_back_to_text() {
    let dir = tempfile::tempdir().unwrap();
    let mut drawer = drawer_in(dir.path());
    drawer
        .clear_draw_rules()
        .register_draw_rule(
            "explodes",
            |_: &Tree| panic!("predicate blew up"),
            |_, _| Ok(()),
        );

    let mut tree = symreg_tree("add(x, 3)");
    let graph = drawer.build_graph(&mut tree, &[Value::Int(7)]).unwrap();

    assert_eq!(companion_label(&graph, &tree), Some("10".to_string()));
    assert_eq!(
        companion_label(&graph, &tree.children()[0]),
        Some("7".to_string())
    );
    assert_eq!(
        companion_label(&graph, &tree.children()[1]),
        Some("3".to_string())
    );
}

#[test]
fn test_failing_strategy_defers_to_lower_rules() {
    let dir = tempfile::tempdir().unwrap();
    let mut drawer = drawer_in(dir.path());
    drawer.register_draw_rule(
        "broken",
        |_: &Tree| true,
        |_, _| Err(TreeError::Eval("boom".to_string())),
    );

    let mut tree = symreg_tree("add(x, 3)");
    let graph = drawer.build_graph(&mut tree, &[Value::Int(7)]).unwrap();

    assert_eq!(companion_label(&graph, &tree), Some("10".to_string()));
    assert!(!graph.has_node(&result_id(&tree.children()[1])));
}

#[test]
fn test_panicking_strategy_falls_back_to_lower_rules() {
    let dir = tempfile::tempdir().unwrap();
    let mut drawer = drawer_in(dir.path());
    drawer.register_draw_rule(
        "explodes",
        |_: &Tree| true,
        |_, _| panic!("strategy blew up"),
    );

    let mut tree = symreg_tree("mul(x, neg(2))");
    let graph = drawer.build_graph(&mut tree, &[Value::Int(3)]).unwrap();

    assert_eq!(companion_label(&graph, &tree), Some("-6".to_string()));
    let neg = &tree.children()[1];
    assert_eq!(companion_label(&graph, neg), Some("-2".to_string()));
    // the terminal rule still claims both leaves
    assert_eq!(companion_label(&graph, &tree.children()[0]), None);
    assert_eq!(companion_label(&graph, &neg.children()[0]), None);
}

#[test]
fn test_panicking_strategy_with_no_other_rules_uses_text() {
    let dir = tempfile::tempdir().unwrap();
    let mut drawer = drawer_in(dir.path());
    drawer
        .clear_draw_rules()
        .register_draw_rule(
            "explodes",
            |_: &Tree| true,
            |ctx, t| {
                draw_text(ctx, t, "half drawn");
                panic!("strategy blew up")
            },
        );

    let mut tree = symreg_tree("add(x, 3)");
    let graph = drawer.build_graph(&mut tree, &[Value::Int(7)]).unwrap();

    let expected = ["10", "7", "3"];
    for (node, label) in tree.nodes().into_iter().zip(expected) {
        assert_eq!(companion_label(&graph, node), Some(label.to_string()));
    }
}

#[test]
fn test_failed_strategy_leaves_no_partial_drawing() {
    let dir = tempfile::tempdir().unwrap();
    let mut drawer = drawer_in(dir.path());
    drawer.register_draw_rule(
        "half-drawn",
        |_: &Tree| true,
        |ctx, t| {
            ctx.graph()
                .add_node(&t.id().to_string(), Attrs::new().with("color", "red"));
            draw_text(ctx, t, "partial");
            Err(TreeError::Eval("gave up".to_string()))
        },
    );

    let mut tree = symreg_tree("add(x, 3)");
    let graph = drawer.build_graph(&mut tree, &[Value::Int(7)]).unwrap();

    let root = graph.node(&tree.id().to_string()).unwrap();
    assert_eq!(root.attrs.get("color"), None);
    assert_eq!(companion_label(&graph, &tree), Some("10".to_string()));
    for leaf in tree.children() {
        let id = leaf.id().to_string();
        assert!(!graph.has_node(&result_id(leaf)));
        assert!(graph.edge(&id, &result_id(leaf)).is_none());
        assert!(graph.subgraph(&format!("{}-resultholder", id)).is_none());
    }
    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.subgraphs().len(), 1);
}

#[test]
fn test_deepest_allowed_tree_renders() {
    let dir = tempfile::tempdir().unwrap();
    let drawer = drawer_in(dir.path());
    let expr = format!(
        "{}x{}",
        "neg(".repeat(MAX_DEPTH - 1),
        ")".repeat(MAX_DEPTH - 1)
    );
    let mut tree = symreg_tree(&expr);
    let rendered = drawer.render(&mut tree, &[Value::Int(1)]).unwrap();

    // every `neg` gets a companion, the `x` leaf does not
    assert_eq!(rendered.graph().node_count(), 2 * MAX_DEPTH - 1);
    assert!(rendered.laid_out().starts_with("// laid out\n"));
}

#[test]
fn test_cleared_rules_leave_only_the_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let mut drawer = drawer_in(dir.path());
    drawer.clear_draw_rules();
    assert!(drawer.rule_names().is_empty());

    let mut tree = symreg_tree("neg(2)");
    let graph = drawer.build_graph(&mut tree, &[Value::Int(1)]).unwrap();
    assert_eq!(companion_label(&graph, &tree), Some("-2".to_string()));
    assert_eq!(
        companion_label(&graph, &tree.children()[0]),
        Some("2".to_string())
    );
}

#[test]
fn test_image_node_is_pinned_beside_its_node() {
    let dir = tempfile::tempdir().unwrap();
    let drawer = drawer_in(dir.path());
    let mut tree = Tree::from_expr("flipH(img)", Arc::new(image_ops())).unwrap();
    let img = NdArray::from_rows(&[vec![0.0, 1.0], vec![2.0, 3.0]]).unwrap();
    let graph = drawer
        .build_graph(&mut tree, &[Value::Array(img)])
        .unwrap();

    let id = tree.id().to_string();
    let companion = result_id(&tree);
    let expected: PathBuf = dir.path().join("scratch").join(format!("{}.png", id));
    assert!(expected.is_file());

    let attrs = &graph.node(&companion).unwrap().attrs;
    assert_eq!(attrs.get("image"), Some(expected.display().to_string().as_str()));
    assert_eq!(attrs.get("label"), Some(""));
    assert_eq!(attrs.get("fixedsize"), Some("true"));
    assert_eq!(attrs.get("width"), Some("2"));
    assert_eq!(attrs.get("height"), Some("2"));

    let edge = graph.edge(&id, &companion).unwrap();
    assert_eq!(edge.attrs.get("style"), Some("invis"));
    assert_eq!(edge.attrs.get("dir"), Some("both"));

    let holder = graph.subgraph(&format!("{}-resultholder", id)).unwrap();
    assert_eq!(holder.members, vec![id.clone(), companion.clone()]);
    assert_eq!(holder.attrs.get("rank"), Some("same"));
}

#[test]
fn test_draw_image_requires_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::create_dir_all(&config.scratch_dir).unwrap();
    let sink = PngSink::default();
    let mut graph = GraphDescription::new();
    let tree = Tree::from_expr("transpose(img)", Arc::new(image_ops())).unwrap();

    let mut ctx = DrawContext::new(&mut graph, &config, &sink);
    let err = draw_image(&mut ctx, &tree).unwrap_err();
    assert!(matches!(err, TreeError::NotEvaluated { .. }));
    assert!(err.to_string().contains("evaluate_all"));
    assert!(!ctx.artifact_path(&tree).exists());
    assert!(!graph.has_node(&result_id(&tree)));
}

#[test]
fn test_evaluation_errors_abort_the_render() {
    let dir = tempfile::tempdir().unwrap();
    let drawer = drawer_in(dir.path());
    let mut tree = symreg_tree("add(x, 3)");
    let err = drawer.build_graph(&mut tree, &[]).unwrap_err();
    assert!(matches!(err, TreeError::ArgumentCount { .. }));
}

#[test]
fn test_render_and_save_go_through_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine::default();
    let drawer = TreeDrawer::new()
        .with_config(config_in(dir.path()))
        .with_layout_engine(engine.clone());

    let mut tree = symreg_tree("sin(x)");
    let rendered = drawer.render(&mut tree, &[Value::Float(0.0)]).unwrap();
    assert!(rendered.laid_out().starts_with("// laid out\ndigraph {"));
    assert_eq!(rendered.graph().node_count(), 3);

    let out = dir.path().join("tree.svg");
    engine.calls.borrow_mut().clear();
    drawer.save_render(&out, &mut tree, &[Value::Float(0.0)]).unwrap();
    assert_eq!(
        *engine.calls.borrow(),
        vec!["layout".to_string(), format!("draw svg {}", out.display())]
    );
    // the drawing is made from the laid-out text
    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("// laid out\ndigraph {"));
    assert!(written.contains("sin"));
}
