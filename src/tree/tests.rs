use std::sync::Arc;

use super::*;
use crate::pset::builtins::{image_ops, symbolic_regression};
use crate::value::NdArray;

fn symreg() -> Arc<PrimitiveSet> {
    Arc::new(symbolic_regression())
}

/// `[add, x, 3]` built by hand, as a GP generator emits it.
fn add_x_3(pset: &PrimitiveSet) -> Vec<Node> {
    vec![
        pset.primitive("add").unwrap(),
        pset.terminal("x").unwrap(),
        PrimitiveSet::literal(3i64),
    ]
}

#[test]
fn test_reconstruct_add_x_3() {
    let pset = symreg();
    let tree = Tree::reconstruct(&add_x_3(&pset), pset.clone()).unwrap();
    assert_eq!(tree.node().name(), "add");
    assert_eq!(tree.children().len(), 2);
    assert_eq!(tree.children()[0].node().name(), "x");
    assert_eq!(tree.children()[1].node().name(), "3");
    insta::assert_snapshot!(tree.to_string(), @"add(x, 3)");
}

#[test]
fn test_evaluate_all_fills_every_node() {
    let pset = symreg();
    let mut tree = Tree::reconstruct(&add_x_3(&pset), pset.clone()).unwrap();
    assert!(tree.nodes().iter().all(|t| t.value().is_none()));

    tree.evaluate_all(&[Value::Int(7)]).unwrap();

    assert_eq!(tree.value(), Some(&Value::Int(10)));
    assert_eq!(tree.children()[0].value(), Some(&Value::Int(7)));
    assert_eq!(tree.children()[1].value(), Some(&Value::Int(3)));
}

#[test]
fn test_reconstruction_consumes_whole_sequence() {
    let pset = symreg();
    let seq = pset
        .parse("add(mul(x, sin(x)), protectedDiv(neg(x), sub(1, cos(x))))")
        .unwrap();
    let tree = Tree::reconstruct(&seq, pset.clone()).unwrap();
    assert_eq!(tree.len(), seq.len());
    assert_eq!(tree.height(), 4);
}

#[test]
fn test_truncated_sequence_is_fatal() {
    let pset = symreg();
    let mut seq = add_x_3(&pset);
    seq.pop();
    let err = Tree::reconstruct(&seq, pset.clone()).unwrap_err();
    assert!(matches!(
        err,
        TreeError::TruncatedSequence {
            needed_at: 2,
            len: 2
        }
    ));
}

#[test]
fn test_trailing_nodes_are_fatal() {
    let pset = symreg();
    let mut seq = add_x_3(&pset);
    seq.push(pset.terminal("x").unwrap());
    let err = Tree::reconstruct(&seq, pset.clone()).unwrap_err();
    assert!(matches!(
        err,
        TreeError::TrailingNodes {
            consumed: 3,
            len: 4
        }
    ));
}

#[test]
fn test_empty_sequence_is_fatal() {
    let err = Tree::reconstruct(&[], symreg()).unwrap_err();
    assert!(matches!(err, TreeError::EmptySequence));
}

#[test]
fn test_nodes_recover_prefix_order() {
    let pset = symreg();
    let seq = pset.parse("sub(mul(x, 2), neg(x))").unwrap();
    let tree = Tree::reconstruct(&seq, pset.clone()).unwrap();
    let names: Vec<&str> = tree.nodes().iter().map(|t| t.node().name()).collect();
    assert_eq!(names, vec!["sub", "mul", "x", "2", "neg", "x"]);
    let flat = tree.flatten();
    assert!(flat.iter().zip(&seq).all(|(a, b)| a.same_as(b)));
}

#[test]
fn test_format_roundtrip_recompiles_equivalently() {
    let pset = symreg();
    let seq = pset
        .parse("add(protectedDiv(x, sub(x, 2)), mul(cos(x), -1))")
        .unwrap();
    let tree = Tree::reconstruct(&seq, pset.clone()).unwrap();

    let reparsed = Tree::from_expr(&tree.to_string(), pset.clone()).unwrap();
    let direct = Tree::reconstruct(&seq, pset.clone()).unwrap().compile().unwrap();
    let roundtrip = reparsed.compile().unwrap();

    for x in [-3i64, 0, 2, 5] {
        let args = [Value::Int(x)];
        assert_eq!(direct.run(&args).unwrap(), roundtrip.run(&args).unwrap());
    }
    for x in [-0.5, 0.1, 1.9] {
        let args = [Value::Float(x)];
        assert_eq!(direct.run(&args).unwrap(), roundtrip.run(&args).unwrap());
    }
}

#[test]
fn test_identical_sequences_give_equal_structure_distinct_ids() {
    let pset = symreg();
    let seq = pset.parse("add(x, x)").unwrap();
    let a = Tree::reconstruct(&seq, pset.clone()).unwrap();
    let b = Tree::reconstruct(&seq, pset.clone()).unwrap();
    assert_eq!(a.content_hash(), b.content_hash());
    assert_ne!(a.id(), b.id());
    // The two `x` leaves are structurally equal but distinct instances.
    assert_ne!(a.children()[0].id(), a.children()[1].id());
}

#[test]
fn test_clone_allocates_fresh_ids() {
    let pset = symreg();
    let tree = Tree::from_expr("neg(x)", pset).unwrap();
    let copy = tree.clone();
    assert_ne!(tree.id(), copy.id());
    assert_ne!(tree.children()[0].id(), copy.children()[0].id());
    assert_eq!(tree.content_hash(), copy.content_hash());
}

#[test]
fn test_new_checks_arity() {
    let pset = symreg();
    let add = pset.primitive("add").unwrap();
    let leaf = Tree::new(pset.terminal("x").unwrap(), vec![], pset.clone()).unwrap();
    let err = Tree::new(add, vec![leaf], pset.clone()).unwrap_err();
    assert!(matches!(
        err,
        TreeError::Arity {
            expected: 2,
            found: 1,
            ..
        }
    ));
}

/// `negs` nested `neg` calls around `x`: a chain of `negs + 1` levels.
fn neg_chain(pset: &PrimitiveSet, negs: usize) -> Vec<Node> {
    let mut seq = vec![pset.primitive("neg").unwrap(); negs];
    seq.push(pset.terminal("x").unwrap());
    seq
}

#[test]
fn test_deepest_allowed_tree_is_usable() {
    let pset = symreg();
    let mut tree = Tree::reconstruct(&neg_chain(&pset, MAX_DEPTH - 1), pset.clone()).unwrap();
    assert_eq!(tree.height(), MAX_DEPTH - 1);

    tree.evaluate_all(&[Value::Int(1)]).unwrap();
    let sign = if (MAX_DEPTH - 1) % 2 == 0 { 1 } else { -1 };
    assert_eq!(tree.value(), Some(&Value::Int(sign)));

    let reparsed = Tree::from_expr(&tree.to_string(), pset.clone()).unwrap();
    assert_eq!(reparsed.content_hash(), tree.content_hash());
    assert_eq!(tree.clone().len(), MAX_DEPTH);
}

#[test]
fn test_sequences_deeper_than_the_limit_are_rejected() {
    let pset = symreg();
    let err = Tree::reconstruct(&neg_chain(&pset, MAX_DEPTH), pset.clone()).unwrap_err();
    assert!(matches!(err, TreeError::TooDeep { max: MAX_DEPTH }));

    // far past the limit, still an error and not a crash
    let err = Tree::reconstruct(&neg_chain(&pset, 10_000), pset.clone()).unwrap_err();
    assert!(matches!(err, TreeError::TooDeep { .. }));
}

#[test]
fn test_parser_and_reconstruction_agree_on_depth() {
    let pset = symreg();
    let nested = |negs: usize| format!("{}x{}", "neg(".repeat(negs), ")".repeat(negs));

    let seq = pset.parse(&nested(MAX_DEPTH - 1)).unwrap();
    assert!(Tree::reconstruct(&seq, pset.clone()).is_ok());

    for negs in [MAX_DEPTH, 510] {
        let err = pset.parse(&nested(negs)).unwrap_err();
        assert!(err
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("nesting depth exceeded")));
    }
}

#[test]
fn test_new_refuses_to_exceed_max_depth() {
    let pset = symreg();
    let neg = pset.primitive("neg").unwrap();
    let mut tree = Tree::new(pset.terminal("x").unwrap(), vec![], pset.clone()).unwrap();
    for _ in 1..MAX_DEPTH {
        tree = Tree::new(neg.clone(), vec![tree], pset.clone()).unwrap();
    }
    assert_eq!(tree.height() + 1, MAX_DEPTH);
    let err = Tree::new(neg, vec![tree], pset.clone()).unwrap_err();
    assert!(matches!(err, TreeError::TooDeep { .. }));
}

#[test]
fn test_program_is_postfix() {
    let pset = symreg();
    let tree = Tree::from_expr("add(x, neg(3))", pset).unwrap();
    let program = tree.compile().unwrap();
    assert_eq!(program.to_string(), "arg0 push(3) neg/1 add/2");
    assert_eq!(program.arg_count(), 1);
}

#[test]
fn test_wrong_argument_count_is_reported() {
    let pset = symreg();
    let mut tree = Tree::from_expr("add(x, 3)", pset).unwrap();
    let err = tree.evaluate_all(&[]).unwrap_err();
    assert!(matches!(
        err,
        TreeError::ArgumentCount {
            expected: 1,
            given: 0
        }
    ));
    assert!(tree.value().is_none());
}

#[test]
fn test_primitive_failure_names_the_primitive() {
    let pset = Arc::new(image_ops());
    let tree = Tree::from_expr("transpose(2)", pset).unwrap();
    let err = tree
        .evaluate(&[Value::Array(NdArray::filled(vec![2, 2], 0.0))])
        .unwrap_err();
    assert!(err.to_string().contains("transpose: transpose expects an array"));
}

#[test]
fn test_image_valued_intermediate_nodes() {
    let pset = Arc::new(image_ops());
    let mut tree = Tree::from_expr("mean(flipH(img))", pset).unwrap();
    let img = NdArray::from_rows(&[vec![0.0, 1.0], vec![2.0, 5.0]]).unwrap();
    tree.evaluate_all(&[Value::Array(img)]).unwrap();
    assert_eq!(tree.value(), Some(&Value::Float(2.0)));
    let flipped = tree.children()[0].value().unwrap();
    assert!(flipped.is_image());
    assert!(tree.children()[0].children()[0].value().unwrap().is_image());
}

#[test]
fn test_clear_values() {
    let pset = symreg();
    let mut tree = Tree::from_expr("neg(x)", pset).unwrap();
    tree.evaluate_all(&[Value::Int(2)]).unwrap();
    tree.clear_values();
    assert!(tree.nodes().iter().all(|t| t.value().is_none()));
}
