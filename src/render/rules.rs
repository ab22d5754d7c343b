//! Drawing rules: how one evaluated node is depicted next to its label.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use super::graph::{Attrs, GraphDescription};
use super::sink::ImageSink;
use crate::config::RenderConfig;
use crate::error::{Result, TreeError};
use crate::pset::{Node, TerminalKind};
use crate::tree::Tree;

pub type Predicate = Box<dyn Fn(&Tree) -> bool>;
pub type Strategy = Box<dyn Fn(&mut DrawContext<'_>, &Tree) -> Result<()>>;

/// Everything a strategy may touch while drawing one node.
pub struct DrawContext<'a> {
    pub(crate) graph: &'a mut GraphDescription,
    pub(crate) config: &'a RenderConfig,
    pub(crate) images: &'a dyn ImageSink,
}

impl<'a> DrawContext<'a> {
    pub fn new(
        graph: &'a mut GraphDescription,
        config: &'a RenderConfig,
        images: &'a dyn ImageSink,
    ) -> Self {
        Self {
            graph,
            config,
            images,
        }
    }

    pub fn graph(&mut self) -> &mut GraphDescription {
        &mut *self.graph
    }

    pub fn config(&self) -> &RenderConfig {
        self.config
    }

    pub fn images(&self) -> &dyn ImageSink {
        self.images
    }

    /// Scratch file for a node's rendered value.
    pub fn artifact_path(&self, tree: &Tree) -> PathBuf {
        self.config.scratch_dir.join(format!("{}.png", tree.id()))
    }
}

/// Id of the companion node that shows a tree node's value.
pub fn result_id(tree: &Tree) -> String {
    format!("{}result", tree.id())
}

/// A predicate and the strategy it guards.
pub struct DrawRule {
    name: String,
    predicate: Predicate,
    strategy: Strategy,
}

impl DrawRule {
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&Tree) -> bool + 'static,
        strategy: impl Fn(&mut DrawContext<'_>, &Tree) -> Result<()> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
            strategy: Box::new(strategy),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Ok(true)` if the rule matched and drew, `Ok(false)` if it did not
    /// match, `Err` with a description if the predicate or strategy failed.
    /// A failed strategy leaves the graph exactly as it found it.
    pub(crate) fn try_draw(
        &self,
        ctx: &mut DrawContext<'_>,
        tree: &Tree,
    ) -> std::result::Result<bool, String> {
        let matched = catch_unwind(AssertUnwindSafe(|| (self.predicate)(tree)))
            .map_err(|p| format!("predicate panicked: {}", panic_message(p.as_ref())))?;
        if !matched {
            return Ok(false);
        }
        let saved = ctx.graph.clone();
        let outcome = match catch_unwind(AssertUnwindSafe(|| (self.strategy)(ctx, tree))) {
            Ok(Ok(())) => Ok(true),
            Ok(Err(e)) => Err(e.to_string()),
            Err(p) => Err(format!("strategy panicked: {}", panic_message(p.as_ref()))),
        };
        if outcome.is_err() {
            *ctx.graph = saved;
        }
        outcome
    }
}

impl std::fmt::Debug for DrawRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawRule").field("name", &self.name).finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Draw `text` as a plaintext node beside `tree`.
pub fn draw_text(ctx: &mut DrawContext<'_>, tree: &Tree, text: &str) {
    let attrs = Attrs::new()
        .with("label", text)
        .with("shape", &ctx.config.value_shape);
    ctx.graph.add_node(&result_id(tree), attrs);
}

/// Save the node's value as an image and show it beside the node.
pub fn draw_image(ctx: &mut DrawContext<'_>, tree: &Tree) -> Result<()> {
    let value = tree.value().ok_or_else(|| TreeError::NotEvaluated {
        id: tree.id().to_string(),
    })?;
    let path = ctx.artifact_path(tree);
    ctx.images.save(value, &path, &tree.to_string())?;
    let attrs = Attrs::new()
        .with("image", path.display())
        .with("label", "")
        .with("imagescale", "true")
        .with("fixedsize", "true")
        .with("shape", &ctx.config.value_shape)
        .with("width", ctx.config.image_width)
        .with("height", ctx.config.image_height);
    ctx.graph.add_node(&result_id(tree), attrs);
    Ok(())
}

/// Text shown for a node's value; unevaluated nodes show a placeholder.
pub fn value_text(tree: &Tree) -> String {
    tree.value()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unevaluated".to_string())
}

/// Placeholder test used before a terminal is left undecorated: names
/// containing `ARG`, the generator's default argument naming.
pub fn default_argument_matcher(node: &Node) -> bool {
    node.name().contains("ARG")
}

/// Argument test that trusts the terminal's own kind, so renamed
/// arguments such as `x` still count.
pub fn argument_kind_matcher(node: &Node) -> bool {
    matches!(
        node,
        Node::Terminal(t) if matches!(t.kind(), TerminalKind::Argument(_))
    )
}

/// The built-in rules in dispatch order, newest registration first.
pub(crate) fn default_rules(is_argument: impl Fn(&Node) -> bool + 'static) -> Vec<DrawRule> {
    vec![
        DrawRule::new(
            "terminal",
            move |t: &Tree| t.node().arity() == 0 && !is_argument(t.node()),
            |_, _| Ok(()),
        ),
        DrawRule::new(
            "image",
            |t: &Tree| t.value().is_some_and(|v| v.is_image()),
            draw_image,
        ),
        DrawRule::new(
            "text",
            |_: &Tree| true,
            |ctx, t| {
                draw_text(ctx, t, &value_text(t));
                Ok(())
            },
        ),
    ]
}
