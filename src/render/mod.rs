//! Tree rendering: evaluated trees become annotated graphs.
//!
//! Rendering is two-phase. The tree is evaluated first so every node holds
//! its own value, then the graph is built in pre-order. Each node gets a
//! label vertex (the primitive name, or the terminal's formatted text) and,
//! through the drawing rules, an optional companion vertex `<id>result`
//! that shows the value. A companion is pinned to the same rank as its
//! node with an invisible edge and a `rank=same` subgraph.
//!
//! Rules are tried newest first. A rule whose predicate or strategy fails
//! is logged and skipped, and anything its strategy drew is discarded; when
//! none match the value is drawn as text.

mod graph;
mod layout;
mod rules;
mod sink;

#[cfg(test)]
mod tests;

use std::path::Path;

use crate::config::RenderConfig;
use crate::error::Result;
use crate::pset::Node;
use crate::tree::Tree;
use crate::value::Value;

pub use self::graph::{Attrs, GraphDescription, GraphEdge, GraphNode, Subgraph};
pub use self::layout::{format_for, Graphviz, LayoutEngine};
pub use self::rules::{
    argument_kind_matcher, default_argument_matcher, draw_image, draw_text, result_id,
    value_text, DrawContext, DrawRule,
};
pub use self::sink::{ImageSink, PngSink};

/// A graph description together with its laid-out DOT text.
#[derive(Clone, Debug)]
pub struct RenderedGraph {
    graph: GraphDescription,
    layout: String,
}

impl RenderedGraph {
    pub fn graph(&self) -> &GraphDescription {
        &self.graph
    }

    /// DOT text with positions, as returned by the layout engine.
    pub fn laid_out(&self) -> &str {
        &self.layout
    }

    /// Draw the laid-out text to `path`, format taken from the extension.
    pub fn save(&self, engine: &dyn LayoutEngine, path: &Path) -> Result<()> {
        engine.draw(&self.layout, &format_for(path), path)?;
        log::info!("saved tree drawing to {}", path.display());
        Ok(())
    }
}

pub struct TreeDrawer {
    rules: Vec<DrawRule>,
    config: RenderConfig,
    layout: Box<dyn LayoutEngine>,
    images: Box<dyn ImageSink>,
}

impl Default for TreeDrawer {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeDrawer {
    /// Drawer with the default rules, config, Graphviz and PNG sink.
    pub fn new() -> Self {
        Self::with_argument_matcher(default_argument_matcher)
    }

    /// Like [`TreeDrawer::new`], but `is_argument` decides which
    /// terminals are argument placeholders. Non-argument terminals get no
    /// value vertex; arguments show the value they were bound to.
    pub fn with_argument_matcher(is_argument: impl Fn(&Node) -> bool + 'static) -> Self {
        let config = RenderConfig::default();
        Self {
            rules: rules::default_rules(is_argument),
            layout: Box::new(Graphviz::new(config.layout_program.clone())),
            images: Box::new(PngSink::new(config.min_image_pixels)),
            config,
        }
    }

    /// Replace the config; the layout program and image sink follow it.
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.layout = Box::new(Graphviz::new(config.layout_program.clone()));
        self.images = Box::new(PngSink::new(config.min_image_pixels));
        self.config = config;
        self
    }

    pub fn with_layout_engine(mut self, engine: impl LayoutEngine + 'static) -> Self {
        self.layout = Box::new(engine);
        self
    }

    pub fn with_image_sink(mut self, sink: impl ImageSink + 'static) -> Self {
        self.images = Box::new(sink);
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn layout_engine(&self) -> &dyn LayoutEngine {
        self.layout.as_ref()
    }

    /// Rule names in dispatch order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(DrawRule::name).collect()
    }

    /// Add a rule that takes precedence over every rule registered so far.
    pub fn register_draw_rule(
        &mut self,
        name: impl Into<String>,
        predicate: impl Fn(&Tree) -> bool + 'static,
        strategy: impl Fn(&mut DrawContext<'_>, &Tree) -> Result<()> + 'static,
    ) -> &mut Self {
        self.rules.insert(0, DrawRule::new(name, predicate, strategy));
        self
    }

    /// Drop every rule; only the text fallback remains.
    pub fn clear_draw_rules(&mut self) -> &mut Self {
        self.rules.clear();
        self
    }

    /// Evaluate `tree` with `args`, build its graph and lay it out.
    pub fn render(&self, tree: &mut Tree, args: &[Value]) -> Result<RenderedGraph> {
        let graph = self.build_graph(tree, args)?;
        let layout = self.layout.layout(&graph.to_dot())?;
        Ok(RenderedGraph { graph, layout })
    }

    /// Render and write the drawing to `path`: one layout pass, then one
    /// draw of its output.
    pub fn save_render(&self, path: &Path, tree: &mut Tree, args: &[Value]) -> Result<()> {
        self.render(tree, args)?.save(self.layout.as_ref(), path)
    }

    /// Evaluate and build the graph description without laying it out.
    pub fn build_graph(&self, tree: &mut Tree, args: &[Value]) -> Result<GraphDescription> {
        tree.evaluate_all(args)?;
        std::fs::create_dir_all(&self.config.scratch_dir)?;
        let mut graph = GraphDescription::new();
        let mut ctx = DrawContext::new(&mut graph, &self.config, self.images.as_ref());
        self.populate(&mut ctx, tree);
        Ok(graph)
    }

    fn populate(&self, ctx: &mut DrawContext<'_>, tree: &Tree) {
        let id = tree.id().to_string();
        let label = if tree.node().arity() > 0 {
            tree.node().name().to_string()
        } else {
            tree.node().format(&[])
        };
        ctx.graph.add_node(&id, Attrs::new().with("label", label));

        self.display_value(ctx, tree);

        let companion = result_id(tree);
        if ctx.graph.has_node(&companion) {
            ctx.graph.add_edge(
                &id,
                &companion,
                Attrs::new().with("style", "invis").with("dir", "both"),
            );
            ctx.graph.add_subgraph(
                &format!("{}-resultholder", id),
                &[id.as_str(), companion.as_str()],
                Attrs::new().with("rank", "same"),
            );
        }

        for child in tree.children() {
            self.populate(ctx, child);
            ctx.graph
                .add_edge(&id, &child.id().to_string(), Attrs::new().with("dir", "back"));
        }
    }

    fn display_value(&self, ctx: &mut DrawContext<'_>, tree: &Tree) {
        for rule in &self.rules {
            match rule.try_draw(ctx, tree) {
                Ok(true) => {
                    log::debug!("tree {} drawn by rule '{}'", tree.id(), rule.name());
                    return;
                }
                Ok(false) => {}
                Err(msg) => {
                    log::warn!(
                        "draw rule '{}' failed on `{}`: {}",
                        rule.name(),
                        tree,
                        msg
                    );
                }
            }
        }
        draw_text(ctx, tree, &value_text(tree));
    }
}
