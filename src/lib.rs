pub mod config;
pub mod diagnostic;
pub mod error;
pub mod hash;
pub mod pset;
pub mod render;
pub mod span;
pub mod syntax;
pub mod tree;
pub mod value;

pub use config::RenderConfig;
pub use error::{Result, TreeError};
pub use pset::{Node, Primitive, PrimitiveSet, Terminal, TerminalKind};
pub use render::{DrawContext, DrawRule, GraphDescription, RenderedGraph, TreeDrawer};
pub use tree::{Program, Tree, TreeId};
pub use value::{NdArray, Value};

use std::sync::Arc;

use diagnostic::render_diagnostics;

/// Parse an expression into a tree, printing parse diagnostics to stderr.
pub fn parse_tree(source: &str, filename: &str, pset: Arc<PrimitiveSet>) -> Result<Tree> {
    match Tree::from_expr(source, pset) {
        Err(TreeError::Parse(diags)) => {
            render_diagnostics(&diags, filename, source);
            Err(TreeError::Parse(diags))
        }
        other => other,
    }
}

