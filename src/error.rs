use thiserror::Error;

use crate::diagnostic::Diagnostic;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("cannot reconstruct a tree from an empty node sequence")]
    EmptySequence,
    #[error(
        "corrupt node sequence: a node at position {needed_at} is required but the sequence has only {len} nodes"
    )]
    TruncatedSequence { needed_at: usize, len: usize },
    #[error(
        "corrupt node sequence: the root consumed {consumed} of {len} nodes, leaving a remainder"
    )]
    TrailingNodes { consumed: usize, len: usize },
    #[error("tree is nested deeper than {max} levels")]
    TooDeep { max: usize },
    #[error("node '{name}' has arity {expected} but was given {found} children")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error(
        "tried to draw an image for tree node {id} which has not been evaluated; render through `TreeDrawer::render` or call `Tree::evaluate_all` first"
    )]
    NotEvaluated { id: String },
    #[error("value of type {0} cannot be rendered as an image")]
    NotAnImage(&'static str),
    #[error("expression takes {expected} argument(s), {given} given")]
    ArgumentCount { expected: usize, given: usize },
    #[error("evaluation error: {0}")]
    Eval(String),
    #[error("{} parse error(s): {}", .0.len(), .0.first().map(|d| d.to_string()).unwrap_or_default())]
    Parse(Vec<Diagnostic>),
    #[error("layout error: {0}")]
    Layout(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TreeError {
    /// Parse diagnostics carried by this error, if any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            TreeError::Parse(diags) => diags,
            _ => &[],
        }
    }
}

pub type Result<T, E = TreeError> = std::result::Result<T, E>;
