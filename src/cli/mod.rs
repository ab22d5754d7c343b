pub mod eval;
pub mod fmt;
pub mod render;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Args, ValueEnum};

use gptree::pset::builtins;
use gptree::{NdArray, PrimitiveSet, Tree, TreeError, Value};

/// Built-in primitive sets selectable from the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PsetChoice {
    /// add, sub, mul, protectedDiv, neg, cos, sin over `x`
    Symreg,
    /// element-wise array ops, transpose, flips and mean over `img`
    Image,
}

impl PsetChoice {
    pub fn build(self) -> Arc<PrimitiveSet> {
        Arc::new(match self {
            PsetChoice::Symreg => builtins::symbolic_regression(),
            PsetChoice::Image => builtins::image_ops(),
        })
    }
}

#[derive(Args)]
pub struct ExprArgs {
    /// Expression in prefix call form, e.g. "add(x, 3)"
    pub expr: String,
    /// Primitive set the expression is written in
    #[arg(long, value_enum, default_value = "symreg")]
    pub pset: PsetChoice,
}

#[derive(Args)]
pub struct InputArgs {
    /// Positional argument value (repeatable): integer, float, True or False
    #[arg(long = "arg", value_name = "VALUE", allow_hyphen_values = true)]
    pub args: Vec<String>,
    /// Image file passed as the first argument, as a grayscale array
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,
}

/// Parse the expression, rendering diagnostics and exiting on failure.
pub fn load_tree(expr: &ExprArgs) -> Tree {
    match gptree::parse_tree(&expr.expr, "<expr>", expr.pset.build()) {
        Ok(tree) => tree,
        Err(TreeError::Parse(_)) => process::exit(1),
        Err(e) => fail(e),
    }
}

/// Collect argument values: the image first if given, then each `--arg`.
pub fn input_values(input: &InputArgs) -> Vec<Value> {
    let mut values = Vec::new();
    if let Some(path) = &input.image {
        match image::open(path) {
            Ok(img) => values.push(Value::Array(NdArray::from_luma(&img))),
            Err(e) => {
                eprintln!("error: cannot open image '{}': {}", path.display(), e);
                process::exit(1);
            }
        }
    }
    for raw in &input.args {
        match parse_value(raw) {
            Some(v) => values.push(v),
            None => {
                eprintln!(
                    "error: cannot parse argument '{}' (expected an integer, float, True or False)",
                    raw
                );
                process::exit(1);
            }
        }
    }
    values
}

fn parse_value(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    match raw {
        "True" | "true" => return Some(Value::Bool(true)),
        "False" | "false" => return Some(Value::Bool(false)),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Value::Int(i));
    }
    raw.parse::<f64>().ok().map(Value::Float)
}

pub fn fail(e: TreeError) -> ! {
    eprintln!("error: {}", e);
    process::exit(1);
}
