use clap::Args;

use gptree::Tree;

use super::{fail, input_values, load_tree, ExprArgs, InputArgs};

#[derive(Args)]
pub struct EvalArgs {
    #[command(flatten)]
    pub expr: ExprArgs,
    #[command(flatten)]
    pub input: InputArgs,
}

pub fn cmd_eval(args: EvalArgs) {
    let mut tree = load_tree(&args.expr);
    let values = input_values(&args.input);
    if let Err(e) = tree.evaluate_all(&values) {
        fail(e);
    }
    print_node(&tree, 0);
}

fn print_node(tree: &Tree, depth: usize) {
    let value = tree
        .value()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string());
    println!("{:indent$}{} = {}", "", tree, value, indent = depth * 2);
    for child in tree.children() {
        print_node(child, depth + 1);
    }
}
