use clap::Args;

use super::{load_tree, ExprArgs};

#[derive(Args)]
pub struct FmtArgs {
    #[command(flatten)]
    pub expr: ExprArgs,
    /// Show the full 256-bit hash instead of the short form
    #[arg(long)]
    pub full: bool,
}

pub fn cmd_fmt(args: FmtArgs) {
    let tree = load_tree(&args.expr);
    let hash = tree.content_hash();
    if args.full {
        println!("{} {}", hash.to_hex(), tree);
    } else {
        println!("{} {}", hash, tree);
    }
}
