use std::path::PathBuf;

use clap::Args;

use gptree::render::argument_kind_matcher;
use gptree::{RenderConfig, TreeDrawer};

use super::{fail, input_values, load_tree, ExprArgs, InputArgs};

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub expr: ExprArgs,
    #[command(flatten)]
    pub input: InputArgs,
    /// Output file; the format follows the extension (default png)
    #[arg(short, long, default_value = "tree.png")]
    pub output: PathBuf,
    /// Write the DOT description instead of running the layout engine
    #[arg(long)]
    pub dot: bool,
    /// Render settings as JSON
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Decorate argument terminals by kind, so renamed arguments show their value
    #[arg(long)]
    pub show_arguments: bool,
}

pub fn cmd_render(args: RenderArgs) {
    let config = match &args.config {
        Some(path) => RenderConfig::load(path).unwrap_or_else(|e| fail(e)),
        None => RenderConfig::default(),
    };
    let drawer = if args.show_arguments {
        TreeDrawer::with_argument_matcher(argument_kind_matcher)
    } else {
        TreeDrawer::new()
    };
    let drawer = drawer.with_config(config);

    let mut tree = load_tree(&args.expr);
    let values = input_values(&args.input);

    if args.dot {
        let graph = drawer
            .build_graph(&mut tree, &values)
            .unwrap_or_else(|e| fail(e));
        if let Err(e) = std::fs::write(&args.output, graph.to_dot()) {
            eprintln!("error: cannot write '{}': {}", args.output.display(), e);
            std::process::exit(1);
        }
    } else if let Err(e) = drawer.save_render(&args.output, &mut tree, &values) {
        fail(e);
    }

    eprintln!("Rendered {} -> {}", tree, args.output.display());
}
