mod cli;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gptree",
    version,
    about = "Rebuild genetic-programming expression trees and draw them with their values"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate an expression and draw its annotated tree
    Render(cli::render::RenderArgs),
    /// Print every sub-expression with its value, in pre-order
    Eval(cli::eval::EvalArgs),
    /// Print the canonical form and content hash of an expression
    Fmt(cli::fmt::FmtArgs),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Render(args) => cli::render::cmd_render(args),
        Command::Eval(args) => cli::eval::cmd_eval(args),
        Command::Fmt(args) => cli::fmt::cmd_fmt(args),
    }
}
