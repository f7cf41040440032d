//! swivel CLI - SWIG interface generator for C libraries

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use swivel::binding::BindError;
use swivel::util::diagnostic;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli, color) {
        match e.chain().find_map(|cause| cause.downcast_ref::<BindError>()) {
            Some(bind_error) => {
                // Context added on the way up, then the binding error itself
                for cause in e
                    .chain()
                    .take_while(|cause| cause.downcast_ref::<BindError>().is_none())
                {
                    eprintln!("error: {}", cause);
                }
                diagnostic::emit(&bind_error.to_diagnostic(), color);
            }
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, color: bool) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("swivel=debug")
    } else {
        EnvFilter::new("swivel=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, color),
        Commands::Inspect(args) => commands::inspect::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
