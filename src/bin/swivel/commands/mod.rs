//! Command implementations

pub mod completions;
pub mod generate;
pub mod inspect;

use anyhow::Result;

use crate::cli::FrontendArgs;
use swivel::frontend::{AstProvider, ClangProvider, DumpDir};
use swivel::util::config::Config;

/// Load the configuration and apply the front end flags over it.
pub fn load_config(args: &FrontendArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => {
            let cwd = std::env::current_dir()?;
            match Config::discover(&cwd) {
                Some(path) => {
                    tracing::debug!("Using {}", path.display());
                    Config::load_or_default(&path)
                }
                None => Config::default(),
            }
        }
    };

    let mut overrides = Config::default();
    overrides.clang.path = args.clang.clone();
    overrides.clang.include = args.include.clone();
    overrides.clang.args = args.clang_args.clone();
    config.merge(overrides);

    Ok(config)
}

/// The AST provider selected by the flags.
pub fn provider(args: &FrontendArgs, config: &Config) -> Result<Box<dyn AstProvider>> {
    Ok(match &args.dumps {
        Some(dir) => Box::new(DumpDir::new(dir)),
        None => Box::new(ClangProvider::new(&config.clang)?),
    })
}
