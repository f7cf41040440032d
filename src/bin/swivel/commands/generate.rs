//! `swivel generate` command

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::cli::GenerateArgs;
use crate::commands::{load_config, provider};
use swivel::binding::BindOptions;
use swivel::ops::generate::{generate, GenerateOptions};
use swivel::scripts;
use swivel::util::diagnostic::{self, suggestions, Diagnostic};

pub fn execute(args: GenerateArgs, color: bool) -> Result<()> {
    if args.list {
        for script in scripts::SCRIPTS {
            println!("{:<12} {}", script.name, script.description);
        }
        return Ok(());
    }

    let Some(script) = scripts::find(&args.script) else {
        bail!(
            "unknown binding script `{}`\n\
             available scripts: {}\n{}",
            args.script,
            scripts::SCRIPTS
                .iter()
                .map(|s| s.name)
                .collect::<Vec<_>>()
                .join(", "),
            suggestions::UNKNOWN_SCRIPT
        );
    };

    let mut config = load_config(&args.frontend)?;

    // CLI overrides config
    if let Some(module) = args.module {
        config.module.name = Some(module);
    }
    if args.no_directors {
        config.module.directors = Some(false);
    }
    if let Some(stale) = args.stale_fields {
        config.fields.stale = Some(stale.into());
    }

    let provider = provider(&args.frontend, &config)?;
    let opts = GenerateOptions {
        bind: config.bind_options(BindOptions::default()),
        include_dirs: config.clang.include.clone(),
        output_dir: args
            .output_dir
            .or(config.module.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(".")),
        jobs: args.jobs,
        progress: true,
    };

    let result = generate((script.session)(), provider.as_ref(), &opts)?;

    eprintln!(
        "   Generated {} ({} header(s), {} generic(s), {} class(es))",
        result.output.display(),
        result.headers,
        result.generics,
        result.classes
    );
    for warning in &result.warnings {
        diagnostic::emit(&Diagnostic::warning(warning.as_str()), color);
    }

    Ok(())
}
