//! `swivel inspect` command

use anyhow::Result;

use crate::cli::InspectArgs;
use crate::commands::{load_config, provider};
use swivel::ops::generate::locate_header;
use swivel::ops::inspect::{format_summaries, inspect, InspectOptions};

pub fn execute(args: InspectArgs) -> Result<()> {
    let config = load_config(&args.frontend)?;
    let provider = provider(&args.frontend, &config)?;

    let header = if args.header.is_file() {
        args.header.clone()
    } else {
        locate_header(&args.header.to_string_lossy(), &config.clang.include)?
    };

    let opts = InspectOptions {
        kinds: args.kind.into_iter().map(Into::into).collect(),
        prefix: args.prefix,
    };
    let summaries = inspect(provider.as_ref(), &header, &opts)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print!("{}", format_summaries(&summaries));
    }

    Ok(())
}
