//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use swivel::binding::StalePolicy;
use swivel::core::decl::DeclKind;

/// swivel - generate SWIG interfaces from annotated C headers
#[derive(Parser)]
#[command(name = "swivel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a binding script and write the SWIG interface
    Generate(GenerateArgs),

    /// List the declarations the front end finds in a header
    Inspect(InspectArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Where headers come from and how they are parsed.
#[derive(Args)]
pub struct FrontendArgs {
    /// Directory searched for headers (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include: Vec<PathBuf>,

    /// Read `<header>.json` AST dumps from DIR instead of running clang
    #[arg(long, value_name = "DIR")]
    pub dumps: Option<PathBuf>,

    /// Path to clang
    #[arg(long, env = "SWIVEL_CLANG")]
    pub clang: Option<PathBuf>,

    /// Configuration file (default: swivel.toml in this or a parent directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Extra arguments passed to clang
    #[arg(last = true)]
    pub clang_args: Vec<String>,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Binding script to run
    #[arg(short, long, default_value = "rizin")]
    pub script: String,

    /// List the available binding scripts and exit
    #[arg(long)]
    pub list: bool,

    /// Directory the interface file is written to
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// SWIG module name
    #[arg(short, long)]
    pub module: Option<String>,

    /// Emit `%module` without directors
    #[arg(long)]
    pub no_directors: bool,

    /// What to do when ignored or renamed fields no longer exist
    #[arg(long, value_enum)]
    pub stale_fields: Option<StaleArg>,

    /// Number of parallel parse jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    #[command(flatten)]
    pub frontend: FrontendArgs,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Header path, or a name looked up in the include directories
    pub header: PathBuf,

    /// Only show declarations of this kind (repeatable)
    #[arg(short, long, value_enum)]
    pub kind: Vec<KindArg>,

    /// Only show declarations whose name starts with PREFIX
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub frontend: FrontendArgs,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StaleArg {
    Warn,
    Deny,
}

impl From<StaleArg> for StalePolicy {
    fn from(arg: StaleArg) -> Self {
        match arg {
            StaleArg::Warn => StalePolicy::Warn,
            StaleArg::Deny => StalePolicy::Deny,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Function,
    Struct,
    Union,
    Typedef,
    Enum,
    Macro,
    Variable,
}

impl From<KindArg> for DeclKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Function => DeclKind::Function,
            KindArg::Struct => DeclKind::Struct,
            KindArg::Union => DeclKind::Union,
            KindArg::Typedef => DeclKind::Typedef,
            KindArg::Enum => DeclKind::Enum,
            KindArg::Macro => DeclKind::Macro,
            KindArg::Variable => DeclKind::Variable,
        }
    }
}
