//! Implementation of `swivel generate`.
//!
//! Headers named by a [`Session`] are parsed in parallel, then bound one by
//! one in registration order against a single [`BindingContext`], which is
//! rendered once at the end.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::binding::{BindError, BindOptions, BindingContext};
use crate::core::header::Header;
use crate::emit;
use crate::frontend::{self, AstProvider};
use crate::util::fs::{find_in_dirs, write_string};

/// Binds declarations of one header.
pub type Binder =
    Box<dyn FnOnce(&mut BindingContext, &mut Header) -> Result<(), BindError> + Send + 'static>;

/// An ordered list of headers and the binder run on each.
#[derive(Default)]
pub struct Session {
    headers: Vec<(String, Binder)>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` (e.g. `rz_core.h`) with `binder`.
    ///
    /// The same header may be registered more than once; each registration
    /// gets its own fresh declaration pool.
    pub fn header<F>(&mut self, name: impl Into<String>, binder: F) -> &mut Self
    where
        F: FnOnce(&mut BindingContext, &mut Header) -> Result<(), BindError> + Send + 'static,
    {
        self.headers.push((name.into(), Box::new(binder)));
        self
    }

    /// Header names in registration order.
    pub fn header_names(&self) -> impl Iterator<Item = &str> {
        self.headers.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Options for the generate command.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub bind: BindOptions,

    /// Directories searched for header names, in order
    pub include_dirs: Vec<PathBuf>,

    /// Directory `<module>.i` is written to
    pub output_dir: PathBuf,

    /// Number of parallel parse jobs (None = one per CPU)
    pub jobs: Option<usize>,

    /// Show a progress bar while parsing
    pub progress: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            bind: BindOptions::default(),
            include_dirs: Vec::new(),
            output_dir: PathBuf::from("."),
            jobs: None,
            progress: false,
        }
    }
}

/// What a generate run produced.
#[derive(Debug)]
pub struct GenerateResult {
    /// The interface file written
    pub output: PathBuf,
    pub headers: usize,
    pub generics: usize,
    pub classes: usize,
    pub warnings: Vec<String>,
}

/// Locate a header in the include directories.
pub fn locate_header(name: &str, include_dirs: &[PathBuf]) -> Result<PathBuf> {
    let direct = Path::new(name);
    if direct.is_absolute() && direct.is_file() {
        return Ok(direct.to_path_buf());
    }
    match find_in_dirs(name, include_dirs) {
        Some(path) => Ok(path),
        None => bail!(
            "header `{}` not found\n\
             searched: {}\n\
             hint: add the directory with `--include` or `[clang] include`",
            name,
            if include_dirs.is_empty() {
                "(no include directories)".to_string()
            } else {
                include_dirs
                    .iter()
                    .map(|d| d.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        ),
    }
}

/// Parse every header of `session`, bind them in order and write the
/// interface file.
pub fn generate(
    session: Session,
    provider: &dyn AstProvider,
    opts: &GenerateOptions,
) -> Result<GenerateResult> {
    let start = Instant::now();
    if session.is_empty() {
        bail!("the binding script registers no headers");
    }

    let paths = session
        .header_names()
        .map(|name| locate_header(name, &opts.include_dirs))
        .collect::<Result<Vec<_>>>()?;

    let headers = parse_all(provider, &paths, opts)?;

    let mut ctx = BindingContext::new(opts.bind.clone());
    for ((name, binder), mut header) in session.headers.into_iter().zip(headers) {
        tracing::debug!("Binding {}", name);
        ctx.include(header.name().to_string());
        binder(&mut ctx, &mut header).with_context(|| format!("failed to bind {}", name))?;

        let unclaimed = header.unclaimed().count();
        if unclaimed > 0 {
            tracing::debug!("{} declarations of {} left unbound", unclaimed, name);
        }
    }

    ctx.validate()?;
    let interface = emit::render(&ctx)?;

    let output = opts.output_dir.join(format!("{}.i", ctx.options().module));
    write_string(&output, &interface)?;

    tracing::info!(
        "Wrote {} in {:.2}s",
        output.display(),
        start.elapsed().as_secs_f64()
    );

    Ok(GenerateResult {
        output,
        headers: paths.len(),
        generics: ctx.generics().iter().count(),
        classes: ctx.classes().len(),
        warnings: ctx.warnings().to_vec(),
    })
}

/// Parse headers on the rayon pool, keeping their order.
fn parse_all(
    provider: &dyn AstProvider,
    paths: &[PathBuf],
    opts: &GenerateOptions,
) -> Result<Vec<Header>> {
    let pb = if opts.progress && paths.len() > 1 {
        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    tracing::info!("Parsing {} header(s)", paths.len());
    let parse = || -> Vec<Result<Header>> {
        paths
            .par_iter()
            .map(|path| -> Result<Header> {
                if let Some(name) = path.file_name() {
                    pb.set_message(name.to_string_lossy().into_owned());
                }
                let unit = frontend::parse_header(provider, path)?;
                let header = unit.into_header()?;
                pb.inc(1);
                Ok(header)
            })
            .collect()
    };

    let results = match opts.jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to start parser threads")?
            .install(parse),
        None => parse(),
    };
    pb.finish_with_message("parsed");

    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ClassSpec;
    use crate::frontend::DumpDir;
    use crate::scripts;
    use crate::test_support::fixtures_dir;
    use tempfile::TempDir;

    fn options(tmp: &TempDir) -> GenerateOptions {
        GenerateOptions {
            include_dirs: vec![fixtures_dir().join("include")],
            output_dir: tmp.path().join("out"),
            jobs: Some(2),
            ..Default::default()
        }
    }

    fn dumps() -> DumpDir {
        DumpDir::new(fixtures_dir().join("dumps"))
    }

    #[test]
    fn test_generate_rizin() {
        let tmp = TempDir::new().unwrap();
        let opts = options(&tmp);
        let result = generate(scripts::rizin::session(), &dumps(), &opts).unwrap();

        assert_eq!(result.output, opts.output_dir.join("rizin.i"));
        assert_eq!(result.headers, 2);
        assert_eq!(result.generics, 2);
        // RzCore and the director's class
        assert_eq!(result.classes, 2);
        assert!(result.warnings.is_empty());

        let out = std::fs::read_to_string(&result.output).unwrap();
        assert!(out.starts_with(
            "%module(directors=1) rizin\n%{\n#include <rz_list.h>\n#include <rz_core.h>\n%}\n"
        ));
        assert_eq!(out.matches("%define %RzList(TYPE)").count(), 1);
        assert!(out.find("%RzListIter(RzCoreFile)").unwrap() < out.find("%RzList(RzCoreFile)").unwrap());
        assert!(out.contains("    RzList_RzCoreFile *files;\n"));
        assert!(out.contains("%extend rz_core_t {"));
        assert!(out.contains("#define RZ_CORE_BLOCKSIZE 0x100\n"));
        assert!(!out.contains("rz_core_cmdf"));
        assert!(!out.contains("rz_core_internal"));
    }

    #[test]
    fn test_missing_header() {
        let tmp = TempDir::new().unwrap();
        let mut session = Session::new();
        session.header("rz_io.h", |_, _| Ok(()));

        let err = generate(session, &dumps(), &options(&tmp)).unwrap_err();
        assert!(err.to_string().contains("header `rz_io.h` not found"));
    }

    #[test]
    fn test_binder_error_keeps_bind_error() {
        let tmp = TempDir::new().unwrap();
        let mut session = Session::new();
        session.header("rz_core.h", |ctx, header| {
            ctx.class(header, ClassSpec::new("RzCoreFile"))?;
            Ok(())
        });

        let err = generate(session, &dumps(), &options(&tmp)).unwrap_err();
        assert!(err.to_string().contains("failed to bind rz_core.h"));
        assert!(err.chain().any(|c| c.downcast_ref::<BindError>().is_some()));
    }

    #[test]
    fn test_empty_session() {
        let tmp = TempDir::new().unwrap();
        let err = generate(Session::new(), &dumps(), &options(&tmp)).unwrap_err();
        assert!(err.to_string().contains("registers no headers"));
    }
}
