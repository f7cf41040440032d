//! Producing clang's JSON AST dump for a header.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::ClangConfig;
use crate::util::diagnostic::suggestions;
use crate::util::fs::{ensure_dir, read_to_string, write_string};
use crate::util::hash::Fingerprint;
use crate::util::process::{find_clang, find_executable, ProcessBuilder};

/// Something that can produce a JSON AST dump of a header.
pub trait AstProvider: Send + Sync {
    /// The dump of `header` as `clang -Xclang -ast-dump=json` writes it.
    fn dump(&self, header: &Path) -> Result<String>;
}

/// Runs clang on each header.
#[derive(Debug, Clone)]
pub struct ClangProvider {
    clang: PathBuf,
    args: Vec<String>,
    cache_dir: Option<PathBuf>,
}

impl ClangProvider {
    pub fn new(config: &ClangConfig) -> Result<Self> {
        let clang = match &config.path {
            Some(path) if path.components().count() > 1 => path.clone(),
            Some(path) => find_executable(&path.to_string_lossy()).with_context(|| {
                format!("`{}` not found in PATH\n{}", path.display(), suggestions::CLANG_NOT_FOUND)
            })?,
            None => find_clang().with_context(|| {
                format!("clang not found in PATH\n{}", suggestions::CLANG_NOT_FOUND)
            })?,
        };

        let mut args: Vec<String> = config.defines.iter().map(|d| format!("-D{}", d)).collect();
        args.extend(config.include.iter().map(|i| format!("-I{}", i.display())));
        args.extend(config.args.iter().cloned());

        tracing::debug!("Using clang at {}", clang.display());
        Ok(ClangProvider {
            clang,
            args,
            cache_dir: config.cache_dir.clone(),
        })
    }

    /// The command that dumps `header`.
    pub fn command(&self, header: &Path) -> ProcessBuilder {
        ProcessBuilder::new(&self.clang)
            .args(["-x", "c", "-fsyntax-only", "-Xclang", "-ast-dump=json"])
            .args(&self.args)
            .arg(header)
    }

    fn cache_key(&self, header: &Path) -> Result<String> {
        // TODO: hash the contents of included headers as well
        let mut fp = Fingerprint::new();
        fp.update_path(&self.clang)
            .update_strs(self.args.iter().map(String::as_str))
            .update_path(header)
            .update_file(header)?;
        Ok(fp.finish_short())
    }
}

impl AstProvider for ClangProvider {
    fn dump(&self, header: &Path) -> Result<String> {
        let cached = match &self.cache_dir {
            Some(dir) => Some(dir.join(format!("{}.json", self.cache_key(header)?))),
            None => None,
        };
        if let Some(path) = cached.as_deref().filter(|p| p.is_file()) {
            tracing::debug!("AST dump of {} is cached", header.display());
            return read_to_string(path);
        }

        let cmd = self.command(header);
        tracing::debug!("Running: {}", cmd.display_command());
        let output = cmd.exec_and_check().with_context(|| {
            format!("clang failed on {}\n{}", header.display(), suggestions::CLANG_FAILED)
        })?;
        let json = String::from_utf8(output.stdout)
            .with_context(|| format!("clang dump of {} is not UTF-8", header.display()))?;

        if let Some(path) = cached {
            if let Some(dir) = path.parent() {
                ensure_dir(dir)?;
            }
            write_string(&path, &json)?;
        }
        Ok(json)
    }
}

/// Reads pre-generated dumps named `<header file name>.json` from a directory.
#[derive(Debug, Clone)]
pub struct DumpDir {
    dir: PathBuf,
}

impl DumpDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DumpDir { dir: dir.into() }
    }

    /// Path of the dump for `header`.
    pub fn path_for(&self, header: &Path) -> PathBuf {
        let name = header
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.dir.join(format!("{}.json", name))
    }
}

impl AstProvider for DumpDir {
    fn dump(&self, header: &Path) -> Result<String> {
        read_to_string(&self.path_for(header))
            .with_context(|| format!("no AST dump for {}", header.display()))
    }
}
