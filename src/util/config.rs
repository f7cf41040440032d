//! Configuration file support for swivel.
//!
//! A project may carry a `swivel.toml` next to its binding script. Every
//! setting is optional; anything left out keeps the [`BindOptions`] default,
//! and command-line flags override the file.
//!
//! ```toml
//! [module]
//! name = "rizin"
//! directors = true
//!
//! [markers]
//! visibility = "RZ_API"
//!
//! [fields]
//! stale = "deny"
//!
//! [clang]
//! args = ["-std=gnu11"]
//! include = ["librz/include"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::binding::{BindOptions, StalePolicy};

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "swivel.toml";

/// swivel configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SWIG module settings
    pub module: ModuleConfig,

    /// Annotation names recognized on declarations
    pub markers: MarkerConfig,

    /// Field binding settings
    pub fields: FieldsConfig,

    /// C front end settings
    pub clang: ClangConfig,
}

/// Module-related configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// SWIG module name, also used for the output file name
    pub name: Option<String>,

    /// Emit `%module(directors=1)`
    pub directors: Option<bool>,

    /// Directory the interface file is written to
    pub output_dir: Option<PathBuf>,
}

/// Annotation markers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Annotation that makes a function visible to prefix scans
    pub visibility: Option<String>,

    /// Argument annotation that adds a non-null contract
    pub nonnull: Option<String>,

    /// Function annotation that emits a deprecation warning
    pub deprecated: Option<String>,
}

/// Field binding configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FieldsConfig {
    /// What to do with ignored or renamed fields that no longer exist
    pub stale: Option<StalePolicy>,
}

/// C front end configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClangConfig {
    /// Path to clang (None = search PATH)
    pub path: Option<PathBuf>,

    /// Extra arguments passed to clang
    pub args: Vec<String>,

    /// Include directories (`-I`)
    pub include: Vec<PathBuf>,

    /// Preprocessor definitions (`-D`)
    pub defines: Vec<String>,

    /// Directory where AST dumps are cached
    pub cache_dir: Option<PathBuf>,
}

impl Default for ClangConfig {
    fn default() -> Self {
        ClangConfig {
            path: None,
            args: Vec::new(),
            include: Vec::new(),
            defines: vec!["RZ_BINDINGS".to_string()],
            cache_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Find `swivel.toml` in `dir` or one of its parents.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        dir.ancestors()
            .map(|d| d.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.module.name.is_some() {
            self.module.name = other.module.name;
        }
        if other.module.directors.is_some() {
            self.module.directors = other.module.directors;
        }
        if other.module.output_dir.is_some() {
            self.module.output_dir = other.module.output_dir;
        }

        if other.markers.visibility.is_some() {
            self.markers.visibility = other.markers.visibility;
        }
        if other.markers.nonnull.is_some() {
            self.markers.nonnull = other.markers.nonnull;
        }
        if other.markers.deprecated.is_some() {
            self.markers.deprecated = other.markers.deprecated;
        }

        if other.fields.stale.is_some() {
            self.fields.stale = other.fields.stale;
        }

        if other.clang.path.is_some() {
            self.clang.path = other.clang.path;
        }
        if other.clang.cache_dir.is_some() {
            self.clang.cache_dir = other.clang.cache_dir;
        }
        // Lists accumulate
        self.clang.args.extend(other.clang.args);
        self.clang.include.extend(other.clang.include);
        for define in other.clang.defines {
            if !self.clang.defines.contains(&define) {
                self.clang.defines.push(define);
            }
        }
    }

    /// Binding options with this configuration applied over `base`.
    pub fn bind_options(&self, base: BindOptions) -> BindOptions {
        let mut options = base;
        if let Some(name) = &self.module.name {
            options.module = name.clone();
        }
        if let Some(directors) = self.module.directors {
            options.directors = directors;
        }
        if let Some(visibility) = &self.markers.visibility {
            // An empty marker disables the visibility check
            options.visibility_marker = (!visibility.is_empty()).then(|| visibility.clone());
        }
        if let Some(nonnull) = &self.markers.nonnull {
            options.nonnull_marker = nonnull.clone();
        }
        if let Some(deprecated) = &self.markers.deprecated {
            options.deprecated_marker = deprecated.clone();
        }
        if let Some(stale) = self.fields.stale {
            options.stale_fields = stale;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.module.name.is_none());
        assert!(config.fields.stale.is_none());
        assert_eq!(config.clang.defines, vec!["RZ_BINDINGS"]);
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(CONFIG_FILE);

        std::fs::write(
            &config_path,
            r#"
[module]
name = "rzpipe"
directors = false

[markers]
visibility = ""

[fields]
stale = "deny"

[clang]
include = ["librz/include"]
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.module.name, Some("rzpipe".to_string()));
        assert_eq!(config.fields.stale, Some(StalePolicy::Deny));
        assert_eq!(config.clang.include, vec![PathBuf::from("librz/include")]);
        // Unset sections keep their defaults
        assert_eq!(config.clang.defines, vec!["RZ_BINDINGS"]);

        let options = config.bind_options(BindOptions::default());
        assert_eq!(options.module, "rzpipe");
        assert!(!options.directors);
        assert!(options.visibility_marker.is_none());
        assert_eq!(options.nonnull_marker, "RZ_NONNULL");
        assert_eq!(options.stale_fields, StalePolicy::Deny);
    }

    #[test]
    fn test_config_invalid_policy() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(CONFIG_FILE);
        std::fs::write(&config_path, "[fields]\nstale = \"ignore\"\n").unwrap();

        assert!(Config::load(&config_path).is_err());
        assert!(Config::load_or_default(&config_path).fields.stale.is_none());
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.module.name = Some("rizin".to_string());
        base.clang.args = vec!["-std=gnu11".to_string()];

        let mut override_cfg = Config::default();
        override_cfg.module.directors = Some(false);
        override_cfg.clang.args = vec!["-Wno-everything".to_string()];

        base.merge(override_cfg);

        assert_eq!(base.module.name, Some("rizin".to_string()));
        assert_eq!(base.module.directors, Some(false));
        assert_eq!(base.clang.args, vec!["-std=gnu11", "-Wno-everything"]);
        assert_eq!(base.clang.defines, vec!["RZ_BINDINGS"]);
    }

    #[test]
    fn test_config_discover() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("bindings").join("python");
        std::fs::create_dir_all(&nested).unwrap();

        std::fs::write(tmp.path().join(CONFIG_FILE), "[module]\nname = \"rizin\"\n").unwrap();

        let found = Config::discover(&nested).unwrap();
        assert_eq!(found, tmp.path().join(CONFIG_FILE));
        let loaded = Config::load(&found).unwrap();
        assert_eq!(loaded.module.name, Some("rizin".to_string()));
    }
}
