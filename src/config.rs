//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/genja/genja.toml`
//! 3. Project config: `<project>/genja.toml`, or an explicit `--config` file
//! 4. Environment variables: `GENJA_*` prefix

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::Bindings;
use crate::util::path::{expand_env_vars, resolve_against};

/// File name of the project config.
pub const PROJECT_CONFIG_FILE: &str = "genja.toml";

/// One output of a configured rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Appended to the template stem, before the output extension
    pub suffix: String,
    /// Variables for the template
    #[serde(default)]
    pub bindings: Bindings,
}

/// A rule attached to one directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleConfig {
    /// Directory relative to the root (default: the root itself)
    #[serde(default = "default_rule_directory")]
    pub directory: PathBuf,
    /// Glob matched against template file names
    pub pattern: String,
    /// Display name (default: the pattern)
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
}

/// The fallback rule used when no directory rule matches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefaultRuleConfig {
    pub pattern: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
}

fn default_rule_directory() -> PathBuf {
    PathBuf::from(".")
}

/// Raw settings for intermediate parsing.
///
/// `None` means the layer did not specify the field and inherits it.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub root_dir: Option<PathBuf>,
    pub raise_on_warning: Option<bool>,
    pub mtime_tolerance_secs: Option<u64>,
    pub extensions: Option<BTreeMap<String, String>>,
    pub rules: Option<Vec<RuleConfig>>,
    pub default_rule: Option<DefaultRuleConfig>,
}

/// Unified configuration for genja.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Directory templates are searched below (default: the project directory)
    pub root_dir: PathBuf,
    /// Abort a run on the first warning
    pub raise_on_warning: bool,
    /// Seconds a template must be newer than its output to trigger regeneration
    pub mtime_tolerance_secs: u64,
    /// Template extension -> output extension
    pub extensions: BTreeMap<String, String>,
    pub rules: Vec<RuleConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_rule: Option<DefaultRuleConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            raise_on_warning: false,
            mtime_tolerance_secs: 1,
            extensions: BTreeMap::new(),
            rules: Vec::new(),
            default_rule: None,
        }
    }
}

/// Get the XDG config directory for genja.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "genja").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("genja.toml"))
}

/// Get the path to the project config file.
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(PROJECT_CONFIG_FILE)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge overlay config onto self (base).
    ///
    /// - Scalars: overlay wins if Some
    /// - Extensions: dots stripped, then merged by key, overlay wins per key
    /// - Rules: overlay rules are appended after the base rules
    /// - Default rule: overlay replaces base
    fn merge_with(&self, overlay: &RawSettings) -> Result<Self, ApplicationError> {
        let mut extensions = self.extensions.clone();
        if let Some(overlay_ext) = &overlay.extensions {
            extensions.extend(normalized_extensions(overlay_ext)?);
        }

        let mut rules = self.rules.clone();
        if let Some(overlay_rules) = &overlay.rules {
            rules.extend(overlay_rules.iter().cloned());
        }

        Ok(Self {
            root_dir: overlay
                .root_dir
                .clone()
                .unwrap_or_else(|| self.root_dir.clone()),
            raise_on_warning: overlay.raise_on_warning.unwrap_or(self.raise_on_warning),
            mtime_tolerance_secs: overlay
                .mtime_tolerance_secs
                .unwrap_or(self.mtime_tolerance_secs),
            extensions,
            rules,
            default_rule: overlay
                .default_rule
                .clone()
                .or_else(|| self.default_rule.clone()),
        })
    }

    /// Expand shell variables and tilde in `root_dir`, then resolve it
    /// against `project_dir`.
    fn expand_paths(&mut self, project_dir: &Path) {
        let expanded = expand_env_vars(self.root_dir.to_string_lossy().as_ref());
        self.root_dir = resolve_against(Path::new(&expanded), project_dir);
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Directory holding the project config; relative `root_dir` values resolve against it
    /// * `config_file` - Explicit config file used instead of `<project_dir>/genja.toml`; it must exist
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/genja/genja.toml`
    /// 3. Project config
    /// 4. Environment variables: `GENJA_*` prefix (scalars only)
    pub fn load(project_dir: &Path, config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw)?;
            }
        }

        // 3. Project config (an explicit file must exist)
        match config_file {
            Some(path) => {
                let raw = load_raw_settings(path)?;
                current = current.merge_with(&raw)?;
            }
            None => {
                let local_path = project_config_path(project_dir);
                if local_path.exists() {
                    let raw = load_raw_settings(&local_path)?;
                    current = current.merge_with(&raw)?;
                }
            }
        }

        // 4. Environment overrides
        current = Self::apply_env_overrides(current)?;

        current.expand_paths(project_dir);

        Ok(current)
    }

    /// Load a single config file on top of the defaults, without the global
    /// config or environment.
    pub fn from_file(path: &Path, project_dir: &Path) -> Result<Self, ApplicationError> {
        let raw = load_raw_settings(path)?;
        let mut settings = Self::default().merge_with(&raw)?;
        settings.expand_paths(project_dir);
        Ok(settings)
    }

    /// Apply GENJA_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let builder = Config::builder().add_source(
            Environment::with_prefix("GENJA")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("root_dir") {
            settings.root_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("raise_on_warning") {
            settings.raise_on_warning = val;
        }
        if let Ok(val) = config.get_int("mtime_tolerance_secs") {
            settings.mtime_tolerance_secs = u64::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("GENJA_MTIME_TOLERANCE_SECS must not be negative: {val}"),
            })?;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# genja configuration
#
# Locations (by precedence, lowest to highest):
#   Global:  ~/.config/genja/genja.toml
#   Project: <project>/genja.toml (or --config FILE)
#   Env:     GENJA_ROOT_DIR, GENJA_RAISE_ON_WARNING, GENJA_MTIME_TOLERANCE_SECS
#
# Extensions merge by key, rules from all layers are concatenated
# (global first). Within a directory the first matching rule wins.

# Directory templates are searched below, relative to the project
# root_dir = "."

# Treat every warning (including failed outputs) as an error
# raise_on_warning = false

# Seconds a template must be newer than its output to be regenerated
# mtime_tolerance_secs = 1

[extensions]
# Template extension = output extension
# cpy = "pyx"
# cpd = "pxd"

# [[rules]]
# directory = "src/types"
# pattern = "*.cpy"
# name = "integer types"
#
# [[rules.outputs]]
# suffix = "_INT32"
# bindings = { type = "INT32_t" }
#
# [[rules.outputs]]
# suffix = "_INT64"
# bindings = { type = "INT64_t" }

# Fallback for templates no directory rule matches
# [default_rule]
# pattern = "*"
# outputs = [{ suffix = "" }]
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

/// Strip leading dots from the extensions of one config layer.
///
/// `".cpy"` and `cpy` name the same input; a layer mapping both to different
/// outputs is rejected.
fn normalized_extensions(
    raw: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, ApplicationError> {
    let mut normalized: BTreeMap<String, String> = BTreeMap::new();
    for (input, output) in raw {
        let input = input.trim_start_matches('.');
        let output = output.trim_start_matches('.');
        if let Some(existing) = normalized.get(input) {
            if existing != output {
                return Err(ApplicationError::DuplicateExtension {
                    input: input.to_string(),
                    existing: existing.clone(),
                });
            }
        }
        normalized.insert(input.to_string(), output.to_string());
    }
    Ok(normalized)
}
