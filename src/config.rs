use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ExportMapError, Result};

/// Config file names tried in the working directory
pub const CONFIG_CANDIDATES: &[&str] = &["exportmap.toml", "ExportMap.toml", ".exportmap.toml"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Source code parsing configuration
    #[serde(default)]
    pub parsing: ParsingConfig,

    /// External library resolvers, name-keyed entries first, fallbacks in order
    #[serde(default)]
    pub externals: Vec<ExternalConfig>,

    /// Built-in resolver for ECMAScript/DOM globals
    #[serde(default)]
    pub globals: GlobalsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Entry point files, one per analyzed project
    pub entries: Vec<PathBuf>,

    /// Folder names that do not create a module level
    #[serde(default)]
    pub passthrough: Vec<String>,

    /// Where the JSON model is written
    pub output: PathBuf,

    /// JSON map of file path to content hash for files documented by a previous run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documented_cache: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024, // 1MB
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalConfig {
    /// Top-level package name; resolvers without one are fallbacks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    /// Link template, supports {name}, {specifier} and {package}
    pub url: String,

    /// Only these names are claimed when non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,

    /// Classify names by kind from the package's declaration files
    #[serde(default)]
    pub kind_accurate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalsConfig {
    pub enabled: bool,
}

impl Default for GlobalsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                entries: vec![PathBuf::from("src/index.ts")],
                passthrough: vec!["src".to_string(), "lib".to_string()],
                output: PathBuf::from("api-model.json"),
                documented_cache: None,
            },
            parsing: ParsingConfig::default(),
            externals: Vec::new(),
            globals: GlobalsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ExportMapError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ExportMapError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => match Self::find_default() {
                Some(candidate) => Self::load(candidate),
                None => Ok(Self::default()),
            },
        }
    }

    /// First of the common config file locations that exists
    pub fn find_default() -> Option<PathBuf> {
        CONFIG_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.exists())
    }

    /// Reject settings the analyzer cannot run with
    pub fn validate(&self) -> Result<()> {
        for external in &self.externals {
            if external.url.trim().is_empty() {
                return Err(ExportMapError::Config(format!(
                    "external resolver {} has an empty url",
                    external.package.as_deref().unwrap_or("<fallback>")
                )));
            }
            if external.kind_accurate && external.package.is_none() {
                return Err(ExportMapError::Config(
                    "kind_accurate requires a package name".to_string(),
                ));
            }
        }
        Ok(())
    }
}
