use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Config, CONFIG_CANDIDATES};
use crate::error::ExportMapError;
use super::host::{normalize_path, DiskHost, SourceHost};
use super::{
    discover_project, Analyzer, CodeParser, GlobalsResolver, Module, Program,
    ReferenceManager, UrlTemplateResolver,
};

/// The JSON document written by `build`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDocument {
    pub generator: String,
    pub generator_version: String,
    pub generated_at: DateTime<Utc>,
    pub reference_count: usize,
    pub files_visited: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unreached_files: Vec<PathBuf>,
    pub projects: Vec<Module>,
}

/// Main orchestration engine: configuration, analysis and output
pub struct Engine {
    config: Config,
    /// Relative paths in the configuration resolve against this directory
    base_dir: PathBuf,
}

impl Engine {
    /// Create a new engine from a config file, or the defaults
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to read the working directory")?;
        let config_file = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => Config::find_default(),
        };
        let config = Config::load_or_default(config_file.as_deref())?;

        debug!("Loaded configuration: {:?}", config);

        let base_dir = config_file
            .as_deref()
            .filter(|path| path.exists())
            .and_then(Path::parent)
            .map(|dir| current_dir.join(dir))
            .unwrap_or(current_dir);

        Ok(Self::from_config(config, base_dir))
    }

    pub fn from_config(config: Config, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            base_dir: normalize_path(&base_dir.into()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Write a default configuration file
    pub async fn init(&self, path: Option<PathBuf>, force: bool) -> Result<()> {
        let target_dir = match path {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        let config_path = target_dir.join(CONFIG_CANDIDATES[0]);
        info!("Initializing exportmap in: {}", target_dir.display());

        if config_path.exists() && !force {
            warn!("⚠️ {} already exists, use --force to overwrite", config_path.display());
            return Ok(());
        }

        tokio::fs::create_dir_all(&target_dir)
            .await
            .with_context(|| format!("Failed to create {}", target_dir.display()))?;
        Config::default().save(&config_path)?;
        info!("✅ Wrote {}", config_path.display());
        Ok(())
    }

    /// Analyze every entry point and write the JSON model
    pub async fn build(
        &mut self,
        entries: Vec<PathBuf>,
        output: Option<PathBuf>,
        passthrough: Vec<String>,
    ) -> Result<OutputDocument> {
        if !entries.is_empty() {
            self.config.project.entries = entries;
        }
        if !passthrough.is_empty() {
            self.config.project.passthrough = passthrough;
        }
        if let Some(output) = output {
            self.config.project.output = output;
        }

        let documented = self.load_documented_cache().await?;
        let config = self.config.clone();
        let base_dir = self.base_dir.clone();

        info!("🔍 Analyzing {} entry point(s)...", config.project.entries.len());
        let document = tokio::task::spawn_blocking(move || {
            Self::analyze(&config, &base_dir, Box::new(DiskHost), documented)
        })
        .await
        .map_err(|e| ExportMapError::Join(e.to_string()))??;

        let output_path = self.resolve(&self.config.project.output);
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&document)?;
        tokio::fs::write(&output_path, json)
            .await
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        info!(
            "🎉 Wrote {} ({} projects, {} files, {} references)",
            output_path.display(),
            document.projects.len(),
            document.files_visited,
            document.reference_count
        );
        Ok(document)
    }

    /// Run one synchronous analysis over the given host
    pub fn analyze(
        config: &Config,
        base_dir: &Path,
        host: Box<dyn SourceHost>,
        documented: HashMap<PathBuf, String>,
    ) -> crate::error::Result<OutputDocument> {
        let projects = config
            .project
            .entries
            .iter()
            .map(|entry| discover_project(host.as_ref(), &normalize_path(&base_dir.join(entry))))
            .collect::<crate::error::Result<Vec<_>>>()?;
        for project in &projects {
            debug!("Project {} rooted at {}", project.name, project.root_dir.display());
        }

        let references = Self::resolvers(config);
        let program = Program::new(host, CodeParser::new(&config.parsing)?);
        let analysis = Analyzer::new(program, projects, &config.project.passthrough)
            .with_references(references)
            .with_documented(documented)
            .run()?;

        Ok(OutputDocument {
            generator: env!("CARGO_PKG_NAME").to_string(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
            reference_count: analysis.references.len(),
            files_visited: analysis.files_visited,
            unreached_files: analysis.unreached,
            projects: analysis.modules,
        })
    }

    /// Resolver registry from the `[[externals]]` tables
    fn resolvers(config: &Config) -> ReferenceManager {
        let mut references = ReferenceManager::new();

        for external in &config.externals {
            let resolver = UrlTemplateResolver::new(external.url.clone()).with_names(external.names.clone());
            match &external.package {
                Some(package) => {
                    references.register_named(package.clone(), Box::new(resolver), external.kind_accurate);
                }
                None => references.register_fallback(Box::new(resolver)),
            }
        }
        if config.globals.enabled {
            references.register_fallback(Box::new(GlobalsResolver));
        }

        references
    }

    async fn load_documented_cache(&self) -> Result<HashMap<PathBuf, String>> {
        let Some(path) = &self.config.project.documented_cache else {
            return Ok(HashMap::new());
        };
        let path = self.resolve(path);
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read documented cache {}", path.display()))?;
        let cache: HashMap<PathBuf, String> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid documented cache {}", path.display()))?;

        debug!("Loaded {} documented file hashes", cache.len());
        Ok(cache
            .into_iter()
            .map(|(file, hash)| (normalize_path(&self.base_dir.join(file)), hash))
            .collect())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        normalize_path(&self.base_dir.join(path))
    }
}
