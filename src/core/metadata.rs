//! Project discovery from an entry file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{ExportMapError, Result};
use super::host::{normalize_path, SourceHost};
use super::module_tree::RootMetadata;

const README_CANDIDATES: &[&str] = &["README.md", "readme.md", "Readme.md", "README"];

/// One analyzed project
#[derive(Debug, Clone)]
pub struct ProjectSpec {
    pub name: String,
    pub root_dir: PathBuf,
    pub entry: PathBuf,
    pub metadata: RootMetadata,
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    name: Option<String>,
    version: Option<String>,
    repository: Option<Repository>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Repository {
    Url(String),
    Detailed { url: String },
}

/// Find the project an entry file belongs to.
///
/// The root is the nearest directory above the entry holding a
/// `package.json`; without one, the entry's own directory.
pub fn discover_project(host: &dyn SourceHost, entry: &Path) -> Result<ProjectSpec> {
    let entry = normalize_path(entry);
    if !host.exists(&entry) {
        return Err(ExportMapError::MissingEntry(entry));
    }
    let entry_dir = entry.parent().map(Path::to_path_buf).unwrap_or_default();

    let Some(root_dir) = entry_dir
        .ancestors()
        .find(|dir| host.exists(&dir.join("package.json")))
        .map(Path::to_path_buf)
    else {
        debug!("No package.json above {}", entry.display());
        return Ok(ProjectSpec {
            name: directory_name(&entry_dir),
            metadata: RootMetadata {
                readme: find_readme(host, &entry_dir),
                ..RootMetadata::default()
            },
            root_dir: entry_dir,
            entry,
        });
    };

    let manifest_path = root_dir.join("package.json");
    let manifest: PackageManifest = serde_json::from_str(&host.read(&manifest_path)?).map_err(|e| {
        ExportMapError::Metadata {
            path: manifest_path.clone(),
            message: e.to_string(),
        }
    })?;
    let name = manifest.name.filter(|name| !name.is_empty()).ok_or_else(|| ExportMapError::Metadata {
        path: manifest_path.clone(),
        message: "missing required field `name`".to_string(),
    })?;

    Ok(ProjectSpec {
        name,
        metadata: RootMetadata {
            version: manifest.version,
            repository: manifest.repository.map(|repository| match repository {
                Repository::Url(url) | Repository::Detailed { url } => url,
            }),
            readme: find_readme(host, &root_dir),
        },
        root_dir,
        entry,
    })
}

fn find_readme(host: &dyn SourceHost, dir: &Path) -> Option<String> {
    README_CANDIDATES
        .iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| host.exists(path))
        .and_then(|path| host.read(&path).ok())
}

fn directory_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "root".to_string())
}
