use std::path::PathBuf;

use thiserror::Error;

/// Main error type for exportmap operations
#[derive(Error, Debug)]
pub enum ExportMapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entry file not found: {}", .0.display())]
    MissingEntry(PathBuf),

    #[error("Project metadata error in {}: {message}", .path.display())]
    Metadata { path: PathBuf, message: String },

    #[error("Analysis task failed: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, ExportMapError>;
