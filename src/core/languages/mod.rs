//! Language-specific parsers for the ECMAScript family
//!
//! Each dialect gets a tree-sitter grammar; all of them lower source code into
//! the same statement model.

mod typescript;

pub use typescript::{Dialect, TypeScriptParser};

use crate::error::Result;
use super::Statement;

/// Trait that all language parsers must implement
pub trait LanguageParser: Send {
    /// Parse source code and lower its top-level statements
    fn parse(&mut self, content: &str, file_path: &std::path::Path) -> Result<Vec<Statement>>;

    /// Extract file-level documentation from source code
    fn extract_file_docs(&self, content: &str) -> Option<String>;

    /// Get the file extensions this parser handles
    fn file_extensions(&self) -> &[&str];

    /// Get the language name
    fn language_name(&self) -> &str;
}
