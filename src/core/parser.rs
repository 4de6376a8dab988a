use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ParsingConfig;
use crate::error::{ExportMapError, Result};
use super::languages::{Dialect, LanguageParser, TypeScriptParser};

/// Represents a parsed source file lowered to top-level statements
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Normalized file path
    pub path: PathBuf,

    /// Language detected from the file name
    pub language: String,

    /// Content hash for change detection
    pub content_hash: String,

    /// File-level documentation/comments
    pub file_docs: Option<String>,

    /// Top-level statements in source order
    pub statements: Vec<Statement>,
}

impl ParsedFile {
    pub fn declaration(&self, index: usize) -> Option<&DeclarationNode> {
        match self.statements.get(index) {
            Some(Statement::Declaration(decl)) => Some(decl),
            _ => None,
        }
    }
}

/// A top-level statement relevant to the export model
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `class X {}`, `export interface Y {}`, `export default function () {}`
    Declaration(DeclarationNode),
    /// `import D, { a as b } from "./m"` or `import * as ns from "./m"`
    Import(ImportNode),
    /// `export { a, b as c }` with an optional `from "<module>"`
    ExportNamed(ExportNamedNode),
    /// `export * from "<module>"`
    ExportAll { specifier: String },
    /// `export * as name from "<module>"`
    ExportNamespace { name: String, specifier: String },
    /// `export default <expression>`
    ExportDefault(DefaultExport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclarationKind {
    Class,
    Interface,
    Enum,
    Function,
    Variable,
    Constant,
    TypeAlias,
    Namespace,
}

/// A declared item with the summary data needed for documentation
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationNode {
    /// `None` only for anonymous default exports
    pub name: Option<String>,
    pub kind: DeclarationKind,
    pub exported: bool,
    pub default_export: bool,
    /// `declare ...` at the top level
    pub ambient: bool,
    pub docs: Option<String>,
    pub signature: Option<String>,
    /// 1-based inclusive line range
    pub line_range: (usize, usize),
    pub members: Vec<MemberNode>,
    /// `extends`/`implements` targets and type alias targets
    pub heritage: Vec<TypeRef>,
    pub type_parameters: Vec<String>,
}

impl DeclarationNode {
    pub fn new(name: Option<String>, kind: DeclarationKind) -> Self {
        Self {
            name,
            kind,
            exported: false,
            default_export: false,
            ambient: false,
            docs: None,
            signature: None,
            line_range: (0, 0),
            members: Vec::new(),
            heritage: Vec::new(),
            type_parameters: Vec::new(),
        }
    }

    /// Name this declaration is exported under, if exported at all
    pub fn exported_name(&self) -> Option<&str> {
        if self.default_export {
            Some("default")
        } else if self.exported {
            self.name.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberKind {
    Constructor,
    Method,
    Property,
    Signature,
    EnumMember,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberNode {
    pub name: String,
    pub kind: MemberKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// A type name as written, `Foo` or `Foo.Bar`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub name: String,
    pub member: Option<String>,
}

impl TypeRef {
    /// Split a dotted name on its last separator
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let base = text.split('<').next().unwrap_or(text).trim();
        if base.is_empty() {
            return None;
        }
        match base.rsplit_once('.') {
            Some((name, member)) => Some(Self {
                name: name.to_string(),
                member: Some(member.to_string()),
            }),
            None => Some(Self {
                name: base.to_string(),
                member: None,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportNode {
    pub specifier: String,
    pub default: Option<String>,
    pub namespace: Option<String>,
    pub named: Vec<ImportBinding>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportBinding {
    pub imported: String,
    pub local: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportNamedNode {
    pub specifier: Option<String>,
    pub names: Vec<ExportBinding>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportBinding {
    pub local: String,
    pub exported: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultExport {
    Identifier(String),
    Expression,
}

/// Multi-dialect parser that delegates to tree-sitter backed parsers
pub struct CodeParser {
    config: ParsingConfig,
    language_parsers: HashMap<Dialect, Box<dyn LanguageParser>>,
}

impl CodeParser {
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        let mut language_parsers: HashMap<Dialect, Box<dyn LanguageParser>> = HashMap::new();

        for dialect in [Dialect::TypeScript, Dialect::Tsx, Dialect::JavaScript] {
            language_parsers.insert(dialect, Box::new(TypeScriptParser::new(dialect)?));
        }

        Ok(Self {
            config: config.clone(),
            language_parsers,
        })
    }

    /// Whether any registered parser handles this file
    pub fn should_parse_file(&self, path: &Path) -> bool {
        self.detect_dialect(path).is_ok()
    }

    /// Parse already loaded source text
    pub fn parse_source(&mut self, path: &Path, source_content: &str) -> Result<ParsedFile> {
        let dialect = self.detect_dialect(path)?;

        // Check file size
        if source_content.len() > self.config.max_file_size {
            return Err(ExportMapError::Parser(
                format!("File {} exceeds maximum size limit", path.display())
            ));
        }

        let content_hash = calculate_hash(source_content);

        let parser = self.language_parsers.get_mut(&dialect).ok_or_else(|| {
            ExportMapError::Parser(format!("No parser registered for {:?}", dialect))
        })?;
        let statements = parser.parse(source_content, path)?;
        let file_docs = parser.extract_file_docs(source_content);

        Ok(ParsedFile {
            path: path.to_path_buf(),
            language: parser.language_name().to_string(),
            content_hash,
            file_docs,
            statements,
        })
    }

    /// Detect the grammar to use from the file name
    fn detect_dialect(&self, path: &Path) -> Result<Dialect> {
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            for (dialect, parser) in &self.language_parsers {
                if parser.file_extensions().contains(&extension) {
                    return Ok(*dialect);
                }
            }
        }

        Err(ExportMapError::Parser(
            format!("Could not detect language for file: {}", path.display())
        ))
    }
}

/// Calculate SHA256 hash of content
pub fn calculate_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
