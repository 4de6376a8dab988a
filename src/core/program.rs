//! Loads source files on demand and binds their symbols.
//!
//! Every file is parsed once; its declarations, imports and exports become
//! entries in a symbol arena. Imports and re-exports are alias symbols that
//! are only followed when asked for, so loading never recurses.

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;
use super::host::{normalize_path, SourceHost};
use super::references::package_key;
use super::{CodeParser, DeclarationNode, DefaultExport, ParsedFile, Statement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

/// Identity of a resolved symbol that stays stable across runs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolKey {
    Declaration { file: PathBuf, name: String, line: usize },
    SourceFile(PathBuf),
    External { specifier: String, name: String },
    Global(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportName {
    Named(String),
    Namespace,
}

/// Where an alias points before it is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTarget {
    pub from: FileId,
    pub specifier: String,
    pub import: ImportName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Declaration { file: FileId, statement: usize },
    SourceFile(FileId),
    Alias(AliasTarget),
    /// Imported from a bare specifier; `from` is the first importing file
    External { from: FileId, specifier: String, name: String },
    /// Ambient name with no local or imported binding
    Global,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
}

/// One exported name of a file, in statement order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEntry {
    /// `export class X`, `export { x }`, `export { x } from "./m"`
    Binding { exported: String, symbol: SymbolId },
    /// `export * from "./m"`
    Wildcard { specifier: String },
    /// `export * as ns from "./m"`
    Namespace { exported: String, symbol: SymbolId },
}

struct BoundFile {
    parsed: ParsedFile,
    symbol: SymbolId,
    locals: HashMap<String, SymbolId>,
    declarations: HashMap<usize, SymbolId>,
    exports: HashMap<String, SymbolId>,
    entries: Vec<ExportEntry>,
    wildcards: Vec<String>,
}

pub struct Program {
    host: Box<dyn SourceHost>,
    parser: CodeParser,
    files: Vec<BoundFile>,
    by_path: HashMap<PathBuf, FileId>,
    symbols: Vec<Symbol>,
    externals: HashMap<(String, String), SymbolId>,
    globals: HashMap<String, SymbolId>,
}

impl Program {
    pub fn new(host: Box<dyn SourceHost>, parser: CodeParser) -> Self {
        Self {
            host,
            parser,
            files: Vec::new(),
            by_path: HashMap::new(),
            symbols: Vec::new(),
            externals: HashMap::new(),
            globals: HashMap::new(),
        }
    }

    pub fn host(&self) -> &dyn SourceHost {
        self.host.as_ref()
    }

    /// Parse and bind a file, once
    pub fn load(&mut self, path: &Path) -> Result<FileId> {
        let path = normalize_path(path);
        if let Some(id) = self.by_path.get(&path) {
            return Ok(*id);
        }

        let content = self.host.read(&path)?;
        let parsed = self.parser.parse_source(&path, &content)?;
        debug!("Loaded {} ({} statements)", path.display(), parsed.statements.len());

        let id = FileId(self.files.len());
        let file_name = file_stem(&path);
        let symbol = self.push_symbol(file_name, SymbolKind::SourceFile(id));
        let mut bound = BoundFile {
            parsed,
            symbol,
            locals: HashMap::new(),
            declarations: HashMap::new(),
            exports: HashMap::new(),
            entries: Vec::new(),
            wildcards: Vec::new(),
        };
        self.bind_locals(id, &mut bound);
        self.bind_exports(id, &mut bound);

        self.files.push(bound);
        self.by_path.insert(path, id);
        Ok(id)
    }

    /// Load for resolution purposes; failures drop the edge
    fn try_load(&mut self, path: &Path) -> Option<FileId> {
        match self.load(path) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Whether the parser handles this file type
    pub fn is_source(&self, path: &Path) -> bool {
        self.parser.should_parse_file(path)
    }

    pub fn file(&self, id: FileId) -> &ParsedFile {
        &self.files[id.0].parsed
    }

    pub fn file_path(&self, id: FileId) -> &Path {
        &self.files[id.0].parsed.path
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    /// Exported names of a file in statement order
    pub fn export_entries(&self, file: FileId) -> Vec<ExportEntry> {
        self.files[file.0].entries.clone()
    }

    /// Symbol of a top-level declaration statement
    pub fn declaration_symbol(&self, file: FileId, statement: usize) -> Option<SymbolId> {
        self.files[file.0].declarations.get(&statement).copied()
    }

    pub fn declaration_of(&self, symbol: SymbolId) -> Option<(FileId, &DeclarationNode)> {
        match &self.symbols[symbol.0].kind {
            SymbolKind::Declaration { file, statement } => {
                self.files[file.0].parsed.declaration(*statement).map(|decl| (*file, decl))
            }
            _ => None,
        }
    }

    /// Local binding of `name` in `file`, or the ambient global of that name
    pub fn lookup(&mut self, file: FileId, name: &str) -> SymbolId {
        let local = self.files[file.0].locals.get(name).copied();
        match local {
            Some(symbol) => symbol,
            None => self.intern_global(name),
        }
    }

    /// Stable identity; aliases have none until resolved
    pub fn symbol_key(&self, symbol: SymbolId) -> Option<SymbolKey> {
        let data = &self.symbols[symbol.0];
        match &data.kind {
            SymbolKind::Declaration { file, statement } => {
                let parsed = &self.files[file.0].parsed;
                let line = parsed
                    .declaration(*statement)
                    .map(|decl| decl.line_range.0)
                    .unwrap_or_default();
                Some(SymbolKey::Declaration {
                    file: parsed.path.clone(),
                    name: data.name.clone(),
                    line,
                })
            }
            SymbolKind::SourceFile(file) => Some(SymbolKey::SourceFile(self.file_path(*file).to_path_buf())),
            SymbolKind::External { specifier, name, .. } => Some(SymbolKey::External {
                specifier: specifier.clone(),
                name: name.clone(),
            }),
            SymbolKind::Global => Some(SymbolKey::Global(data.name.clone())),
            SymbolKind::Alias(_) => None,
        }
    }

    /// Resolve a relative specifier: `<module>.ts`, `<module>/index.ts`, then `<module>` itself
    pub fn resolve_specifier(&mut self, from: FileId, specifier: &str) -> Option<FileId> {
        if is_bare(specifier) {
            return None;
        }

        let base = self
            .file_path(from)
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(specifier);
        let candidates = [append_extension(&base, ".ts"), base.join("index.ts"), base.clone()];

        for candidate in candidates {
            let candidate = normalize_path(&candidate);
            if self.host.exists(&candidate) {
                return self.try_load(&candidate);
            }
        }

        debug!("Unresolved specifier {} from {}", specifier, self.file_path(from).display());
        None
    }

    /// Follow an alias chain to a non-alias symbol
    pub fn resolve_alias(&mut self, symbol: SymbolId) -> Option<SymbolId> {
        let mut current = symbol;
        let mut seen = HashSet::new();

        loop {
            let target = match &self.symbols[current.0].kind {
                SymbolKind::Alias(target) => target.clone(),
                _ => return Some(current),
            };
            if !seen.insert(current) {
                warn!("Alias cycle through {}", self.symbols[current.0].name);
                return None;
            }
            current = self.resolve_alias_target(&target)?;
        }
    }

    fn resolve_alias_target(&mut self, target: &AliasTarget) -> Option<SymbolId> {
        if is_bare(&target.specifier) {
            let name = match &target.import {
                ImportName::Named(name) => name.clone(),
                ImportName::Namespace => "*".to_string(),
            };
            return Some(self.intern_external(target.from, &target.specifier, &name));
        }

        let file = self.resolve_specifier(target.from, &target.specifier)?;
        match &target.import {
            ImportName::Namespace => Some(self.files[file.0].symbol),
            ImportName::Named(name) => {
                let found = self.export_symbol(file, name);
                if found.is_none() {
                    debug!("{} does not export {}", self.file_path(file).display(), name);
                }
                found
            }
        }
    }

    /// Symbol exported from `file` under `name`, looking through `export *`
    pub fn export_symbol(&mut self, file: FileId, name: &str) -> Option<SymbolId> {
        let mut seen = HashSet::new();
        self.export_symbol_inner(file, name, &mut seen)
    }

    fn export_symbol_inner(&mut self, file: FileId, name: &str, seen: &mut HashSet<FileId>) -> Option<SymbolId> {
        if !seen.insert(file) {
            return None;
        }
        if let Some(symbol) = self.files[file.0].exports.get(name) {
            return Some(*symbol);
        }
        // `export *` never forwards a default export
        if name == "default" {
            return None;
        }

        let wildcards = self.files[file.0].wildcards.clone();
        for specifier in wildcards {
            let Some(origin) = self.resolve_specifier(file, &specifier) else {
                continue;
            };
            if let Some(symbol) = self.export_symbol_inner(origin, name, seen) {
                return Some(symbol);
            }
        }
        None
    }

    /// Declaration entry file of the package a bare specifier points into
    pub fn find_package_types(&mut self, from: FileId, specifier: &str) -> Option<FileId> {
        let package = package_key(specifier);
        let subpath = specifier[package.len()..].trim_start_matches('/').to_string();
        let mut dir = self.file_path(from).parent().map(Path::to_path_buf);

        while let Some(current) = dir {
            let package_dir = current.join("node_modules").join(package);
            let mut candidates = Vec::new();
            if subpath.is_empty() {
                if let Some(types) = self.manifest_types(&package_dir) {
                    candidates.push(package_dir.join(types));
                }
                candidates.push(package_dir.join("index.d.ts"));
            } else {
                candidates.push(append_extension(&package_dir.join(&subpath), ".d.ts"));
                candidates.push(package_dir.join(&subpath).join("index.d.ts"));
            }

            for candidate in candidates {
                let candidate = normalize_path(&candidate);
                if self.host.exists(&candidate) {
                    return self.try_load(&candidate);
                }
            }
            dir = current.parent().map(Path::to_path_buf);
        }

        debug!("No declaration files found for {}", specifier);
        None
    }

    fn manifest_types(&self, package_dir: &Path) -> Option<String> {
        let manifest = package_dir.join("package.json");
        if !self.host.exists(&manifest) {
            return None;
        }
        let content = self.host.read(&manifest).ok()?;
        let value: serde_json::Value = serde_json::from_str(&content).ok()?;
        value
            .get("types")
            .or_else(|| value.get("typings"))
            .and_then(|types| types.as_str())
            .map(str::to_string)
    }

    fn push_symbol(&mut self, name: String, kind: SymbolKind) -> SymbolId {
        let id = SymbolId(self.symbols.len());
        self.symbols.push(Symbol { name, kind });
        id
    }

    fn intern_external(&mut self, from: FileId, specifier: &str, name: &str) -> SymbolId {
        let key = (specifier.to_string(), name.to_string());
        if let Some(symbol) = self.externals.get(&key) {
            return *symbol;
        }
        let symbol = self.push_symbol(
            name.to_string(),
            SymbolKind::External {
                from,
                specifier: specifier.to_string(),
                name: name.to_string(),
            },
        );
        self.externals.insert(key, symbol);
        symbol
    }

    fn intern_global(&mut self, name: &str) -> SymbolId {
        if let Some(symbol) = self.globals.get(name) {
            return *symbol;
        }
        let symbol = self.push_symbol(name.to_string(), SymbolKind::Global);
        self.globals.insert(name.to_string(), symbol);
        symbol
    }

    fn push_alias(&mut self, name: &str, from: FileId, specifier: &str, import: ImportName) -> SymbolId {
        self.push_symbol(
            name.to_string(),
            SymbolKind::Alias(AliasTarget {
                from,
                specifier: specifier.to_string(),
                import,
            }),
        )
    }

    fn bind_locals(&mut self, id: FileId, bound: &mut BoundFile) {
        for (index, statement) in bound.parsed.statements.iter().enumerate() {
            match statement {
                Statement::Declaration(decl) => {
                    let name = decl.name.clone().unwrap_or_else(|| "default".to_string());
                    let symbol = self.push_symbol(name.clone(), SymbolKind::Declaration { file: id, statement: index });
                    bound.declarations.insert(index, symbol);
                    if decl.name.is_none() {
                        continue;
                    }
                    // Overloads and merged declarations keep the first binding
                    if bound.locals.contains_key(&name) {
                        debug!("{} declared more than once in {}", name, bound.parsed.path.display());
                    } else {
                        bound.locals.insert(name, symbol);
                    }
                }
                Statement::Import(import) => {
                    if let Some(local) = &import.default {
                        let alias = self.push_alias(local, id, &import.specifier, ImportName::Named("default".to_string()));
                        bound.locals.insert(local.clone(), alias);
                    }
                    if let Some(local) = &import.namespace {
                        let alias = self.push_alias(local, id, &import.specifier, ImportName::Namespace);
                        bound.locals.insert(local.clone(), alias);
                    }
                    for binding in &import.named {
                        let alias = self.push_alias(
                            &binding.local,
                            id,
                            &import.specifier,
                            ImportName::Named(binding.imported.clone()),
                        );
                        bound.locals.insert(binding.local.clone(), alias);
                    }
                }
                _ => {}
            }
        }
    }

    fn bind_exports(&mut self, id: FileId, bound: &mut BoundFile) {
        for (index, statement) in bound.parsed.statements.iter().enumerate() {
            match statement {
                Statement::Declaration(decl) => {
                    let (Some(exported), Some(symbol)) = (decl.exported_name(), bound.declarations.get(&index)) else {
                        continue;
                    };
                    record_export(
                        &mut bound.exports,
                        &mut bound.entries,
                        ExportEntry::Binding { exported: exported.to_string(), symbol: *symbol },
                    );
                }
                Statement::ExportNamed(named) => {
                    for binding in &named.names {
                        let symbol = match &named.specifier {
                            Some(specifier) => self.push_alias(
                                &binding.exported,
                                id,
                                specifier,
                                ImportName::Named(binding.local.clone()),
                            ),
                            None => match bound.locals.get(&binding.local) {
                                Some(symbol) => *symbol,
                                None => {
                                    debug!("Export of undeclared {} in {}", binding.local, bound.parsed.path.display());
                                    continue;
                                }
                            },
                        };
                        record_export(
                            &mut bound.exports,
                            &mut bound.entries,
                            ExportEntry::Binding { exported: binding.exported.clone(), symbol },
                        );
                    }
                }
                Statement::ExportAll { specifier } => {
                    bound.wildcards.push(specifier.clone());
                    bound.entries.push(ExportEntry::Wildcard { specifier: specifier.clone() });
                }
                Statement::ExportNamespace { name, specifier } => {
                    let symbol = self.push_alias(name, id, specifier, ImportName::Namespace);
                    record_export(
                        &mut bound.exports,
                        &mut bound.entries,
                        ExportEntry::Namespace { exported: name.clone(), symbol },
                    );
                }
                Statement::ExportDefault(DefaultExport::Identifier(local)) => {
                    if let Some(symbol) = bound.locals.get(local) {
                        record_export(
                            &mut bound.exports,
                            &mut bound.entries,
                            ExportEntry::Binding { exported: "default".to_string(), symbol: *symbol },
                        );
                    }
                }
                Statement::ExportDefault(DefaultExport::Expression) | Statement::Import(_) => {}
            }
        }
    }
}

/// First export of a name wins; later duplicates are overload signatures
fn record_export(exports: &mut HashMap<String, SymbolId>, entries: &mut Vec<ExportEntry>, entry: ExportEntry) {
    let (exported, symbol) = match &entry {
        ExportEntry::Binding { exported, symbol } | ExportEntry::Namespace { exported, symbol } => (exported, *symbol),
        ExportEntry::Wildcard { .. } => {
            entries.push(entry);
            return;
        }
    };
    if exports.contains_key(exported) {
        return;
    }
    exports.insert(exported.clone(), symbol);
    entries.push(entry);
}

/// Specifiers that name a package rather than a file
pub fn is_bare(specifier: &str) -> bool {
    !(specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
        || specifier == "."
        || specifier == "..")
}

/// File name without `.d.ts` or the last extension
pub fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    if let Some(stem) = name.strip_suffix(".d.ts") {
        return stem.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name,
    }
}

fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(extension);
    PathBuf::from(raw)
}
