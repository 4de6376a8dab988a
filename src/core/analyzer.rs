//! One analysis run over every configured project.
//!
//! The analyzer owns all per-run state: the loaded program, one module tree
//! per project, the reference table and the external library index. Each
//! project's entry file is visited depth-first; exports that point into a
//! sibling project are queued and replayed once every project finished its
//! own pass.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ExportMapError, Result};
use super::library_index::LibraryIndex;
use super::metadata::ProjectSpec;
use super::model::{Module, ReferenceKind, ReferenceType};
use super::module_tree::{ModuleId, ModuleTree};
use super::program::{ExportEntry, FileId, Program, SymbolId, SymbolKey, SymbolKind};
use super::references::{package_key, ReferenceManager};
use super::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
    /// Each project on its own; cross-project edges are queued
    Local,
    /// Replaying queued edges with every tree populated
    CrossProject,
}

/// The file an export statement belongs to
#[derive(Debug, Clone)]
pub(super) struct ExportSite {
    pub file: FileId,
    pub project: usize,
    pub module: ModuleId,
    pub key: String,
}

#[derive(Debug, Clone)]
pub(super) struct Deferred {
    pub site: ExportSite,
    pub entry: ExportEntry,
}

/// Result of a finished run
pub struct Analysis {
    /// One tree per project, in entry order
    pub modules: Vec<Module>,
    /// Reference table, reusable by a later run
    pub references: ReferenceManager,
    pub files_visited: usize,
    /// Source files under a project root that no entry reaches
    pub unreached: Vec<PathBuf>,
}

pub struct Analyzer {
    pub(super) program: Program,
    pub(super) projects: Vec<ProjectSpec>,
    pub(super) trees: Vec<ModuleTree>,
    pub(super) references: ReferenceManager,
    pub(super) library: LibraryIndex,
    pub(super) documented: HashMap<PathBuf, String>,
    pub(super) deferred: Vec<Deferred>,
    pub(super) phase: Phase,
}

impl Analyzer {
    pub fn new(program: Program, projects: Vec<ProjectSpec>, passthrough: &[String]) -> Self {
        let trees = projects
            .iter()
            .map(|project| {
                ModuleTree::new(&project.name, &project.root_dir, passthrough)
                    .with_metadata(project.metadata.clone())
            })
            .collect();

        Self {
            program,
            projects,
            trees,
            references: ReferenceManager::new(),
            library: LibraryIndex::default(),
            documented: HashMap::new(),
            deferred: Vec::new(),
            phase: Phase::Local,
        }
    }

    /// Use a caller-supplied reference table, e.g. one kept from an earlier run.
    ///
    /// The library index follows the table's kind-accurate packages.
    pub fn with_references(mut self, references: ReferenceManager) -> Self {
        self.library = LibraryIndex::new(references.kind_accurate_packages());
        self.references = references;
        self
    }

    /// Files whose content hash matches get no declaration summaries
    pub fn with_documented(mut self, documented: HashMap<PathBuf, String>) -> Self {
        self.documented = documented;
        self
    }

    pub fn run(mut self) -> Result<Analysis> {
        let entries: Vec<PathBuf> = self.projects.iter().map(|project| project.entry.clone()).collect();

        for (index, entry) in entries.iter().enumerate() {
            info!("Analyzing project {} from {}", self.projects[index].name, entry.display());
            if !self.program.host().exists(entry) {
                return Err(ExportMapError::MissingEntry(entry.clone()));
            }
            let file = self.program.load(entry)?;
            if self.visit(file).is_none() {
                warn!("Entry {} lies outside its project root", entry.display());
            }
        }

        self.phase = Phase::CrossProject;
        let deferred = std::mem::take(&mut self.deferred);
        if !deferred.is_empty() {
            info!("Resolving {} cross-project exports", deferred.len());
        }
        for Deferred { site, entry } in deferred {
            self.aggregate_entry(&site, entry);
        }

        for tree in &self.trees {
            for violation in tree.check_invariants() {
                warn!("Module tree of {}: {}", tree.project(), violation);
            }
        }

        let files_visited = self.trees.iter().map(ModuleTree::visited_count).sum();
        info!(
            "Visited {} files, {} references memoized",
            files_visited,
            self.references.len()
        );
        let unreached = self.unreached_files();
        if !unreached.is_empty() {
            info!("{} source files are not reachable from any entry", unreached.len());
        }

        Ok(Analysis {
            modules: self.trees.iter().map(ModuleTree::to_module).collect(),
            references: self.references,
            files_visited,
            unreached,
        })
    }

    /// Source files under a project root that no entry reaches
    fn unreached_files(&self) -> Vec<PathBuf> {
        let visited: HashSet<&Path> = self
            .trees
            .iter()
            .flat_map(ModuleTree::visited_files)
            .map(|file| self.program.file_path(file))
            .collect();

        let mut unreached = BTreeSet::new();
        for tree in &self.trees {
            for path in self.program.host().list(tree.root_dir()) {
                if tree.contains(&path) && self.program.is_source(&path) && !visited.contains(path.as_path()) {
                    unreached.insert(path);
                }
            }
        }
        unreached.into_iter().collect()
    }

    /// Project whose root most closely contains the file
    pub(super) fn project_of(&self, file: FileId) -> Option<usize> {
        let path = self.program.file_path(file);
        self.trees
            .iter()
            .enumerate()
            .filter(|(_, tree)| tree.contains(path))
            .max_by_key(|(_, tree)| tree.root_dir().components().count())
            .map(|(index, _)| index)
    }

    /// Memoized reference of a symbol, resolving non-declarations on demand
    pub(super) fn reference_for(&mut self, symbol: SymbolId) -> Option<ReferenceType> {
        let key = self.program.symbol_key(symbol)?;
        if let Some(reference) = self.references.get(&key) {
            return Some(reference.clone());
        }

        let data = self.program.symbol(symbol).clone();
        let reference = match data.kind {
            SymbolKind::Declaration { file, statement } => self.declared_reference(file, statement)?,
            SymbolKind::External { from, specifier, name } => self.resolve_external(from, &specifier, &name)?,
            SymbolKind::Global => self.references.find_external(&data.name, None, None)?,
            SymbolKind::SourceFile(_) | SymbolKind::Alias(_) => return None,
        };
        Some(self.references.set(key, reference).clone())
    }

    /// Reference of a declaration, derived from where its file lives
    pub(super) fn declared_reference(&self, file: FileId, statement: usize) -> Option<ReferenceType> {
        let tree = &self.trees[self.project_of(file)?];
        let module_path = tree.module_path_for(self.program.file_path(file))?;
        let module_name = module_path
            .last()
            .cloned()
            .unwrap_or_else(|| tree.project().to_string());
        let decl = self.program.file(file).declaration(statement)?;
        let name = decl.name.clone().unwrap_or_else(|| "default".to_string());

        Some(ReferenceType::declared(name, decl.kind.into(), tree.project(), module_path, &module_name))
    }

    /// Link an imported package symbol, classifying it when the package asks for it
    fn resolve_external(&mut self, from: FileId, specifier: &str, name: &str) -> Option<ReferenceType> {
        // Namespace imports name the package itself
        if name == "*" {
            return self.references.find_external(
                package_key(specifier),
                Some(specifier),
                Some(ReferenceKind::NamespaceOrModule),
            );
        }

        let kind = if self.references.is_kind_accurate(specifier) {
            if let Some(types) = self.program.find_package_types(from, specifier) {
                self.library.observe(&mut self.program, types);
            }
            Some(self.library.classify(package_key(specifier), name))
        } else {
            None
        };
        self.references.find_external(name, Some(specifier), kind)
    }

    /// Resolve a type name used in `file` to a reference; never fails
    pub(super) fn resolve_type_ref(&mut self, file: FileId, type_parameters: &[String], type_ref: &TypeRef) -> ReferenceType {
        let display = match &type_ref.member {
            Some(member) => format!("{}.{}", type_ref.name, member),
            None => type_ref.name.clone(),
        };
        if type_ref.member.is_none() && type_parameters.contains(&type_ref.name) {
            return ReferenceType::type_parameter(&type_ref.name);
        }

        let local = self.program.lookup(file, &type_ref.name);
        let Some(target) = self.program.resolve_alias(local) else {
            return ReferenceType::unknown(display);
        };
        let Some(member) = type_ref.member.as_deref() else {
            return self
                .reference_for(target)
                .unwrap_or_else(|| ReferenceType::unknown(display));
        };

        match self.program.symbol(target).kind.clone() {
            SymbolKind::SourceFile(origin) => {
                let resolved = self
                    .program
                    .export_symbol(origin, member)
                    .and_then(|symbol| self.program.resolve_alias(symbol))
                    .and_then(|symbol| self.reference_for(symbol));
                resolved.unwrap_or_else(|| ReferenceType::unknown(display))
            }
            SymbolKind::External { from, specifier, name } if name == "*" => {
                let key = SymbolKey::External { specifier: specifier.clone(), name: member.to_string() };
                if let Some(reference) = self.references.get(&key) {
                    return reference.clone();
                }
                match self.resolve_external(from, &specifier, member) {
                    Some(reference) => self.references.set(key, reference).clone(),
                    None => ReferenceType::unknown(display),
                }
            }
            _ => {
                let Some(base) = self.reference_for(target) else {
                    return ReferenceType::unknown(display);
                };
                match base.kind {
                    ReferenceKind::Enum => base.enum_member(member),
                    _ => ReferenceType {
                        display_name: Some(display),
                        ..base
                    },
                }
            }
        }
    }

    pub(super) fn is_documented(&self, path: &Path, content_hash: &str) -> bool {
        self.documented
            .get(path)
            .map(|hash| hash == content_hash)
            .unwrap_or(false)
    }

    pub(super) fn defer(&mut self, site: &ExportSite, entry: ExportEntry) {
        debug!(
            "Deferring cross-project export in {}",
            self.program.file_path(site.file).display()
        );
        self.deferred.push(Deferred { site: site.clone(), entry });
    }
}
