//! Per-project module hierarchy keyed by directory path.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use super::model::{
    AliasedReference, Declaration, Declarations, ExportedElement, FileExports, Module, INDEX_FILE_KEY,
};
use super::program::{file_stem, FileId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(usize);

/// Where a re-export record points
///
/// The namespace is part of the key. A record carries at most one
/// namespace, so `export * as A` and `export * as B` of the same file (or a
/// plain `export *` next to them) stay separate records for one
/// (module, filename) pair. Plain records still merge per pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OriginRef {
    /// Set for modules of another project
    pub project: Option<String>,
    pub module: Vec<String>,
    pub filename: Option<String>,
    pub namespace: Option<String>,
}

impl OriginRef {
    fn of(record: &ExportedElement) -> Self {
        Self {
            project: record.project.clone(),
            module: record.module.clone(),
            filename: record.filename.clone(),
            namespace: record.namespace.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct FileRecord {
    exports: Vec<AliasedReference>,
    re_exports: Vec<ExportedElement>,
    lookup: HashMap<OriginRef, usize>,
    wildcards: HashSet<usize>,
}

impl FileRecord {
    fn push_export(&mut self, reference: AliasedReference) {
        if !self.exports.contains(&reference) {
            self.exports.push(reference);
        }
    }

    /// One record per origin; an empty list means everything and absorbs names
    fn push_re_export(&mut self, origin: OriginRef, same_module: bool, references: Vec<AliasedReference>) {
        if let Some(&index) = self.lookup.get(&origin) {
            if references.is_empty() {
                self.re_exports[index].references.clear();
                self.wildcards.insert(index);
            } else if !self.wildcards.contains(&index) {
                let record = &mut self.re_exports[index];
                for reference in references {
                    if !record.references.contains(&reference) {
                        record.references.push(reference);
                    }
                }
            }
            return;
        }

        let index = self.re_exports.len();
        if references.is_empty() {
            self.wildcards.insert(index);
        }
        self.re_exports.push(ExportedElement {
            module: origin.module.clone(),
            project: origin.project.clone(),
            namespace: origin.namespace.clone(),
            filename: origin.filename.clone(),
            references,
            same_module,
        });
        self.lookup.insert(origin, index);
    }
}

#[derive(Debug)]
pub struct ModuleNode {
    pub name: String,
    pub path: Vec<String>,
    pub parent: Option<ModuleId>,
    children: BTreeMap<String, ModuleId>,
    docs: Option<String>,
    declarations: Declarations,
    files: BTreeMap<String, FileRecord>,
}

/// Project metadata attached to the root module
#[derive(Debug, Clone, Default)]
pub struct RootMetadata {
    pub version: Option<String>,
    pub repository: Option<String>,
    pub readme: Option<String>,
}

/// Module tree of one project plus its visited-file set
#[derive(Debug)]
pub struct ModuleTree {
    project: String,
    root_dir: PathBuf,
    passthrough: HashSet<String>,
    metadata: RootMetadata,
    modules: Vec<ModuleNode>,
    by_path: HashMap<Vec<String>, ModuleId>,
    by_file: HashMap<FileId, ModuleId>,
    visited: HashSet<FileId>,
}

impl ModuleTree {
    pub fn new(project: &str, root_dir: &Path, passthrough: &[String]) -> Self {
        let root = ModuleNode {
            name: project.to_string(),
            path: Vec::new(),
            parent: None,
            children: BTreeMap::new(),
            docs: None,
            declarations: Declarations::default(),
            files: BTreeMap::new(),
        };
        let mut by_path = HashMap::new();
        by_path.insert(Vec::new(), ModuleId(0));

        Self {
            project: project.to_string(),
            root_dir: root_dir.to_path_buf(),
            passthrough: passthrough.iter().cloned().collect(),
            metadata: RootMetadata::default(),
            modules: vec![root],
            by_path,
            by_file: HashMap::new(),
            visited: HashSet::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: RootMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn root(&self) -> ModuleId {
        ModuleId(0)
    }

    /// Whether a source file belongs to this project
    pub fn contains(&self, file: &Path) -> bool {
        let Ok(relative) = file.strip_prefix(&self.root_dir) else {
            return false;
        };
        !relative
            .components()
            .any(|component| component.as_os_str() == "node_modules")
    }

    /// Module path of a file's directory, with passthrough folders removed
    pub fn module_path_for(&self, file: &Path) -> Option<Vec<String>> {
        if !self.contains(file) {
            return None;
        }
        let relative = file.strip_prefix(&self.root_dir).ok()?;
        let directory = relative.parent().unwrap_or_else(|| Path::new(""));
        Some(
            directory
                .components()
                .filter_map(|component| match component {
                    Component::Normal(segment) => Some(segment.to_string_lossy().to_string()),
                    _ => None,
                })
                .filter(|segment| !self.passthrough.contains(segment))
                .collect(),
        )
    }

    /// Leaf module for a file, creating missing ancestors
    pub fn get_or_create_module(&mut self, file: &Path) -> Option<ModuleId> {
        let path = self.module_path_for(file)?;
        let mut current = self.root();

        for depth in 0..path.len() {
            let prefix = &path[..=depth];
            current = match self.by_path.get(prefix) {
                Some(id) => *id,
                None => {
                    let id = ModuleId(self.modules.len());
                    let name = path[depth].clone();
                    self.modules.push(ModuleNode {
                        name: name.clone(),
                        path: prefix.to_vec(),
                        parent: Some(current),
                        children: BTreeMap::new(),
                        docs: None,
                        declarations: Declarations::default(),
                        files: BTreeMap::new(),
                    });
                    self.modules[current.0].children.insert(name, id);
                    self.by_path.insert(prefix.to_vec(), id);
                    id
                }
            };
        }

        Some(current)
    }

    /// Returns false when the file was already visited
    pub fn mark_visited(&mut self, file: FileId) -> bool {
        self.visited.insert(file)
    }

    pub fn visited_files(&self) -> impl Iterator<Item = FileId> + '_ {
        self.visited.iter().copied()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Attach a file to its module and create its export record
    pub fn attach_file(&mut self, file: FileId, module: ModuleId, key: &str) {
        self.by_file.insert(file, module);
        self.modules[module.0].files.entry(key.to_string()).or_default();
    }

    pub fn module_of_file(&self, file: FileId) -> Option<ModuleId> {
        self.by_file.get(&file).copied()
    }

    pub fn module_by_path(&self, path: &[String]) -> Option<ModuleId> {
        self.by_path.get(path).copied()
    }

    pub fn module(&self, id: ModuleId) -> &ModuleNode {
        &self.modules[id.0]
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Module documentation comes from the header comment of its index file
    pub fn set_docs(&mut self, module: ModuleId, docs: String) {
        self.modules[module.0].docs.get_or_insert(docs);
    }

    pub fn push_declaration(&mut self, module: ModuleId, declaration: Declaration) {
        self.modules[module.0].declarations.push(declaration);
    }

    pub fn push_export(&mut self, module: ModuleId, key: &str, reference: AliasedReference) {
        self.record(module, key).push_export(reference);
    }

    pub fn push_re_export(&mut self, module: ModuleId, key: &str, origin: OriginRef, references: Vec<AliasedReference>) {
        let same_module = origin.project.is_none() && origin.module == self.modules[module.0].path;
        self.record(module, key).push_re_export(origin, same_module, references);
    }

    fn record(&mut self, module: ModuleId, key: &str) -> &mut FileRecord {
        self.modules[module.0].files.entry(key.to_string()).or_default()
    }

    /// Structural checks the traversal relies on but never enforces
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for (index, node) in self.modules.iter().enumerate() {
            if self.by_path.get(&node.path) != Some(&ModuleId(index)) {
                violations.push(format!("module {:?} is not registered under its path", node.path));
            }
            if let Some(parent) = node.parent {
                let parent_path = &self.modules[parent.0].path;
                if node.path.len() != parent_path.len() + 1 || !node.path.starts_with(parent_path) {
                    violations.push(format!("module {:?} does not extend its parent {:?}", node.path, parent_path));
                }
            }
            for (name, child) in &node.children {
                if &self.modules[child.0].name != name {
                    violations.push(format!("child {} of {:?} is named {}", name, node.path, self.modules[child.0].name));
                }
            }
            for (key, record) in &node.files {
                let origins: HashSet<OriginRef> = record.re_exports.iter().map(OriginRef::of).collect();
                if origins.len() != record.re_exports.len() {
                    violations.push(format!("file {} in {:?} has duplicate re-export records", key, node.path));
                }
            }
        }

        violations
    }

    /// Build the serializable tree
    pub fn to_module(&self) -> Module {
        let mut module = self.build_module(self.root());
        module.version = self.metadata.version.clone();
        module.repository = self.metadata.repository.clone();
        module.readme = self.metadata.readme.clone();
        module
    }

    fn build_module(&self, id: ModuleId) -> Module {
        let node = &self.modules[id.0];
        Module {
            name: node.name.clone(),
            path: node.path.clone(),
            children: node
                .children
                .iter()
                .map(|(name, child)| (name.clone(), self.build_module(*child)))
                .collect(),
            docs: node.docs.clone(),
            declarations: node.declarations.clone(),
            files: node
                .files
                .iter()
                .map(|(key, record)| {
                    (
                        key.clone(),
                        FileExports {
                            exports: record.exports.clone(),
                            re_exports: record.re_exports.clone(),
                        },
                    )
                })
                .collect(),
            version: None,
            repository: None,
            readme: None,
        }
    }
}

/// Key of a file inside its module; index files share a sentinel key
pub fn file_key(path: &Path) -> String {
    let stem = file_stem(path);
    if stem == "index" {
        INDEX_FILE_KEY.to_string()
    } else {
        stem
    }
}

/// File name recorded on re-exports; `None` for index files
pub fn origin_filename(path: &Path) -> Option<String> {
    let stem = file_stem(path);
    (stem != "index").then_some(stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{ReferenceKind, ReferenceType};

    fn reference(name: &str) -> AliasedReference {
        AliasedReference::new(
            ReferenceType::declared(name, ReferenceKind::Class, "p", vec!["m".into()], "m"),
            name,
        )
    }

    fn origin(module: &[&str], filename: Option<&str>) -> OriginRef {
        OriginRef {
            project: None,
            module: module.iter().map(|s| s.to_string()).collect(),
            filename: filename.map(str::to_string),
            namespace: None,
        }
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut tree = ModuleTree::new("p", Path::new("/p"), &[]);
        let first = tree.get_or_create_module(Path::new("/p/a/b/x.ts")).unwrap();
        let second = tree.get_or_create_module(Path::new("/p/a/b/y.ts")).unwrap();

        assert_eq!(first, second);
        assert_eq!(tree.module(first).path, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(tree.module_count(), 3);
        assert!(tree.module_by_path(&["a".to_string()]).is_some());
        assert!(tree.check_invariants().is_empty());
    }

    #[test]
    fn test_passthrough_and_outside_files() {
        let mut tree = ModuleTree::new("p", Path::new("/p"), &["src".to_string()]);

        let root_file = tree.get_or_create_module(Path::new("/p/src/index.ts")).unwrap();
        assert_eq!(root_file, tree.root());

        let nested = tree.get_or_create_module(Path::new("/p/src/utils/strings.ts")).unwrap();
        assert_eq!(tree.module(nested).path, vec!["utils".to_string()]);

        assert!(tree.get_or_create_module(Path::new("/other/x.ts")).is_none());
        assert!(tree.get_or_create_module(Path::new("/p/node_modules/lib/index.d.ts")).is_none());
    }

    #[test]
    fn test_file_keys() {
        assert_eq!(file_key(Path::new("/p/index.ts")), INDEX_FILE_KEY);
        assert_eq!(file_key(Path::new("/p/utils.ts")), "utils");
        assert_eq!(origin_filename(Path::new("/p/index.ts")), None);
        assert_eq!(origin_filename(Path::new("/p/utils.ts")).as_deref(), Some("utils"));
    }

    #[test]
    fn test_re_exports_merge_per_origin() {
        let mut tree = ModuleTree::new("p", Path::new("/p"), &[]);
        let root = tree.root();

        tree.push_re_export(root, INDEX_FILE_KEY, origin(&["m"], None), vec![reference("A")]);
        tree.push_re_export(root, INDEX_FILE_KEY, origin(&["m"], None), vec![reference("B"), reference("A")]);
        tree.push_re_export(root, INDEX_FILE_KEY, origin(&["m"], Some("other")), vec![reference("C")]);

        let module = tree.to_module();
        let records = &module.files[INDEX_FILE_KEY].re_exports;
        assert_eq!(records.len(), 2);
        let names: Vec<_> = records[0].references.iter().map(|r| r.reference.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(!records[0].same_module);
        assert!(tree.check_invariants().is_empty());
    }

    #[test]
    fn test_wildcard_absorbs_named() {
        let mut tree = ModuleTree::new("p", Path::new("/p"), &[]);
        let root = tree.root();

        tree.push_re_export(root, "a", origin(&[], Some("b")), vec![reference("A")]);
        tree.push_re_export(root, "a", origin(&[], Some("b")), vec![]);
        tree.push_re_export(root, "a", origin(&[], Some("b")), vec![reference("B")]);

        let module = tree.to_module();
        let records = &module.files["a"].re_exports;
        assert_eq!(records.len(), 1);
        assert!(records[0].is_wildcard());
        assert!(records[0].same_module);
    }

    #[test]
    fn test_namespace_records_stay_separate() {
        let mut tree = ModuleTree::new("p", Path::new("/p"), &[]);
        let root = tree.root();
        let named = |namespace: &str| OriginRef {
            namespace: Some(namespace.to_string()),
            ..origin(&[], Some("m"))
        };

        tree.push_re_export(root, INDEX_FILE_KEY, origin(&[], Some("m")), vec![]);
        tree.push_re_export(root, INDEX_FILE_KEY, named("NS"), vec![]);
        tree.push_re_export(root, INDEX_FILE_KEY, named("NS2"), vec![]);
        tree.push_re_export(root, INDEX_FILE_KEY, named("NS"), vec![]);

        let module = tree.to_module();
        let namespaces: Vec<_> = module.files[INDEX_FILE_KEY]
            .re_exports
            .iter()
            .map(|record| record.namespace.as_deref())
            .collect();
        assert_eq!(namespaces, vec![None, Some("NS"), Some("NS2")]);
        assert!(tree.check_invariants().is_empty());
    }

    #[test]
    fn test_invariants_catch_duplicate_records() {
        let mut tree = ModuleTree::new("p", Path::new("/p"), &[]);
        let root = tree.root();
        tree.push_re_export(root, INDEX_FILE_KEY, origin(&["m"], None), vec![reference("A")]);
        assert!(tree.check_invariants().is_empty());

        let record = tree.record(root, INDEX_FILE_KEY);
        let duplicate = record.re_exports[0].clone();
        record.re_exports.push(duplicate);

        let violations = tree.check_invariants();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("duplicate re-export records"));
    }
}
