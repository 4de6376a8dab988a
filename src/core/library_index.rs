//! Kind classification of names declared by external packages.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path};

use tracing::debug;

use super::model::ReferenceKind;
use super::program::{FileId, Program};
use super::{DeclarationKind, DefaultExport, Statement};

/// Name sets of one package, grown as its declaration files are observed
#[derive(Debug, Default, Clone)]
pub struct PackageNames {
    pub classes: HashSet<String>,
    pub interfaces: HashSet<String>,
    pub enums: HashSet<String>,
    pub types: HashSet<String>,
    pub functions: HashSet<String>,
    pub constants: HashSet<String>,
    pub namespaces: HashSet<String>,
}

impl PackageNames {
    fn insert(&mut self, name: &str, kind: DeclarationKind) {
        let set = match kind {
            DeclarationKind::Class => &mut self.classes,
            DeclarationKind::Interface => &mut self.interfaces,
            DeclarationKind::Enum => &mut self.enums,
            DeclarationKind::TypeAlias => &mut self.types,
            DeclarationKind::Function => &mut self.functions,
            DeclarationKind::Variable | DeclarationKind::Constant => &mut self.constants,
            DeclarationKind::Namespace => &mut self.namespaces,
        };
        set.insert(name.to_string());
    }

    fn classify(&self, name: &str) -> ReferenceKind {
        if self.classes.contains(name) {
            ReferenceKind::Class
        } else if self.interfaces.contains(name) {
            ReferenceKind::Interface
        } else if self.enums.contains(name) {
            ReferenceKind::Enum
        } else if self.types.contains(name) {
            ReferenceKind::TypeAlias
        } else if self.functions.contains(name) {
            ReferenceKind::Function
        } else if self.constants.contains(name) {
            ReferenceKind::Constant
        } else if self.namespaces.contains(name) {
            ReferenceKind::NamespaceOrModule
        } else {
            ReferenceKind::External
        }
    }
}

#[derive(Debug, Default)]
pub struct LibraryIndex {
    packages: HashSet<String>,
    names: HashMap<String, PackageNames>,
    observed: HashSet<FileId>,
}

impl LibraryIndex {
    /// Index only the given packages
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Scan a declaration file of a configured package, once.
    ///
    /// Relative re-exports inside the package are followed so that barrel
    /// files classify what they forward.
    pub fn observe(&mut self, program: &mut Program, file: FileId) {
        let Some(package) = package_of_path(program.file_path(file)) else {
            return;
        };
        if !self.packages.contains(&package) || !self.observed.insert(file) {
            return;
        }
        debug!("Indexing {} for {}", program.file_path(file).display(), package);

        let mut forwarded = Vec::new();
        {
            let parsed = program.file(file);
            let names = self.names.entry(package.clone()).or_default();
            let locals: HashMap<&str, DeclarationKind> = parsed
                .statements
                .iter()
                .filter_map(|statement| match statement {
                    Statement::Declaration(decl) => decl.name.as_deref().map(|name| (name, decl.kind)),
                    _ => None,
                })
                .collect();

            for statement in &parsed.statements {
                match statement {
                    Statement::Declaration(decl) => {
                        if decl.default_export {
                            names.insert("default", decl.kind);
                        }
                        if decl.exported || decl.ambient {
                            if let Some(name) = &decl.name {
                                names.insert(name, decl.kind);
                            }
                        }
                    }
                    Statement::ExportNamed(named) => match &named.specifier {
                        None => {
                            for binding in &named.names {
                                if let Some(kind) = locals.get(binding.local.as_str()) {
                                    names.insert(&binding.exported, *kind);
                                }
                            }
                        }
                        Some(specifier) => forwarded.push(specifier.clone()),
                    },
                    Statement::ExportNamespace { name, .. } => {
                        names.insert(name, DeclarationKind::Namespace);
                    }
                    Statement::ExportAll { specifier } => forwarded.push(specifier.clone()),
                    Statement::ExportDefault(DefaultExport::Identifier(local)) => {
                        if let Some(kind) = locals.get(local.as_str()) {
                            names.insert("default", *kind);
                        }
                    }
                    Statement::ExportDefault(DefaultExport::Expression) => {
                        names.insert("default", DeclarationKind::Constant);
                    }
                    Statement::Import(_) => {}
                }
            }
        }

        for specifier in forwarded {
            let resolved = program
                .resolve_specifier(file, &specifier)
                .or_else(|| program.resolve_specifier(file, &format!("{}.d", specifier)));
            if let Some(origin) = resolved {
                self.observe(program, origin);
            }
        }
    }

    /// Kind of `name` in `package`; External when unknown
    pub fn classify(&self, package: &str, name: &str) -> ReferenceKind {
        self.names
            .get(package)
            .map(|names| names.classify(name))
            .unwrap_or(ReferenceKind::External)
    }

    pub fn package(&self, package: &str) -> Option<&PackageNames> {
        self.names.get(package)
    }
}

/// Package a path belongs to, from its last `node_modules` segment
pub fn package_of_path(path: &Path) -> Option<String> {
    let segments: Vec<String> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    let position = segments.iter().rposition(|segment| segment == "node_modules")?;
    let first = segments.get(position + 1)?;
    if first.starts_with('@') {
        let second = segments.get(position + 2)?;
        Some(format!("{}/{}", first, second))
    } else {
        Some(first.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParsingConfig;
    use crate::core::host::MemoryHost;
    use crate::core::CodeParser;

    fn program(host: MemoryHost) -> Program {
        Program::new(Box::new(host), CodeParser::new(&ParsingConfig::default()).unwrap())
    }

    #[test]
    fn test_package_of_path() {
        assert_eq!(package_of_path(Path::new("/p/node_modules/react/index.d.ts")).as_deref(), Some("react"));
        assert_eq!(
            package_of_path(Path::new("/p/node_modules/a/node_modules/@s/b/x.d.ts")).as_deref(),
            Some("@s/b")
        );
        assert_eq!(package_of_path(Path::new("/p/src/a.ts")), None);
    }

    #[test]
    fn test_observe_classifies_barrel() {
        let host = MemoryHost::new()
            .with_file(
                "/p/node_modules/lib/index.d.ts",
                r#"
export * from "./widgets";
export declare function create(): Widget;
export declare const VERSION: string;
declare enum Mode { A }
export { Mode };
export default class {}
"#,
            )
            .with_file(
                "/p/node_modules/lib/widgets.d.ts",
                "export declare class Widget {}\nexport interface Props {}\nexport type Size = number;\n",
            );
        let mut program = program(host);
        let index_file = program.load(Path::new("/p/node_modules/lib/index.d.ts")).unwrap();

        let mut index = LibraryIndex::new(["lib"]);
        index.observe(&mut program, index_file);

        assert_eq!(index.classify("lib", "Widget"), ReferenceKind::Class);
        assert_eq!(index.classify("lib", "Props"), ReferenceKind::Interface);
        assert_eq!(index.classify("lib", "Size"), ReferenceKind::TypeAlias);
        assert_eq!(index.classify("lib", "create"), ReferenceKind::Function);
        assert_eq!(index.classify("lib", "VERSION"), ReferenceKind::Constant);
        assert_eq!(index.classify("lib", "Mode"), ReferenceKind::Enum);
        assert_eq!(index.classify("lib", "default"), ReferenceKind::Class);
        assert_eq!(index.classify("lib", "missing"), ReferenceKind::External);
        assert_eq!(index.classify("other", "Widget"), ReferenceKind::External);
    }

    #[test]
    fn test_observe_ignores_unconfigured_packages() {
        let host = MemoryHost::new().with_file("/p/node_modules/other/index.d.ts", "export declare class A {}\n");
        let mut program = program(host);
        let file = program.load(Path::new("/p/node_modules/other/index.d.ts")).unwrap();

        let mut index = LibraryIndex::new(["lib"]);
        index.observe(&mut program, file);
        assert!(index.package("other").is_none());
    }
}
