//! Classification of a file's exports into direct exports and re-export records.
//!
//! Four shapes are recognized:
//!
//! - local declarations (`export class X`, `export { x as y }`) become direct
//!   exports;
//! - `export * from "./m"` becomes a record with an empty reference list;
//! - `export * as ns from "./m"` and exported namespace imports become a
//!   record carrying the namespace name;
//! - named re-exports (`export { A } from "./m"`, or an import exported again)
//!   are merged into one record per origin file.
//!
//! Any edge that cannot be resolved is dropped on its own.

use tracing::debug;

use super::analyzer::{Analyzer, ExportSite, Phase};
use super::model::AliasedReference;
use super::module_tree::{origin_filename, OriginRef};
use super::program::{is_bare, ExportEntry, FileId, SymbolId, SymbolKind};

impl Analyzer {
    pub(super) fn aggregate(&mut self, site: &ExportSite) {
        for entry in self.program.export_entries(site.file) {
            self.aggregate_entry(site, entry);
        }
    }

    pub(super) fn aggregate_entry(&mut self, site: &ExportSite, entry: ExportEntry) {
        match &entry {
            ExportEntry::Binding { exported, symbol } => {
                let is_local = matches!(
                    self.program.symbol(*symbol).kind,
                    SymbolKind::Declaration { file, .. } if file == site.file
                );
                if is_local {
                    self.export_local(site, exported, *symbol);
                } else {
                    self.export_alias(site, &entry, exported, *symbol);
                }
            }
            ExportEntry::Wildcard { specifier } => self.re_export_all(site, &entry, specifier),
            ExportEntry::Namespace { exported, symbol } => self.export_alias(site, &entry, exported, *symbol),
        }
    }

    fn export_local(&mut self, site: &ExportSite, exported: &str, symbol: SymbolId) {
        match self.reference_for(symbol) {
            Some(reference) => {
                self.trees[site.project].push_export(site.module, &site.key, AliasedReference::new(reference, exported));
            }
            None => debug!("No reference for local export {}", exported),
        }
    }

    /// Imports and re-exports: follow the alias to decide the shape
    fn export_alias(&mut self, site: &ExportSite, entry: &ExportEntry, exported: &str, symbol: SymbolId) {
        let Some(target) = self.program.resolve_alias(symbol) else {
            debug!(
                "Dropping export {} of {}: unresolved",
                exported,
                self.program.file_path(site.file).display()
            );
            return;
        };

        match self.program.symbol(target).kind.clone() {
            SymbolKind::SourceFile(origin) => self.re_export_namespace(site, entry, exported, origin),
            SymbolKind::Declaration { file: origin, .. } => {
                if matches!(entry, ExportEntry::Namespace { .. }) {
                    self.re_export_namespace(site, entry, exported, origin);
                } else if origin == site.file {
                    self.export_local(site, exported, target);
                } else {
                    self.re_export_named(site, entry, exported, target, origin);
                }
            }
            SymbolKind::External { .. } | SymbolKind::Global => self.export_external(site, exported, target),
            SymbolKind::Alias(_) => {}
        }
    }

    fn re_export_all(&mut self, site: &ExportSite, entry: &ExportEntry, specifier: &str) {
        if is_bare(specifier) {
            debug!("export * from package {} has no origin module", specifier);
            return;
        }
        let Some(origin) = self.program.resolve_specifier(site.file, specifier) else {
            debug!(
                "Dropping export * from {} in {}",
                specifier,
                self.program.file_path(site.file).display()
            );
            return;
        };
        if self.should_defer(site, origin) {
            self.defer(site, entry.clone());
            return;
        }
        if self.visit(origin).is_none() {
            return;
        }
        if let Some(origin) = self.origin_ref(site, origin, None) {
            self.trees[site.project].push_re_export(site.module, &site.key, origin, Vec::new());
        }
    }

    fn re_export_namespace(&mut self, site: &ExportSite, entry: &ExportEntry, exported: &str, origin: FileId) {
        if self.should_defer(site, origin) {
            self.defer(site, entry.clone());
            return;
        }
        if self.visit(origin).is_none() {
            return;
        }
        if let Some(origin) = self.origin_ref(site, origin, Some(exported.to_string())) {
            self.trees[site.project].push_re_export(site.module, &site.key, origin, Vec::new());
        }
    }

    fn re_export_named(&mut self, site: &ExportSite, entry: &ExportEntry, exported: &str, target: SymbolId, origin: FileId) {
        if self.should_defer(site, origin) {
            self.defer(site, entry.clone());
            return;
        }
        if self.visit(origin).is_none() {
            debug!("Dropping {}: origin {} was not visited", exported, self.program.file_path(origin).display());
            return;
        }

        // Only references produced by visiting the origin are used
        let reference = self
            .program
            .symbol_key(target)
            .and_then(|key| self.references.get(&key).cloned());
        let Some(reference) = reference else {
            debug!("Dropping {}: no reference memoized for its declaration", exported);
            return;
        };

        if let Some(origin) = self.origin_ref(site, origin, None) {
            self.trees[site.project].push_re_export(
                site.module,
                &site.key,
                origin,
                vec![AliasedReference::new(reference, exported)],
            );
        }
    }

    /// Names from packages have no origin module and are exported directly
    fn export_external(&mut self, site: &ExportSite, exported: &str, target: SymbolId) {
        match self.reference_for(target) {
            Some(reference) => {
                self.trees[site.project].push_export(site.module, &site.key, AliasedReference::new(reference, exported));
            }
            None => debug!("No external resolver claimed {}", exported),
        }
    }

    fn should_defer(&self, site: &ExportSite, origin: FileId) -> bool {
        self.phase == Phase::Local
            && self
                .project_of(origin)
                .map(|project| project != site.project)
                .unwrap_or(false)
    }

    fn origin_ref(&self, site: &ExportSite, origin: FileId, namespace: Option<String>) -> Option<OriginRef> {
        let project = self.project_of(origin)?;
        let tree = &self.trees[project];
        let module = tree.module_of_file(origin)?;

        Some(OriginRef {
            project: (project != site.project).then(|| tree.project().to_string()),
            module: tree.module(module).path.clone(),
            filename: origin_filename(self.program.file_path(origin)),
            namespace,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::ParsingConfig;
    use crate::core::analyzer::{Analysis, Analyzer};
    use crate::core::host::MemoryHost;
    use crate::core::metadata::ProjectSpec;
    use crate::core::model::{ReferenceKind, INDEX_FILE_KEY};
    use crate::core::module_tree::RootMetadata;
    use crate::core::program::Program;
    use crate::core::references::{ReferenceManager, UrlTemplateResolver};
    use crate::core::CodeParser;

    fn host(files: &[(&str, &str)]) -> MemoryHost {
        let mut host = MemoryHost::new();
        for (path, content) in files {
            host.insert(path, *content);
        }
        host
    }

    fn project(name: &str, root: &str) -> ProjectSpec {
        ProjectSpec {
            name: name.to_string(),
            root_dir: PathBuf::from(root),
            entry: PathBuf::from(format!("{}/index.ts", root)),
            metadata: RootMetadata::default(),
        }
    }

    fn analyzer(host: MemoryHost, projects: Vec<ProjectSpec>) -> Analyzer {
        let program = Program::new(Box::new(host), CodeParser::new(&ParsingConfig::default()).unwrap());
        Analyzer::new(program, projects, &[])
    }

    fn analyze(files: &[(&str, &str)]) -> Analysis {
        analyzer(host(files), vec![project("p", "/p")]).run().unwrap()
    }

    fn names(references: &[crate::core::model::AliasedReference]) -> Vec<&str> {
        references.iter().map(|r| r.reference.name.as_str()).collect()
    }

    #[test]
    fn test_wildcard_records_origin_and_visits_it() {
        let analysis = analyze(&[
            ("/p/index.ts", "export * from './b';\n"),
            ("/p/b.ts", "export class X {}\n"),
        ]);
        let root = &analysis.modules[0];

        let records = &root.files[INDEX_FILE_KEY].re_exports;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename.as_deref(), Some("b"));
        assert!(records[0].module.is_empty());
        assert!(records[0].is_wildcard());
        assert!(records[0].same_module);

        assert_eq!(names(&root.files["b"].exports), vec!["X"]);
        assert_eq!(root.files["b"].exports[0].reference.kind, ReferenceKind::Class);
    }

    #[test]
    fn test_mutual_wildcard_cycle_terminates() {
        let analysis = analyze(&[
            ("/p/index.ts", "export * from './a';\n"),
            ("/p/a/index.ts", "export * from '../b';\nexport class A {}\n"),
            ("/p/b/index.ts", "export * from '../a';\nexport class B {}\n"),
        ]);
        let root = &analysis.modules[0];

        let a = root.find(&["a"]).unwrap().file(INDEX_FILE_KEY).unwrap();
        let b = root.find(&["b"]).unwrap().file(INDEX_FILE_KEY).unwrap();
        assert_eq!(a.re_exports.len(), 1);
        assert_eq!(a.re_exports[0].module, vec!["b".to_string()]);
        assert_eq!(a.re_exports[0].filename, None);
        assert!(!a.re_exports[0].same_module);
        assert_eq!(b.re_exports.len(), 1);
        assert_eq!(b.re_exports[0].module, vec!["a".to_string()]);
        assert_eq!(names(&a.exports), vec!["A"]);
        assert_eq!(names(&b.exports), vec!["B"]);
        assert_eq!(analysis.files_visited, 3);
    }

    #[test]
    fn test_named_re_exports_merge_per_origin() {
        let analysis = analyze(&[
            ("/p/index.ts", "export { A } from './m';\nexport { B } from './m';\nexport { A } from './m';\n"),
            ("/p/m.ts", "export class A {}\nexport interface B {}\n"),
        ]);
        let records = &analysis.modules[0].files[INDEX_FILE_KEY].re_exports;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename.as_deref(), Some("m"));
        assert_eq!(names(&records[0].references), vec!["A", "B"]);
    }

    #[test]
    fn test_namespace_re_export() {
        let analysis = analyze(&[
            ("/p/index.ts", "export * as NS from './other';\n"),
            ("/p/other.ts", "export const value = 1;\n"),
        ]);
        let root = &analysis.modules[0];
        let records = &root.files[INDEX_FILE_KEY].re_exports;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].namespace.as_deref(), Some("NS"));
        assert!(records[0].references.is_empty());
        assert_eq!(records[0].filename.as_deref(), Some("other"));
        assert_eq!(names(&root.files["other"].exports), vec!["value"]);
    }

    #[test]
    fn test_exported_namespace_import() {
        let analysis = analyze(&[
            ("/p/index.ts", "import * as utils from './utils';\nexport { utils };\n"),
            ("/p/utils.ts", "export function helper() {}\n"),
        ]);
        let records = &analysis.modules[0].files[INDEX_FILE_KEY].re_exports;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].namespace.as_deref(), Some("utils"));
        assert_eq!(records[0].filename.as_deref(), Some("utils"));
    }

    #[test]
    fn test_alias_keeps_origin_name_and_kind() {
        let analysis = analyze(&[
            ("/p/index.ts", "export { A as C } from './m';\n"),
            ("/p/m.ts", "export class A {}\n"),
        ]);
        let reference = &analysis.modules[0].files[INDEX_FILE_KEY].re_exports[0].references[0];

        assert_eq!(reference.alias.as_deref(), Some("C"));
        assert_eq!(reference.reference.name, "A");
        assert_eq!(reference.reference.kind, ReferenceKind::Class);
    }

    #[test]
    fn test_import_then_export_is_a_named_re_export() {
        let analysis = analyze(&[
            ("/p/index.ts", "import { Thing } from './lib/thing';\nexport { Thing };\nexport { Thing as Other };\n"),
            ("/p/lib/thing.ts", "export type Thing = string;\n"),
        ]);
        let root = &analysis.modules[0];
        let records = &root.files[INDEX_FILE_KEY].re_exports;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].module, vec!["lib".to_string()]);
        assert!(!records[0].same_module);
        let aliases: Vec<_> = records[0].references.iter().map(|r| r.alias.as_deref()).collect();
        assert_eq!(aliases, vec![None, Some("Other")]);
        assert_eq!(root.find(&["lib"]).unwrap().declarations.type_aliases[0].name, "Thing");
    }

    #[test]
    fn test_origin_filename_rule() {
        let analysis = analyze(&[
            ("/p/index.ts", "export { a } from './pkg';\nexport { b } from './pkg/utils';\n"),
            ("/p/pkg/index.ts", "export const a = 1;\n"),
            ("/p/pkg/utils.ts", "export const b = 2;\n"),
        ]);
        let records = &analysis.modules[0].files[INDEX_FILE_KEY].re_exports;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].filename, None);
        assert_eq!(records[1].filename.as_deref(), Some("utils"));
        assert_eq!(records[0].module, records[1].module);
    }

    #[test]
    fn test_unresolved_edges_are_dropped_individually() {
        let analysis = analyze(&[
            ("/p/index.ts", "export * from './missing';\nexport { Nope } from './m';\nexport { A } from './m';\nexport class Local {}\n"),
            ("/p/m.ts", "export class A {}\n"),
        ]);
        let file = &analysis.modules[0].files[INDEX_FILE_KEY];

        assert_eq!(file.re_exports.len(), 1);
        assert_eq!(names(&file.re_exports[0].references), vec!["A"]);
        assert_eq!(names(&file.exports), vec!["Local"]);
    }

    #[test]
    fn test_import_cycle_drops_the_name() {
        let analysis = analyze(&[
            ("/p/index.ts", "export * from './a';\n"),
            ("/p/a.ts", "export { x } from './b';\n"),
            ("/p/b.ts", "export { x } from './a';\n"),
        ]);
        let root = &analysis.modules[0];

        assert!(root.files["a"].re_exports.is_empty());
        assert!(root.files["a"].exports.is_empty());
        assert_eq!(root.files[INDEX_FILE_KEY].re_exports.len(), 1);
    }

    #[test]
    fn test_local_and_default_exports() {
        let analysis = analyze(&[(
            "/p/index.ts",
            "class Impl {}\nexport { Impl as Public };\nexport default Impl;\nexport enum Mode { On }\n",
        )]);
        let exports = &analysis.modules[0].files[INDEX_FILE_KEY].exports;

        let shown: Vec<_> = exports.iter().map(|e| (e.reference.name.as_str(), e.exported_name())).collect();
        assert_eq!(shown, vec![("Impl", "Public"), ("Impl", "default"), ("Mode", "Mode")]);
    }

    #[test]
    fn test_external_re_exports_use_named_resolver_first() {
        let mut references = ReferenceManager::new();
        references.register_fallback(Box::new(UrlTemplateResolver::new("https://fallback.dev/{name}")));
        references.register_named(
            "react",
            Box::new(UrlTemplateResolver::new("https://react.dev/reference/{specifier}/{name}")),
            false,
        );

        let analysis = analyzer(
            host(&[(
                "/p/index.ts",
                "import { useState } from 'react/something';\nexport { useState as useLocal };\nexport { ref } from 'vue';\n",
            )]),
            vec![project("p", "/p")],
        )
        .with_references(references)
        .run()
        .unwrap();
        let file = &analysis.modules[0].files[INDEX_FILE_KEY];

        assert!(file.re_exports.is_empty());
        assert_eq!(file.exports.len(), 2);
        assert_eq!(
            file.exports[0].reference.link.as_deref(),
            Some("https://react.dev/reference/react/something/useState")
        );
        assert_eq!(file.exports[0].alias.as_deref(), Some("useLocal"));
        assert_eq!(file.exports[0].reference.kind, ReferenceKind::External);
        assert_eq!(file.exports[1].reference.link.as_deref(), Some("https://fallback.dev/ref"));
    }

    #[test]
    fn test_cross_project_exports_resolve_after_every_project() {
        let files = [
            ("/ws/core/index.ts", "export const version = 1;\n"),
            ("/ws/core/widget.ts", "export class Widget {}\n"),
            ("/ws/core/util.ts", "export function util() {}\n"),
            ("/ws/app/index.ts", "export { Widget } from '../core/widget';\nexport * from '../core/util';\n"),
        ];
        let analysis = analyzer(host(&files), vec![project("app", "/ws/app"), project("core", "/ws/core")])
            .run()
            .unwrap();

        let app = &analysis.modules[0].files[INDEX_FILE_KEY];
        assert_eq!(app.re_exports.len(), 2);
        let named = &app.re_exports[0];
        assert_eq!(named.project.as_deref(), Some("core"));
        assert_eq!(named.filename.as_deref(), Some("widget"));
        assert!(!named.same_module);
        assert_eq!(named.references[0].reference.project.as_deref(), Some("core"));
        assert!(app.re_exports[1].is_wildcard());

        let core = &analysis.modules[1];
        assert_eq!(names(&core.files["widget"].exports), vec!["Widget"]);
        assert_eq!(names(&core.files["util"].exports), vec!["util"]);
    }
}
