//! File visits: module placement, declaration registration, then exports.

use std::collections::HashSet;

use tracing::{debug, trace};

use super::analyzer::{Analyzer, ExportSite};
use super::model::{Declaration, INDEX_FILE_KEY};
use super::module_tree::{file_key, ModuleId};
use super::program::FileId;
use super::{DeclarationNode, Statement};

impl Analyzer {
    /// Visit a file at most once and return the project and module it lives in.
    ///
    /// The file is marked visited before any export is followed; a re-export
    /// cycle coming back here only gets the module back.
    pub(super) fn visit(&mut self, file: FileId) -> Option<(usize, ModuleId)> {
        let Some(project) = self.project_of(file) else {
            debug!("{} is outside every project", self.program.file_path(file).display());
            return None;
        };

        let tree = &mut self.trees[project];
        if !tree.mark_visited(file) {
            return tree.module_of_file(file).map(|module| (project, module));
        }

        let path = self.program.file_path(file).to_path_buf();
        let module = tree.get_or_create_module(&path)?;
        let key = file_key(&path);
        tree.attach_file(file, module, &key);
        if key == INDEX_FILE_KEY {
            if let Some(docs) = self.program.file(file).file_docs.clone() {
                tree.set_docs(module, docs);
            }
        }
        trace!("Visiting {} as {:?}/{}", path.display(), tree.module(module).path, key);

        self.register_declarations(file, module, &key);

        let site = ExportSite { file, project, module, key };
        self.aggregate(&site);

        Some((project, module))
    }

    /// Memoize every top-level declaration and summarize the exported ones
    fn register_declarations(&mut self, file: FileId, module: ModuleId, key: &str) {
        let parsed = self.program.file(file);
        let summarize = !self.is_documented(&parsed.path, &parsed.content_hash);
        let declarations: Vec<(usize, DeclarationNode)> = parsed
            .statements
            .iter()
            .enumerate()
            .filter_map(|(index, statement)| match statement {
                Statement::Declaration(decl) => Some((index, decl.clone())),
                _ => None,
            })
            .collect();

        let mut summarized = HashSet::new();
        for (index, decl) in declarations {
            let Some(symbol) = self.program.declaration_symbol(file, index) else {
                continue;
            };
            let Some(key_of_symbol) = self.program.symbol_key(symbol) else {
                continue;
            };
            let Some(reference) = self.declared_reference(file, index) else {
                continue;
            };
            self.references.set(key_of_symbol, reference);

            let Some(exported) = decl.exported_name() else {
                continue;
            };
            // Overloads share one summary
            if !summarize || !summarized.insert(exported.to_string()) {
                continue;
            }
            let summary = self.summarize(file, key, exported, &decl);
            let project = self.project_of(file);
            if let Some(project) = project {
                self.trees[project].push_declaration(module, summary);
            }
        }
    }

    fn summarize(&mut self, file: FileId, key: &str, exported: &str, decl: &DeclarationNode) -> Declaration {
        let heritage = decl
            .heritage
            .iter()
            .map(|type_ref| self.resolve_type_ref(file, &decl.type_parameters, type_ref))
            .collect();

        Declaration {
            name: decl.name.clone().unwrap_or_else(|| exported.to_string()),
            kind: decl.kind,
            file: key.to_string(),
            line: decl.line_range.0,
            docs: decl.docs.clone(),
            signature: decl.signature.clone(),
            members: decl.members.clone(),
            heritage,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::ParsingConfig;
    use crate::core::analyzer::Analyzer;
    use crate::core::host::MemoryHost;
    use crate::core::metadata::ProjectSpec;
    use crate::core::model::INDEX_FILE_KEY;
    use crate::core::module_tree::RootMetadata;
    use crate::core::program::Program;
    use crate::core::{CodeParser, DeclarationKind};

    fn analyzer(host: MemoryHost, passthrough: &[&str]) -> Analyzer {
        let program = Program::new(Box::new(host), CodeParser::new(&ParsingConfig::default()).unwrap());
        let project = ProjectSpec {
            name: "app".to_string(),
            root_dir: PathBuf::from("/app"),
            entry: PathBuf::from("/app/src/index.ts"),
            metadata: RootMetadata::default(),
        };
        let passthrough: Vec<String> = passthrough.iter().map(|s| s.to_string()).collect();
        Analyzer::new(program, vec![project], &passthrough)
    }

    #[test]
    fn test_passthrough_folders_are_elided() {
        let host = MemoryHost::new()
            .with_file("/app/src/index.ts", "/**\n * UI kit.\n */\nexport * from './ui/button';\n")
            .with_file("/app/src/ui/button.ts", "/** A button */\nexport class Button {}\n");

        let analysis = analyzer(host, &["src"]).run().unwrap();
        let root = &analysis.modules[0];

        assert_eq!(root.name, "app");
        assert!(root.files.contains_key(INDEX_FILE_KEY));
        let ui = root.find(&["ui"]).unwrap();
        assert_eq!(ui.path, vec!["ui".to_string()]);
        assert_eq!(ui.declarations.classes[0].name, "Button");
        assert_eq!(ui.declarations.classes[0].file, "button");
        assert_eq!(ui.declarations.classes[0].docs.as_deref(), Some("A button"));
        assert_eq!(root.docs.as_deref(), Some("UI kit."));
        assert!(root.children.get("src").is_none());
    }

    #[test]
    fn test_without_passthrough_src_is_a_module() {
        let host = MemoryHost::new().with_file("/app/src/index.ts", "export const answer = 42;\n");

        let analysis = analyzer(host, &[]).run().unwrap();
        let src = analysis.modules[0].find(&["src"]).unwrap();
        assert_eq!(src.declarations.constants[0].name, "answer");
        assert_eq!(src.declarations.constants[0].kind, DeclarationKind::Constant);
    }

    #[test]
    fn test_private_declarations_are_not_summarized() {
        let host = MemoryHost::new().with_file(
            "/app/src/index.ts",
            "class Hidden {}\nexport function f(a: string): void;\nexport function f(a: any) {}\nexport default class {}\n",
        );

        let analysis = analyzer(host, &["src"]).run().unwrap();
        let root = &analysis.modules[0];
        assert_eq!(root.declarations.functions.len(), 1);
        assert_eq!(root.declarations.classes.len(), 1);
        assert_eq!(root.declarations.classes[0].name, "default");
        // Hidden is memoized even though nothing documents it
        assert_eq!(analysis.references.len(), 4);
    }
}
