use std::path::Path;
use tree_sitter::{Language, Node, Parser};

use crate::error::{ExportMapError, Result};
use super::super::{
    DeclarationKind, DeclarationNode, DefaultExport, ExportBinding, ExportNamedNode,
    ImportBinding, ImportNode, MemberKind, MemberNode, Statement, TypeRef,
};
use super::LanguageParser;

/// Grammar flavours sharing one lowering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    TypeScript,
    Tsx,
    JavaScript,
}

impl Dialect {
    fn language(self) -> Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Dialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ExportContext {
    exported: bool,
    default_export: bool,
    ambient: bool,
}

/// TypeScript/JavaScript parser using Tree-sitter
pub struct TypeScriptParser {
    parser: Parser,
    dialect: Dialect,
}

impl TypeScriptParser {
    pub fn new(dialect: Dialect) -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(&dialect.language())
            .map_err(|e| ExportMapError::Parser(format!("Failed to set {:?} language: {}", dialect, e)))?;

        Ok(Self { parser, dialect })
    }
}

impl LanguageParser for TypeScriptParser {
    fn parse(&mut self, content: &str, file_path: &Path) -> Result<Vec<Statement>> {
        let tree = self.parser.parse(content, None)
            .ok_or_else(|| ExportMapError::Parser(format!("Failed to parse {}", file_path.display())))?;

        let root_node = tree.root_node();
        let mut statements = Vec::new();

        let mut cursor = root_node.walk();
        for child in root_node.named_children(&mut cursor) {
            self.lower_statement(child, content, &mut statements);
        }

        Ok(statements)
    }

    fn extract_file_docs(&self, content: &str) -> Option<String> {
        let mut doc_lines = Vec::new();
        let mut in_jsdoc = false;

        for line in content.lines() {
            let trimmed = line.trim();

            if trimmed.starts_with("/**") {
                in_jsdoc = true;
                let content = trimmed.trim_start_matches("/**").trim_end_matches("*/").trim();
                if !content.is_empty() {
                    doc_lines.push(content.to_string());
                }
                if trimmed.ends_with("*/") {
                    break;
                }
            } else if in_jsdoc {
                let content = trimmed.trim_end_matches("*/").trim_start_matches('*').trim();
                if !content.is_empty() {
                    doc_lines.push(content.to_string());
                }
                if trimmed.ends_with("*/") {
                    break;
                }
            } else if !trimmed.is_empty() {
                // Hit code, stop looking for file-level docs
                break;
            }
        }

        if doc_lines.is_empty() {
            None
        } else {
            Some(doc_lines.join(" "))
        }
    }

    fn file_extensions(&self) -> &[&str] {
        match self.dialect {
            Dialect::TypeScript => &["ts", "mts", "cts"],
            Dialect::Tsx => &["tsx"],
            Dialect::JavaScript => &["js", "jsx", "mjs", "cjs"],
        }
    }

    fn language_name(&self) -> &str {
        match self.dialect {
            Dialect::TypeScript => "typescript",
            Dialect::Tsx => "tsx",
            Dialect::JavaScript => "javascript",
        }
    }
}

impl TypeScriptParser {
    fn lower_statement(&self, node: Node, source: &str, out: &mut Vec<Statement>) {
        match node.kind() {
            "export_statement" => self.lower_export(node, source, out),
            "import_statement" => {
                if let Some(import) = self.lower_import(node, source) {
                    out.push(Statement::Import(import));
                }
            }
            "expression_statement" => {
                // `namespace Foo {}` without `export` parses as an expression
                if let Some(inner) = node.named_child(0) {
                    if inner.kind() == "internal_module" {
                        self.lower_declaration(inner, node, source, ExportContext::default(), out);
                    }
                }
            }
            _ => {
                self.lower_declaration(node, node, source, ExportContext::default(), out);
            }
        }
    }

    fn lower_export(&self, node: Node, source: &str, out: &mut Vec<Statement>) {
        let default_export = self.has_token(node, "default");

        if let Some(declaration) = node.child_by_field_name("declaration") {
            let context = ExportContext { exported: true, default_export, ambient: false };
            self.lower_declaration(declaration, node, source, context, out);
            return;
        }

        if let Some(value) = node.child_by_field_name("value") {
            if value.kind() == "identifier" {
                out.push(Statement::ExportDefault(DefaultExport::Identifier(
                    self.node_text(value, source),
                )));
            } else {
                let context = ExportContext { exported: true, default_export: true, ambient: false };
                if !self.lower_declaration(value, node, source, context, out) {
                    out.push(Statement::ExportDefault(DefaultExport::Expression));
                }
            }
            return;
        }

        let specifier = node
            .child_by_field_name("source")
            .map(|source_node| unquote(&self.node_text(source_node, source)));

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "export_clause" => {
                    out.push(Statement::ExportNamed(ExportNamedNode {
                        specifier: specifier.clone(),
                        names: self.export_bindings(child, source),
                    }));
                    return;
                }
                "namespace_export" => {
                    let name = child.named_child(0).map(|n| unquote(&self.node_text(n, source)));
                    if let (Some(name), Some(specifier)) = (name, specifier.clone()) {
                        out.push(Statement::ExportNamespace { name, specifier });
                    }
                    return;
                }
                "*" => {
                    if let Some(specifier) = specifier.clone() {
                        out.push(Statement::ExportAll { specifier });
                    }
                    return;
                }
                _ => {}
            }
        }
    }

    fn export_bindings(&self, clause: Node, source: &str) -> Vec<ExportBinding> {
        let mut bindings = Vec::new();
        let mut cursor = clause.walk();
        for specifier in clause.named_children(&mut cursor) {
            if specifier.kind() != "export_specifier" {
                continue;
            }
            let Some(name_node) = specifier.child_by_field_name("name") else {
                continue;
            };
            let local = unquote(&self.node_text(name_node, source));
            let exported = specifier
                .child_by_field_name("alias")
                .map(|alias| unquote(&self.node_text(alias, source)))
                .unwrap_or_else(|| local.clone());
            bindings.push(ExportBinding { local, exported });
        }
        bindings
    }

    fn lower_import(&self, node: Node, source: &str) -> Option<ImportNode> {
        // `import x = require("y")` has no source field
        let source_node = node.child_by_field_name("source")?;
        let mut import = ImportNode {
            specifier: unquote(&self.node_text(source_node, source)),
            ..Default::default()
        };

        let mut cursor = node.walk();
        for clause in node.named_children(&mut cursor) {
            if clause.kind() != "import_clause" {
                continue;
            }
            let mut clause_cursor = clause.walk();
            for part in clause.named_children(&mut clause_cursor) {
                match part.kind() {
                    "identifier" => import.default = Some(self.node_text(part, source)),
                    "namespace_import" => {
                        import.namespace = part.named_child(0).map(|n| self.node_text(n, source));
                    }
                    "named_imports" => {
                        let mut named_cursor = part.walk();
                        for specifier in part.named_children(&mut named_cursor) {
                            if specifier.kind() != "import_specifier" {
                                continue;
                            }
                            let Some(name_node) = specifier.child_by_field_name("name") else {
                                continue;
                            };
                            let imported = unquote(&self.node_text(name_node, source));
                            let local = specifier
                                .child_by_field_name("alias")
                                .map(|alias| self.node_text(alias, source))
                                .unwrap_or_else(|| imported.clone());
                            import.named.push(ImportBinding { imported, local });
                        }
                    }
                    _ => {}
                }
            }
        }

        Some(import)
    }

    /// Lower a declaration node; `outer` carries the docs and line range
    fn lower_declaration(
        &self,
        node: Node,
        outer: Node,
        source: &str,
        context: ExportContext,
        out: &mut Vec<Statement>,
    ) -> bool {
        let kind = match node.kind() {
            "class_declaration" | "abstract_class_declaration" | "class" => DeclarationKind::Class,
            "interface_declaration" => DeclarationKind::Interface,
            "enum_declaration" => DeclarationKind::Enum,
            "function_declaration"
            | "generator_function_declaration"
            | "function_signature"
            | "function_expression"
            | "function"
            | "arrow_function" => DeclarationKind::Function,
            "type_alias_declaration" => DeclarationKind::TypeAlias,
            "module" | "internal_module" => DeclarationKind::Namespace,
            "lexical_declaration" | "variable_declaration" => {
                self.lower_variables(node, outer, source, context, out);
                return true;
            }
            "ambient_declaration" => {
                let context = ExportContext { ambient: true, ..context };
                let mut handled = false;
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    handled |= self.lower_declaration(child, outer, source, context, out);
                }
                return handled;
            }
            _ => return false,
        };

        let name = node
            .child_by_field_name("name")
            .map(|name_node| unquote(&self.node_text(name_node, source)))
            .filter(|name| !name.is_empty());

        let mut decl = DeclarationNode::new(name, kind);
        decl.exported = context.exported;
        decl.default_export = context.default_export;
        decl.ambient = context.ambient;
        decl.docs = self.extract_docs_before_node(outer, source);
        decl.line_range = (outer.start_position().row + 1, outer.end_position().row + 1);
        decl.type_parameters = self.type_parameters(node, source);

        match kind {
            DeclarationKind::Class => {
                decl.signature = Some(self.extract_signature_until_brace(node, source));
                decl.heritage = self.class_heritage(node, source);
                decl.members = self.class_members(node, source);
            }
            DeclarationKind::Interface => {
                decl.signature = Some(self.extract_signature_until_brace(node, source));
                decl.heritage = self.interface_heritage(node, source);
                decl.members = self.interface_members(node, source);
            }
            DeclarationKind::Enum => {
                decl.signature = Some(self.extract_signature_until_brace(node, source));
                decl.members = self.enum_members(node, source);
            }
            DeclarationKind::TypeAlias => {
                decl.signature = Some(self.statement_text(node, source));
                if let Some(value) = node.child_by_field_name("value") {
                    decl.heritage.extend(self.type_ref(value, source));
                }
            }
            DeclarationKind::Function => {
                decl.signature = Some(self.extract_function_signature(node, source));
            }
            DeclarationKind::Namespace => {
                decl.signature = Some(self.extract_signature_until_brace(node, source));
            }
            DeclarationKind::Variable | DeclarationKind::Constant => {}
        }

        out.push(Statement::Declaration(decl));
        true
    }

    fn lower_variables(
        &self,
        node: Node,
        outer: Node,
        source: &str,
        context: ExportContext,
        out: &mut Vec<Statement>,
    ) {
        let keyword = node.child(0).map(|k| k.kind().to_string()).unwrap_or_default();
        let constant = keyword == "const";

        let mut cursor = node.walk();
        for declarator in node.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            // Destructuring patterns have no single exported name
            if name_node.kind() != "identifier" {
                continue;
            }

            let value_kind = declarator.child_by_field_name("value").map(|value| value.kind());
            let kind = match value_kind {
                Some("arrow_function" | "function_expression" | "function") => DeclarationKind::Function,
                _ if constant => DeclarationKind::Constant,
                _ => DeclarationKind::Variable,
            };

            let mut decl = DeclarationNode::new(Some(self.node_text(name_node, source)), kind);
            decl.exported = context.exported;
            decl.ambient = context.ambient;
            decl.docs = self.extract_docs_before_node(outer, source);
            decl.line_range = (outer.start_position().row + 1, outer.end_position().row + 1);
            decl.signature = Some(self.extract_variable_signature(declarator, &keyword, kind, source));
            out.push(Statement::Declaration(decl));
        }
    }

    fn type_parameters(&self, node: Node, source: &str) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(params) = node.child_by_field_name("type_parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                if param.kind() != "type_parameter" {
                    continue;
                }
                if let Some(name) = param.child_by_field_name("name") {
                    names.push(self.node_text(name, source));
                }
            }
        }
        names
    }

    fn class_heritage(&self, node: Node, source: &str) -> Vec<TypeRef> {
        let mut refs = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "class_heritage" {
                continue;
            }
            let mut heritage_cursor = child.walk();
            for clause in child.named_children(&mut heritage_cursor) {
                match clause.kind() {
                    "extends_clause" | "implements_clause" => {
                        let mut clause_cursor = clause.walk();
                        for target in clause.named_children(&mut clause_cursor) {
                            refs.extend(self.type_ref(target, source));
                        }
                    }
                    // JavaScript grammar puts the expression directly under the heritage
                    _ => refs.extend(self.type_ref(clause, source)),
                }
            }
        }
        refs
    }

    fn interface_heritage(&self, node: Node, source: &str) -> Vec<TypeRef> {
        let mut refs = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "extends_type_clause" {
                continue;
            }
            let mut clause_cursor = child.walk();
            for target in child.named_children(&mut clause_cursor) {
                refs.extend(self.type_ref(target, source));
            }
        }
        refs
    }

    fn type_ref(&self, node: Node, source: &str) -> Option<TypeRef> {
        match node.kind() {
            "identifier" | "type_identifier" | "member_expression" | "nested_type_identifier" => {
                TypeRef::parse(&self.node_text(node, source))
            }
            "generic_type" => node
                .child_by_field_name("name")
                .or_else(|| node.named_child(0))
                .and_then(|name| self.type_ref(name, source)),
            _ => None,
        }
    }

    fn class_members(&self, node: Node, source: &str) -> Vec<MemberNode> {
        let mut members = Vec::new();
        let Some(body) = node.child_by_field_name("body") else {
            return members;
        };

        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            let kind = match child.kind() {
                "method_definition" | "method_signature" | "abstract_method_signature" => MemberKind::Method,
                "public_field_definition" | "field_definition" => MemberKind::Property,
                "index_signature" => MemberKind::Signature,
                _ => continue,
            };
            if self.is_private(child, source) {
                continue;
            }

            let name = match child.child_by_field_name("name").or_else(|| child.child_by_field_name("property")) {
                Some(name_node) => self.node_text(name_node, source),
                None if kind == MemberKind::Signature => "[index]".to_string(),
                None => continue,
            };
            // `#field` is never part of the public surface
            if name.starts_with('#') {
                continue;
            }

            let kind = if name == "constructor" { MemberKind::Constructor } else { kind };
            members.push(MemberNode {
                signature: Some(self.extract_method_signature(child, source)),
                docs: self.extract_docs_before_node(child, source),
                name,
                kind,
            });
        }

        members
    }

    fn interface_members(&self, node: Node, source: &str) -> Vec<MemberNode> {
        let mut members = Vec::new();
        let Some(body) = node.child_by_field_name("body") else {
            return members;
        };

        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            let (kind, fallback) = match child.kind() {
                "property_signature" => (MemberKind::Property, None),
                "method_signature" => (MemberKind::Method, None),
                "call_signature" => (MemberKind::Signature, Some("()")),
                "construct_signature" => (MemberKind::Constructor, Some("new")),
                "index_signature" => (MemberKind::Signature, Some("[index]")),
                _ => continue,
            };
            let name = match (child.child_by_field_name("name"), fallback) {
                (Some(name_node), _) => self.node_text(name_node, source),
                (None, Some(fallback)) => fallback.to_string(),
                (None, None) => continue,
            };
            members.push(MemberNode {
                name,
                kind,
                docs: self.extract_docs_before_node(child, source),
                signature: Some(self.statement_text(child, source)),
            });
        }

        members
    }

    fn enum_members(&self, node: Node, source: &str) -> Vec<MemberNode> {
        let mut members = Vec::new();
        let Some(body) = node.child_by_field_name("body") else {
            return members;
        };

        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            let name = match child.kind() {
                "property_identifier" | "string" => unquote(&self.node_text(child, source)),
                "enum_assignment" => match child.child_by_field_name("name") {
                    Some(name_node) => unquote(&self.node_text(name_node, source)),
                    None => continue,
                },
                _ => continue,
            };
            members.push(MemberNode {
                name,
                kind: MemberKind::EnumMember,
                docs: self.extract_docs_before_node(child, source),
                signature: Some(self.node_text(child, source)),
            });
        }

        members
    }

    fn is_private(&self, node: Node, source: &str) -> bool {
        let mut cursor = node.walk();
        let private = node
            .children(&mut cursor)
            .any(|child| child.kind() == "accessibility_modifier" && self.node_text(child, source) == "private");
        private
    }

    fn has_token(&self, node: Node, token: &str) -> bool {
        let mut cursor = node.walk();
        let found = node.children(&mut cursor).any(|child| child.kind() == token);
        found
    }

    /// Extract text content of a node
    fn node_text(&self, node: Node, source: &str) -> String {
        source[node.byte_range()].to_string()
    }

    /// Node text without its trailing semicolon
    fn statement_text(&self, node: Node, source: &str) -> String {
        self.node_text(node, source).trim().trim_end_matches(';').trim_end().to_string()
    }

    /// Extract signature until opening brace
    fn extract_signature_until_brace(&self, node: Node, source: &str) -> String {
        let full_text = self.node_text(node, source);
        let mut signature_lines = Vec::new();

        for line in full_text.lines() {
            let trimmed = line.trim();
            if trimmed.contains('{') && !trimmed.starts_with("//") && !trimmed.starts_with("/*") {
                if let Some(brace_pos) = trimmed.find('{') {
                    let before_brace = trimmed[..brace_pos].trim();
                    if !before_brace.is_empty() {
                        signature_lines.push(before_brace);
                    }
                }
                break;
            } else {
                signature_lines.push(trimmed);
            }
        }

        signature_lines.join(" ").trim().trim_end_matches(';').to_string()
    }

    /// Extract function signature
    fn extract_function_signature(&self, node: Node, source: &str) -> String {
        let full_text = self.node_text(node, source);
        let signature = match node.child_by_field_name("body") {
            Some(body) => &source[node.start_byte()..body.start_byte()],
            None => full_text.as_str(),
        };
        signature.trim().trim_end_matches(';').trim_end().to_string()
    }

    /// Variable signature, with function bodies elided
    fn extract_variable_signature(&self, declarator: Node, keyword: &str, kind: DeclarationKind, source: &str) -> String {
        let text = self.node_text(declarator, source);
        let text = if kind == DeclarationKind::Function {
            match text.find("=>") {
                Some(arrow_pos) => format!("{} => ...", text[..arrow_pos].trim()),
                None => text.lines().next().unwrap_or("").trim().to_string(),
            }
        } else {
            text.lines().next().unwrap_or("").trim().to_string()
        };
        format!("{} {}", keyword, text).trim().to_string()
    }

    /// Extract method signature
    fn extract_method_signature(&self, node: Node, source: &str) -> String {
        match node.child_by_field_name("body") {
            Some(body) => source[node.start_byte()..body.start_byte()].trim().to_string(),
            None => self.statement_text(node, source),
        }
    }

    /// Extract JSDoc comments before a node
    fn extract_docs_before_node(&self, node: Node, source: &str) -> Option<String> {
        let start_row = node.start_position().row;
        let lines: Vec<&str> = source.lines().collect();
        let mut doc_lines = Vec::new();
        let mut in_jsdoc = false;

        // Look backwards from the node's line for JSDoc comments
        for i in (0..start_row).rev() {
            if i >= lines.len() {
                continue;
            }

            let line = lines[i].trim();

            if line.ends_with("*/") && !in_jsdoc {
                if line.starts_with("/**") {
                    let content = line.trim_start_matches("/**").trim_end_matches("*/").trim();
                    if !content.is_empty() {
                        doc_lines.insert(0, content.to_string());
                    }
                    break;
                }
                in_jsdoc = true;
                let content = line.trim_end_matches("*/").trim_start_matches('*').trim();
                if !content.is_empty() {
                    doc_lines.insert(0, content.to_string());
                }
            } else if in_jsdoc {
                if line.starts_with("/**") {
                    let content = line.trim_start_matches("/**").trim();
                    if !content.is_empty() {
                        doc_lines.insert(0, content.to_string());
                    }
                    break;
                }
                let content = line.trim_start_matches('*').trim();
                if !content.is_empty() {
                    doc_lines.insert(0, content.to_string());
                }
            } else if line.starts_with("//") {
                let content = line.trim_start_matches("//").trim();
                if content.is_empty() {
                    break;
                }
                doc_lines.insert(0, content.to_string());
            } else {
                // Hit code or a blank line, stop looking
                break;
            }
        }

        if doc_lines.is_empty() {
            None
        } else {
            Some(doc_lines.join(" "))
        }
    }
}

fn unquote(text: &str) -> String {
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<Statement> {
        let mut parser = TypeScriptParser::new(Dialect::TypeScript).unwrap();
        parser.parse(source, Path::new("/p/a.ts")).unwrap()
    }

    fn declaration(statement: &Statement) -> &DeclarationNode {
        match statement {
            Statement::Declaration(decl) => decl,
            other => panic!("expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_reexport_shapes() {
        let statements = parse(
            r#"
export * from "./b";
export * as NS from "./other";
export { A, B as C } from './m';
export { local };
"#,
        );

        assert_eq!(statements.len(), 4);
        assert_eq!(statements[0], Statement::ExportAll { specifier: "./b".to_string() });
        assert_eq!(
            statements[1],
            Statement::ExportNamespace { name: "NS".to_string(), specifier: "./other".to_string() }
        );
        match &statements[2] {
            Statement::ExportNamed(named) => {
                assert_eq!(named.specifier.as_deref(), Some("./m"));
                assert_eq!(named.names[1].local, "B");
                assert_eq!(named.names[1].exported, "C");
            }
            other => panic!("unexpected {:?}", other),
        }
        match &statements[3] {
            Statement::ExportNamed(named) => assert!(named.specifier.is_none()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_imports() {
        let statements = parse(
            r#"
import Default, { A as B, C } from "./m";
import * as ns from "lib/sub";
import "./side-effect";
"#,
        );

        assert_eq!(statements.len(), 3);
        match &statements[0] {
            Statement::Import(import) => {
                assert_eq!(import.default.as_deref(), Some("Default"));
                assert_eq!(import.named[0], ImportBinding { imported: "A".to_string(), local: "B".to_string() });
                assert_eq!(import.named[1].local, "C");
            }
            other => panic!("unexpected {:?}", other),
        }
        match &statements[1] {
            Statement::Import(import) => {
                assert_eq!(import.namespace.as_deref(), Some("ns"));
                assert_eq!(import.specifier, "lib/sub");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_exported_declarations() {
        let statements = parse(
            r#"
/** A widget. */
export class Widget<T> extends Base implements Shape, ns.Other {
  constructor(value: T) {}
  private hidden(): void {}
  render(): string { return ""; }
}

export interface Options extends Partial<Base> {
  size: number;
}

export enum Color { Red, Green = 2 }

export type Alias = Color.Red;

export const answer = 42, handler = () => answer;

export default function main() {}
"#,
        );

        let widget = declaration(&statements[0]);
        assert_eq!(widget.name.as_deref(), Some("Widget"));
        assert_eq!(widget.kind, DeclarationKind::Class);
        assert!(widget.exported);
        assert_eq!(widget.docs.as_deref(), Some("A widget."));
        assert_eq!(widget.type_parameters, vec!["T".to_string()]);
        assert_eq!(widget.heritage.len(), 3);
        assert_eq!(widget.heritage[0].name, "Base");
        assert_eq!(widget.heritage[2].member.as_deref(), Some("Other"));
        let member_names: Vec<_> = widget.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(member_names, vec!["constructor", "render"]);
        assert_eq!(widget.members[0].kind, MemberKind::Constructor);

        let options = declaration(&statements[1]);
        assert_eq!(options.kind, DeclarationKind::Interface);
        assert_eq!(options.heritage[0].name, "Partial");
        assert_eq!(options.members[0].name, "size");

        let color = declaration(&statements[2]);
        assert_eq!(color.kind, DeclarationKind::Enum);
        assert_eq!(color.members.len(), 2);
        assert_eq!(color.members[1].name, "Green");

        let alias = declaration(&statements[3]);
        assert_eq!(alias.kind, DeclarationKind::TypeAlias);
        assert_eq!(alias.heritage[0], TypeRef { name: "Color".to_string(), member: Some("Red".to_string()) });

        let answer = declaration(&statements[4]);
        assert_eq!(answer.kind, DeclarationKind::Constant);
        let handler = declaration(&statements[5]);
        assert_eq!(handler.kind, DeclarationKind::Function);

        let main = declaration(&statements[6]);
        assert_eq!(main.exported_name(), Some("default"));
        assert_eq!(main.name.as_deref(), Some("main"));
    }

    #[test]
    fn test_default_exports() {
        let statements = parse("const value = 1;\nexport default value;\n");
        assert_eq!(
            statements[1],
            Statement::ExportDefault(DefaultExport::Identifier("value".to_string()))
        );

        let statements = parse("export default class {}\n");
        let anonymous = declaration(&statements[0]);
        assert_eq!(anonymous.name, None);
        assert_eq!(anonymous.exported_name(), Some("default"));

        let statements = parse("export default { a: 1 };\n");
        assert_eq!(statements[0], Statement::ExportDefault(DefaultExport::Expression));
    }

    #[test]
    fn test_ambient_declarations() {
        let statements = parse(
            r#"
export declare function create(): void;
declare class Hidden {}
declare module "pkg" {}
"#,
        );

        let create = declaration(&statements[0]);
        assert!(create.exported && create.ambient);
        assert_eq!(create.kind, DeclarationKind::Function);

        let hidden = declaration(&statements[1]);
        assert!(hidden.ambient && !hidden.exported);

        let module = declaration(&statements[2]);
        assert_eq!(module.kind, DeclarationKind::Namespace);
        assert_eq!(module.name.as_deref(), Some("pkg"));
    }

    #[test]
    fn test_file_docs() {
        let parser = TypeScriptParser::new(Dialect::TypeScript).unwrap();
        let docs = parser.extract_file_docs("/**\n * Public entry.\n */\nexport * from './a';\n");
        assert_eq!(docs.as_deref(), Some("Public entry."));
    }
}
