//! Serializable API model: modules, export records and references.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{DeclarationKind, MemberNode};

/// File key under which a directory's `index` file is stored
pub const INDEX_FILE_KEY: &str = "$index";

/// What a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Class,
    Interface,
    Enum,
    Function,
    Constant,
    TypeAlias,
    TypeParameter,
    EnumMember,
    NamespaceOrModule,
    External,
    Unknown,
}

impl From<DeclarationKind> for ReferenceKind {
    fn from(kind: DeclarationKind) -> Self {
        match kind {
            DeclarationKind::Class => ReferenceKind::Class,
            DeclarationKind::Interface => ReferenceKind::Interface,
            DeclarationKind::Enum => ReferenceKind::Enum,
            DeclarationKind::Function => ReferenceKind::Function,
            DeclarationKind::Variable | DeclarationKind::Constant => ReferenceKind::Constant,
            DeclarationKind::TypeAlias => ReferenceKind::TypeAlias,
            DeclarationKind::Namespace => ReferenceKind::NamespaceOrModule,
        }
    }
}

/// Resolved identity of a named declaration or external symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceType {
    pub name: String,
    /// Shown instead of `name`, e.g. `Color.Red` for an enum member
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_path: Option<Vec<String>>,
    pub kind: ReferenceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl ReferenceType {
    /// Reference to a declaration inside an analyzed project
    pub fn declared(
        name: impl Into<String>,
        kind: ReferenceKind,
        project: &str,
        module_path: Vec<String>,
        module_name: &str,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            module_path: Some(module_path),
            kind,
            link: None,
            module_name: Some(module_name.to_string()),
            project: Some(project.to_string()),
        }
    }

    /// Reference resolved by an external resolver
    pub fn external(name: impl Into<String>, link: String, kind: ReferenceKind) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            module_path: None,
            kind,
            link: Some(link),
            module_name: None,
            project: None,
        }
    }

    pub fn type_parameter(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            module_path: None,
            kind: ReferenceKind::TypeParameter,
            link: None,
            module_name: None,
            project: None,
        }
    }

    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            module_path: None,
            kind: ReferenceKind::Unknown,
            link: None,
            module_name: None,
            project: None,
        }
    }

    /// `Enum.Member`, keeping the enum as the linked name
    pub fn enum_member(&self, member: &str) -> Self {
        Self {
            display_name: Some(format!("{}.{}", self.name, member)),
            kind: ReferenceKind::EnumMember,
            ..self.clone()
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.module_path.is_some() || self.link.is_some()
    }
}

/// A reference as exported under a possibly different local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasedReference {
    #[serde(flatten)]
    pub reference: ReferenceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl AliasedReference {
    /// Alias is kept only when the exported name differs from the origin's
    pub fn new(reference: ReferenceType, exported: &str) -> Self {
        let alias = (reference.name != exported).then(|| exported.to_string());
        Self { reference, alias }
    }

    /// Name the reference is visible under in the exporting file
    pub fn exported_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.reference.name)
    }
}

/// Everything a file forwards from one origin file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedElement {
    /// Path of the origin module
    pub module: Vec<String>,
    /// Set when the origin module belongs to another project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Absent when the origin is the module's index file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Empty means everything
    pub references: Vec<AliasedReference>,
    pub same_module: bool,
}

impl ExportedElement {
    pub fn is_wildcard(&self) -> bool {
        self.references.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileExports {
    pub exports: Vec<AliasedReference>,
    pub re_exports: Vec<ExportedElement>,
}

/// Documentation summary of one exported declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
    /// File key within the owning module
    pub file: String,
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<MemberNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub heritage: Vec<ReferenceType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Declarations {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<Declaration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<Declaration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<Declaration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<Declaration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_aliases: Vec<Declaration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constants: Vec<Declaration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<Declaration>,
}

impl Declarations {
    pub fn push(&mut self, declaration: Declaration) {
        let bucket = match declaration.kind {
            DeclarationKind::Class => &mut self.classes,
            DeclarationKind::Interface => &mut self.interfaces,
            DeclarationKind::Enum => &mut self.enums,
            DeclarationKind::Function => &mut self.functions,
            DeclarationKind::TypeAlias => &mut self.type_aliases,
            DeclarationKind::Variable | DeclarationKind::Constant => &mut self.constants,
            DeclarationKind::Namespace => &mut self.namespaces,
        };
        bucket.push(declaration);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
            + self.interfaces.len()
            + self.enums.len()
            + self.functions.len()
            + self.type_aliases.len()
            + self.constants.len()
            + self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One directory level of an analyzed project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub name: String,
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Module>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
    #[serde(flatten)]
    pub declarations: Declarations,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, FileExports>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
}

impl Module {
    /// Descend by child names
    pub fn find(&self, path: &[&str]) -> Option<&Module> {
        let mut current = self;
        for segment in path {
            current = current.children.get(*segment)?;
        }
        Some(current)
    }

    pub fn file(&self, key: &str) -> Option<&FileExports> {
        self.files.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_only_when_names_differ() {
        let reference = ReferenceType::declared("A", ReferenceKind::Class, "p", vec![], "p");
        assert_eq!(AliasedReference::new(reference.clone(), "A").alias, None);

        let aliased = AliasedReference::new(reference, "C");
        assert_eq!(aliased.alias.as_deref(), Some("C"));
        assert_eq!(aliased.exported_name(), "C");
        assert_eq!(aliased.reference.name, "A");
    }

    #[test]
    fn test_enum_member_display_name() {
        let color = ReferenceType::declared("Color", ReferenceKind::Enum, "p", vec!["ui".into()], "ui");
        let red = color.enum_member("Red");

        assert_eq!(red.name, "Color");
        assert_eq!(red.display_name.as_deref(), Some("Color.Red"));
        assert_eq!(red.kind, ReferenceKind::EnumMember);
        assert!(red.is_resolved());
        assert!(!ReferenceType::unknown("X").is_resolved());
    }

    #[test]
    fn test_serialized_field_names() {
        let mut file = FileExports::default();
        file.re_exports.push(ExportedElement {
            module: vec!["b".to_string()],
            project: None,
            namespace: Some("NS".to_string()),
            filename: None,
            references: vec![],
            same_module: false,
        });

        let json = serde_json::to_value(&file).unwrap();
        assert!(json.get("reExports").is_some());
        assert_eq!(json["reExports"][0]["namespace"], "NS");
        assert!(json["reExports"][0].get("filename").is_none());
        assert_eq!(json["reExports"][0]["sameModule"], false);
    }
}
