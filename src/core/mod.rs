mod engine;
mod parser;

// Source front end
pub mod host;
mod languages;
pub mod program;

// Export model and resolution
pub mod model;
pub mod references;
pub mod library_index;
pub mod module_tree;
pub mod metadata;

// Traversal
mod analyzer;
mod visitor;
mod aggregator;

pub use parser::{
    calculate_hash, CodeParser, DeclarationKind, DeclarationNode, DefaultExport, ExportBinding,
    ExportNamedNode, ImportBinding, ImportNode, MemberKind, MemberNode, ParsedFile, Statement, TypeRef,
};
pub use analyzer::{Analysis, Analyzer};
pub use host::{DiskHost, MemoryHost, SourceHost};
pub use library_index::LibraryIndex;
pub use metadata::{discover_project, ProjectSpec};
pub use model::{Module, ReferenceKind, ReferenceType};
pub use program::Program;
pub use references::{ExternalResolver, GlobalsResolver, ReferenceManager, UrlTemplateResolver};

// Export the main engine
pub use engine::{Engine, OutputDocument};
