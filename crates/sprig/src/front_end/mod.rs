//
// front_end/mod.rs
//
// Source front-end: parse a file against a project classpath and report the
// annotation applications in it with their resolved types
//

mod java;
mod resolve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tower_lsp::lsp_types::Url;

use crate::classpath::ClasspathSnapshot;
use crate::document::TextDocument;
use crate::error::SourceParseError;
use crate::type_index::TypeRecord;

pub use java::JavaFrontEnd;
pub use resolve::TypeResolver;

/// Parses source files with error recovery and binding resolution.
pub trait SourceFrontEnd: Send + Sync {
    /// Parse `path` against `classpath`. Only failures that leave no usable
    /// tree are errors; local syntax errors are recovered from.
    fn parse(
        &self,
        path: &Path,
        classpath: &ClasspathSnapshot,
    ) -> Result<CompilationUnit, SourceParseError>;
}

/// Surface syntax of an annotation application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationForm {
    /// `@A`
    Marker,
    /// `@A(x)`
    SingleMember,
    /// `@A()` or `@A(k = v, ...)`
    Normal,
}

/// One `name = value` pair. Single-member annotations use the name `value`.
/// String literals are unquoted and array initializers flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationAttribute {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Package,
    Class,
    Interface,
    Enum,
    Record,
    AnnotationType,
    AnnotationElement,
    EnumConstant,
    Constructor,
    Method,
    Field,
    Parameter,
    LocalVariable,
    Other,
}

/// Declaration whose modifiers hold an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedDeclaration {
    pub kind: DeclarationKind,
    pub name: Option<String>,
    /// Field/parameter/variable type or method return type, as written.
    pub declared_type: Option<String>,
}

/// Resolved annotation type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeBinding {
    /// Qualified name in source form (`a.Outer.Inner`).
    pub qualified_name: String,
    /// Classpath record, or `None` for a type declared in the same file.
    pub record: Option<Arc<TypeRecord>>,
}

/// One annotation application in a compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Type name as written (`GetMapping`, `org.x.GetMapping`).
    pub written_name: String,
    pub binding: Option<TypeBinding>,
    pub form: AnnotationForm,
    pub start_byte: usize,
    pub end_byte: usize,
    pub raw_text: String,
    pub attributes: Vec<AnnotationAttribute>,
    pub target: Option<AnnotatedDeclaration>,
}

impl Annotation {
    pub fn qualified_name(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.qualified_name.as_str())
    }

    /// All values of attribute `name`, in source order.
    pub fn attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.values.as_slice())
    }

    pub fn len_bytes(&self) -> usize {
        self.end_byte - self.start_byte
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Dotted path without the trailing `.*`.
    pub path: String,
    pub on_demand: bool,
    pub is_static: bool,
}

/// Type declared in the compilation unit itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    pub simple_name: String,
    pub qualified_name: String,
    /// Qualified name of the directly enclosing type; `None` at top level.
    pub enclosing: Option<String>,
}

/// Parsed file with every annotation application it contains.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub path: PathBuf,
    pub document: TextDocument,
    pub package: Option<String>,
    pub imports: Vec<Import>,
    pub declared_types: Vec<DeclaredType>,
    pub annotations: Vec<Annotation>,
    /// The tree contained recovered syntax errors.
    pub has_errors: bool,
}

impl CompilationUnit {
    pub fn uri(&self) -> &Url {
        self.document.uri()
    }
}
