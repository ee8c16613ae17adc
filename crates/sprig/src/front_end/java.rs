//
// front_end/java.rs
//
// Java front-end on tree-sitter-java
//

use std::fs;
use std::path::Path;
use std::time::Duration;

use tower_lsp::lsp_types::Url;
use tree_sitter::Node;

use super::{
    AnnotatedDeclaration, Annotation, AnnotationAttribute, AnnotationForm, CompilationUnit,
    DeclarationKind, DeclaredType, Import, SourceFrontEnd, TypeResolver,
};
use crate::classpath::ClasspathSnapshot;
use crate::config::SymbolsConfig;
use crate::document::TextDocument;
use crate::error::SourceParseError;
use crate::parser_pool::{non_extra_named_children, parse_with_timeout};
use crate::type_index::TypeIndex;

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

#[derive(Debug, Clone)]
pub struct JavaFrontEnd {
    /// Files larger than this are skipped. Zero disables the limit.
    max_file_size: u64,
    /// Parse time budget per file. Zero disables the limit.
    parse_timeout: Duration,
}

impl JavaFrontEnd {
    pub fn new(max_file_size: u64, parse_timeout: Duration) -> Self {
        Self {
            max_file_size,
            parse_timeout,
        }
    }

    pub fn from_config(config: &SymbolsConfig) -> Self {
        Self::new(
            config.max_file_size_bytes,
            Duration::from_millis(config.parse_timeout_ms),
        )
    }

    /// Parse already-loaded text. `index` backs binding resolution.
    pub fn parse_text(
        &self,
        path: &Path,
        uri: Url,
        text: &str,
        index: &TypeIndex,
    ) -> Result<CompilationUnit, SourceParseError> {
        let tree = parse_with_timeout(text, self.parse_timeout).ok_or_else(|| {
            SourceParseError::NoTree {
                path: path.to_path_buf(),
            }
        })?;
        let root = tree.root_node();

        let mut outline = Outline::default();
        let mut scope = Vec::new();
        collect(root, text, &mut scope, &mut outline);

        let resolver = TypeResolver::new(
            outline.package.as_deref(),
            &outline.imports,
            &outline.declared,
            index,
        );
        let annotations: Vec<Annotation> = outline
            .annotation_nodes
            .iter()
            .filter_map(|(node, scope)| build_annotation(*node, scope, text, &resolver))
            .collect();

        if root.has_error() {
            log::trace!("Recovered from syntax errors in {}", path.display());
        }

        Ok(CompilationUnit {
            path: path.to_path_buf(),
            document: TextDocument::new(uri, "java", text),
            package: outline.package,
            imports: outline.imports,
            declared_types: outline.declared,
            annotations,
            has_errors: root.has_error(),
        })
    }
}

impl Default for JavaFrontEnd {
    fn default() -> Self {
        Self::from_config(&SymbolsConfig::default())
    }
}

impl SourceFrontEnd for JavaFrontEnd {
    fn parse(
        &self,
        path: &Path,
        classpath: &ClasspathSnapshot,
    ) -> Result<CompilationUnit, SourceParseError> {
        let metadata = fs::metadata(path).map_err(|source| SourceParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if self.max_file_size > 0 && metadata.len() > self.max_file_size {
            return Err(SourceParseError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: self.max_file_size,
            });
        }

        let bytes = fs::read(path).map_err(|source| SourceParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // Invalid sequences (e.g. Latin-1 comments) become U+FFFD; offsets
        // below refer to the decoded text
        let text = String::from_utf8_lossy(&bytes);
        let uri = Url::from_file_path(path).map_err(|_| SourceParseError::InvalidPath {
            path: path.to_path_buf(),
        })?;

        self.parse_text(path, uri, &text, classpath.type_index())
    }
}

#[derive(Default)]
struct Outline<'tree> {
    package: Option<String>,
    imports: Vec<Import>,
    declared: Vec<DeclaredType>,
    /// Annotation nodes with the enclosing type scope at each.
    annotation_nodes: Vec<(Node<'tree>, Vec<String>)>,
}

fn node_text<'a>(node: Node<'_>, text: &'a str) -> &'a str {
    &text[node.byte_range()]
}

/// Dotted name with any whitespace between segments removed.
fn compact_name(name: &str) -> String {
    name.split_whitespace().collect()
}

/// `scope` holds the qualified names of the enclosing type declarations.
fn collect<'tree>(node: Node<'tree>, text: &str, scope: &mut Vec<String>, outline: &mut Outline<'tree>) {
    match node.kind() {
        "package_declaration" => {
            outline.package = dotted_name_child(node, text);
        }
        "import_declaration" => {
            if let Some(import) = import_of(node, text) {
                outline.imports.push(import);
            }
            return;
        }
        "marker_annotation" | "annotation" => {
            outline.annotation_nodes.push((node, scope.clone()));
        }
        kind if TYPE_DECLARATIONS.contains(&kind) => {
            if let Some(name) = node.child_by_field_name("name") {
                let simple = node_text(name, text).to_string();
                let enclosing = scope.last().cloned();
                let qualified = match enclosing.as_deref().or(outline.package.as_deref()) {
                    Some(prefix) => format!("{}.{}", prefix, simple),
                    None => simple.clone(),
                };
                outline.declared.push(DeclaredType {
                    simple_name: simple,
                    qualified_name: qualified.clone(),
                    enclosing,
                });

                // Modifiers sit outside the type's own body
                for child in node.children(&mut node.walk()) {
                    if child.kind() == "modifiers" {
                        collect(child, text, scope, outline);
                    } else {
                        scope.push(qualified.clone());
                        collect(child, text, scope, outline);
                        scope.pop();
                    }
                }
                return;
            }
        }
        _ => {}
    }

    for child in node.children(&mut node.walk()) {
        collect(child, text, scope, outline);
    }
}

fn dotted_name_child(node: Node<'_>, text: &str) -> Option<String> {
    node.children(&mut node.walk())
        .find(|child| matches!(child.kind(), "identifier" | "scoped_identifier"))
        .map(|child| compact_name(node_text(child, text)))
}

fn import_of(node: Node<'_>, text: &str) -> Option<Import> {
    let mut is_static = false;
    let mut on_demand = false;
    for child in node.children(&mut node.walk()) {
        match child.kind() {
            "static" => is_static = true,
            "asterisk" => on_demand = true,
            _ => {}
        }
    }
    Some(Import {
        path: dotted_name_child(node, text)?,
        on_demand,
        is_static,
    })
}

fn build_annotation(
    node: Node<'_>,
    scope: &[String],
    text: &str,
    resolver: &TypeResolver<'_>,
) -> Option<Annotation> {
    let name = node.child_by_field_name("name")?;
    let written_name = compact_name(node_text(name, text));
    let (form, attributes) = if node.kind() == "marker_annotation" {
        (AnnotationForm::Marker, Vec::new())
    } else {
        annotation_arguments(node, text)
    };

    let binding = resolver.resolve(&written_name, scope);
    if binding.is_none() {
        log::trace!(
            "Unresolved annotation type {} at byte {}",
            written_name,
            node.start_byte()
        );
    }

    Some(Annotation {
        written_name,
        binding,
        form,
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        raw_text: node_text(node, text).to_string(),
        attributes,
        target: annotated_declaration(node, text),
    })
}

fn annotation_arguments(node: Node<'_>, text: &str) -> (AnnotationForm, Vec<AnnotationAttribute>) {
    let Some(arguments) = node.child_by_field_name("arguments") else {
        return (AnnotationForm::Normal, Vec::new());
    };
    let mut cursor = arguments.walk();
    let children = non_extra_named_children(arguments, &mut cursor);

    if children.iter().all(|child| child.kind() == "element_value_pair") {
        let attributes = children
            .iter()
            .filter_map(|pair| {
                let key = pair.child_by_field_name("key")?;
                let value = pair.child_by_field_name("value")?;
                Some(AnnotationAttribute {
                    name: node_text(key, text).to_string(),
                    values: element_values(value, text),
                })
            })
            .collect();
        return (AnnotationForm::Normal, attributes);
    }

    let attributes = children
        .first()
        .map(|value| AnnotationAttribute {
            name: "value".to_string(),
            values: element_values(*value, text),
        })
        .into_iter()
        .collect();
    (AnnotationForm::SingleMember, attributes)
}

fn element_values(node: Node<'_>, text: &str) -> Vec<String> {
    let mut values = Vec::new();
    push_element_values(node, text, &mut values);
    values
}

fn push_element_values(node: Node<'_>, text: &str, values: &mut Vec<String>) {
    if node.kind() == "element_value_array_initializer" {
        let mut cursor = node.walk();
        for child in non_extra_named_children(node, &mut cursor) {
            push_element_values(child, text, values);
        }
        return;
    }
    let value = constant_string(node, text).unwrap_or_else(|| node_text(node, text).trim().to_string());
    values.push(value);
}

/// Value of a compile-time string constant built from literals and `+`.
fn constant_string(node: Node<'_>, text: &str) -> Option<String> {
    match node.kind() {
        "string_literal" => Some(unquote(node_text(node, text))),
        "parenthesized_expression" => {
            let mut cursor = node.walk();
            let inner = non_extra_named_children(node, &mut cursor).into_iter().next()?;
            constant_string(inner, text)
        }
        "binary_expression" => {
            let operator = node.child_by_field_name("operator")?;
            if operator.kind() != "+" {
                return None;
            }
            let left = constant_string(node.child_by_field_name("left")?, text)?;
            let right = constant_string(node.child_by_field_name("right")?, text)?;
            Some(left + &right)
        }
        _ => None,
    }
}

fn unquote(literal: &str) -> String {
    let inner = if let Some(block) = literal
        .strip_prefix("\"\"\"")
        .and_then(|rest| rest.strip_suffix("\"\"\""))
    {
        // Text block content starts after the opening line
        block.split_once('\n').map(|(_, body)| body).unwrap_or(block)
    } else {
        literal
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(literal)
    };
    unescape(inner)
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn annotated_declaration(node: Node<'_>, text: &str) -> Option<AnnotatedDeclaration> {
    let parent = node.parent()?;
    let declaration = match parent.kind() {
        "modifiers" => parent.parent()?,
        "package_declaration" => {
            return Some(AnnotatedDeclaration {
                kind: DeclarationKind::Package,
                name: dotted_name_child(parent, text),
                declared_type: None,
            });
        }
        _ => return None,
    };

    let kind = match declaration.kind() {
        "class_declaration" => DeclarationKind::Class,
        "interface_declaration" => DeclarationKind::Interface,
        "enum_declaration" => DeclarationKind::Enum,
        "record_declaration" => DeclarationKind::Record,
        "annotation_type_declaration" => DeclarationKind::AnnotationType,
        "annotation_type_element_declaration" => DeclarationKind::AnnotationElement,
        "enum_constant" => DeclarationKind::EnumConstant,
        "constructor_declaration" => DeclarationKind::Constructor,
        "method_declaration" => DeclarationKind::Method,
        "field_declaration" => DeclarationKind::Field,
        "formal_parameter" | "spread_parameter" => DeclarationKind::Parameter,
        "local_variable_declaration" => DeclarationKind::LocalVariable,
        _ => DeclarationKind::Other,
    };

    let name_node = match kind {
        DeclarationKind::Field | DeclarationKind::LocalVariable => declaration
            .child_by_field_name("declarator")
            .and_then(|declarator| declarator.child_by_field_name("name")),
        _ => declaration.child_by_field_name("name"),
    };
    let declared_type = match kind {
        DeclarationKind::Method
        | DeclarationKind::AnnotationElement
        | DeclarationKind::Field
        | DeclarationKind::Parameter
        | DeclarationKind::LocalVariable => declaration
            .child_by_field_name("type")
            .map(|ty| node_text(ty, text).to_string()),
        _ => None,
    };

    Some(AnnotatedDeclaration {
        kind,
        name: name_node.map(|n| node_text(n, text).to_string()),
        declared_type,
    })
}
