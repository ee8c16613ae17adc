//
// symbols.rs
//
// Annotation sites handed to providers and the symbols they produce
//

use serde::Serialize;
use tower_lsp::lsp_types::{Location, Range, SymbolInformation, SymbolKind, Url};

use crate::document::TextDocument;
use crate::front_end::Annotation;

/// One resolved annotation application.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationSite<'a> {
    pub uri: &'a Url,
    pub range: Range,
    pub qualified_name: &'a str,
    pub annotation: &'a Annotation,
}

impl<'a> AnnotationSite<'a> {
    pub fn new(
        document: &'a TextDocument,
        qualified_name: &'a str,
        annotation: &'a Annotation,
    ) -> Self {
        Self {
            uri: document.uri(),
            range: document.to_range(annotation.start_byte, annotation.len_bytes()),
            qualified_name,
            annotation,
        }
    }

    pub fn raw_text(&self) -> &'a str {
        &self.annotation.raw_text
    }

    /// Last segment of the qualified annotation name.
    pub fn simple_name(&self) -> &'a str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(self.qualified_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolRecord {
    pub name: String,
    #[serde(serialize_with = "serialize_kind")]
    pub kind: SymbolKind,
    pub uri: Url,
    pub range: Range,
}

impl SymbolRecord {
    pub fn new(name: impl Into<String>, kind: SymbolKind, uri: Url, range: Range) -> Self {
        Self {
            name: name.into(),
            kind,
            uri,
            range,
        }
    }

    /// Symbol located at the annotation itself.
    pub fn at_site(name: impl Into<String>, kind: SymbolKind, site: &AnnotationSite<'_>) -> Self {
        Self::new(name, kind, site.uri.clone(), site.range)
    }

    #[allow(deprecated)]
    pub fn to_symbol_information(&self) -> SymbolInformation {
        SymbolInformation {
            name: self.name.clone(),
            kind: self.kind,
            tags: None,
            deprecated: None,
            location: Location {
                uri: self.uri.clone(),
                range: self.range,
            },
            container_name: None,
        }
    }
}

fn serialize_kind<S: serde::Serializer>(kind: &SymbolKind, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(symbol_kind_label(*kind))
}

/// Lower-case label for the symbol kinds this crate emits.
pub fn symbol_kind_label(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::INTERFACE => "interface",
        SymbolKind::METHOD => "method",
        SymbolKind::CLASS => "class",
        SymbolKind::FIELD => "field",
        SymbolKind::CONSTANT => "constant",
        _ => "symbol",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_end::AnnotationForm;

    fn annotation(source: &str, start: usize, raw: &str) -> Annotation {
        assert_eq!(&source[start..start + raw.len()], raw);
        Annotation {
            written_name: "Component".to_string(),
            binding: None,
            form: AnnotationForm::Marker,
            start_byte: start,
            end_byte: start + raw.len(),
            raw_text: raw.to_string(),
            attributes: Vec::new(),
            target: None,
        }
    }

    #[test]
    fn test_site_range_and_names() {
        let source = "package demo;\n\n  @Component\nclass A {}\n";
        let document = TextDocument::new(
            Url::parse("file:///w/A.java").unwrap(),
            "java",
            source,
        );
        let annotation = annotation(source, 17, "@Component");
        let site = AnnotationSite::new(
            &document,
            "org.springframework.stereotype.Component",
            &annotation,
        );

        assert_eq!(site.range.start.line, 2);
        assert_eq!(site.range.start.character, 2);
        assert_eq!(site.range.end.character, 12);
        assert_eq!(site.simple_name(), "Component");
        assert_eq!(site.raw_text(), "@Component");
    }

    #[test]
    fn test_symbol_information_conversion() {
        let record = SymbolRecord::new(
            "@/api -- GET",
            SymbolKind::METHOD,
            Url::parse("file:///w/A.java").unwrap(),
            Range::default(),
        );
        let info = record.to_symbol_information();
        assert_eq!(info.name, "@/api -- GET");
        assert_eq!(info.kind, SymbolKind::METHOD);
        assert_eq!(info.location.uri.as_str(), "file:///w/A.java");
    }

    #[test]
    fn test_json_uses_kind_label() {
        let record = SymbolRecord::new(
            "@Bean",
            SymbolKind::INTERFACE,
            Url::parse("file:///w/A.java").unwrap(),
            Range::default(),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "interface");
        assert_eq!(json["uri"], "file:///w/A.java");
        assert_eq!(json["range"]["start"]["line"], 0);
    }
}
