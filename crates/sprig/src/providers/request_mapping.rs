//
// providers/request_mapping.rs
//
// `@<path> -- <METHODS>` symbols for request mapping annotations
//

use tower_lsp::lsp_types::SymbolKind;

use super::SymbolProvider;
use crate::document::TextDocument;
use crate::error::ProviderError;
use crate::symbols::{AnnotationSite, SymbolRecord};

pub const REQUEST_MAPPING_ANNOTATIONS: [&str; 6] = [
    "org.springframework.web.bind.annotation.RequestMapping",
    "org.springframework.web.bind.annotation.GetMapping",
    "org.springframework.web.bind.annotation.PostMapping",
    "org.springframework.web.bind.annotation.PutMapping",
    "org.springframework.web.bind.annotation.DeleteMapping",
    "org.springframework.web.bind.annotation.PatchMapping",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct RequestMappingSymbolProvider;

impl SymbolProvider for RequestMappingSymbolProvider {
    fn build_symbol(
        &self,
        site: &AnnotationSite<'_>,
        _document: &TextDocument,
    ) -> Result<Option<SymbolRecord>, ProviderError> {
        let annotation = site.annotation;

        let paths: Vec<String> = annotation
            .attribute("value")
            .filter(|values| !values.is_empty())
            .or_else(|| annotation.attribute("path"))
            .unwrap_or_default()
            .iter()
            .map(|path| normalize_path(path))
            .collect();
        let path = if paths.is_empty() {
            "/".to_string()
        } else {
            paths.join(",")
        };

        let methods = match implied_method(site.simple_name()) {
            Some(method) => vec![method.to_string()],
            None => annotation
                .attribute("method")
                .unwrap_or_default()
                .iter()
                .map(|method| request_method_name(method))
                .collect(),
        };

        let name = if methods.is_empty() {
            format!("@{}", path)
        } else {
            format!("@{} -- {}", path, methods.join(","))
        };
        Ok(Some(SymbolRecord::at_site(name, SymbolKind::METHOD, site)))
    }
}

fn implied_method(annotation: &str) -> Option<&'static str> {
    match annotation {
        "GetMapping" => Some("GET"),
        "PostMapping" => Some("POST"),
        "PutMapping" => Some("PUT"),
        "DeleteMapping" => Some("DELETE"),
        "PatchMapping" => Some("PATCH"),
        _ => None,
    }
}

/// `RequestMethod.GET` / `GET` → `GET`
fn request_method_name(value: &str) -> String {
    value
        .rsplit('.')
        .next()
        .unwrap_or(value)
        .trim()
        .to_ascii_uppercase()
}

fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_support::site_parts;

    fn symbol_name(qualified: &str, raw: &str, attributes: Vec<(&str, Vec<&str>)>) -> String {
        let (document, annotation) = site_parts(raw, attributes, None);
        let site = AnnotationSite::new(&document, qualified, &annotation);
        RequestMappingSymbolProvider
            .build_symbol(&site, &document)
            .unwrap()
            .unwrap()
            .name
    }

    #[test]
    fn test_get_mapping_with_path() {
        assert_eq!(
            symbol_name(REQUEST_MAPPING_ANNOTATIONS[1], "@GetMapping(\"/greeting\")", vec![("value", vec!["/greeting"])]),
            "@/greeting -- GET"
        );
    }

    #[test]
    fn test_request_mapping_without_method() {
        assert_eq!(
            symbol_name(REQUEST_MAPPING_ANNOTATIONS[0], "@RequestMapping(\"api\")", vec![("value", vec!["api"])]),
            "@/api"
        );
    }

    #[test]
    fn test_request_mapping_with_paths_and_methods() {
        assert_eq!(
            symbol_name(
                REQUEST_MAPPING_ANNOTATIONS[0],
                "@RequestMapping(path = {\"/a\", \"/b\"}, method = {RequestMethod.GET, POST})",
                vec![("path", vec!["/a", "/b"]), ("method", vec!["RequestMethod.GET", "POST"])],
            ),
            "@/a,/b -- GET,POST"
        );
    }

    #[test]
    fn test_marker_mapping_defaults_to_root() {
        assert_eq!(symbol_name(REQUEST_MAPPING_ANNOTATIONS[4], "@DeleteMapping", vec![]), "@/ -- DELETE");
    }

    #[test]
    fn test_symbol_kind_and_range() {
        let (document, annotation) = site_parts("@PatchMapping", vec![], None);
        let site = AnnotationSite::new(&document, REQUEST_MAPPING_ANNOTATIONS[5], &annotation);
        let record = RequestMappingSymbolProvider
            .build_symbol(&site, &document)
            .unwrap()
            .unwrap();
        assert_eq!(record.kind, SymbolKind::METHOD);
        assert_eq!(record.range, site.range);
        assert_eq!(record.range.end.character, 13);
    }
}
