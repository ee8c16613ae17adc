//
// providers/bean.rs
//
// Bean definition symbols for `@Bean` methods and stereotype-annotated types
//

use tower_lsp::lsp_types::SymbolKind;

use super::SymbolProvider;
use crate::document::TextDocument;
use crate::error::ProviderError;
use crate::front_end::DeclarationKind;
use crate::symbols::{AnnotationSite, SymbolRecord};

pub const BEAN_ANNOTATION: &str = "org.springframework.context.annotation.Bean";

pub const COMPONENT_ANNOTATIONS: [&str; 6] = [
    "org.springframework.stereotype.Component",
    "org.springframework.stereotype.Service",
    "org.springframework.stereotype.Repository",
    "org.springframework.stereotype.Controller",
    "org.springframework.web.bind.annotation.RestController",
    "org.springframework.context.annotation.Configuration",
];

/// `@+ '<name>' <ReturnType>` for `@Bean` factory methods.
#[derive(Debug, Default, Clone, Copy)]
pub struct BeanSymbolProvider;

impl SymbolProvider for BeanSymbolProvider {
    fn build_symbol(
        &self,
        site: &AnnotationSite<'_>,
        _document: &TextDocument,
    ) -> Result<Option<SymbolRecord>, ProviderError> {
        let Some(target) = site.annotation.target.as_ref() else {
            return Ok(None);
        };
        if target.kind != DeclarationKind::Method {
            return Ok(None);
        }

        let bean_name = first_value(site, "name")
            .or_else(|| first_value(site, "value"))
            .or(target.name.as_deref());
        let Some(bean_name) = bean_name else {
            return Ok(None);
        };

        let name = match target.declared_type.as_deref() {
            Some(return_type) => format!("@+ '{}' {}", bean_name, return_type),
            None => format!("@+ '{}'", bean_name),
        };
        Ok(Some(SymbolRecord::at_site(name, SymbolKind::INTERFACE, site)))
    }
}

/// `@+ '<bean>' (@<Stereotype>) <Type>` for component classes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComponentSymbolProvider;

impl SymbolProvider for ComponentSymbolProvider {
    fn build_symbol(
        &self,
        site: &AnnotationSite<'_>,
        _document: &TextDocument,
    ) -> Result<Option<SymbolRecord>, ProviderError> {
        let Some(target) = site.annotation.target.as_ref() else {
            return Ok(None);
        };
        if !matches!(
            target.kind,
            DeclarationKind::Class
                | DeclarationKind::Interface
                | DeclarationKind::Enum
                | DeclarationKind::Record
                | DeclarationKind::AnnotationType
        ) {
            return Ok(None);
        }
        let Some(type_name) = target.name.as_deref() else {
            return Ok(None);
        };

        let bean_name = first_value(site, "value")
            .map(str::to_string)
            .unwrap_or_else(|| decapitalize(type_name));
        let name = format!("@+ '{}' (@{}) {}", bean_name, site.simple_name(), type_name);
        Ok(Some(SymbolRecord::at_site(name, SymbolKind::INTERFACE, site)))
    }
}

fn first_value<'a>(site: &AnnotationSite<'a>, attribute: &str) -> Option<&'a str> {
    site.annotation
        .attribute(attribute)?
        .first()
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

/// Default bean name for a type: `FooService` → `fooService`, `URLParser` stays.
fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if chars.next().is_some_and(char::is_uppercase) && first.is_uppercase() {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len());
    out.extend(first.to_lowercase());
    out.push_str(&name[first.len_utf8()..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_support::site_parts;

    fn build(
        provider: &dyn SymbolProvider,
        qualified: &str,
        raw: &str,
        attributes: Vec<(&str, Vec<&str>)>,
        target: Option<(DeclarationKind, &str, Option<&str>)>,
    ) -> Option<SymbolRecord> {
        let (document, annotation) = site_parts(raw, attributes, target);
        let site = AnnotationSite::new(&document, qualified, &annotation);
        provider.build_symbol(&site, &document).unwrap()
    }

    #[test]
    fn test_bean_uses_method_name_and_return_type() {
        let record = build(
            &BeanSymbolProvider,
            BEAN_ANNOTATION,
            "@Bean",
            vec![],
            Some((DeclarationKind::Method, "restTemplate", Some("RestTemplate"))),
        )
        .unwrap();
        assert_eq!(record.name, "@+ 'restTemplate' RestTemplate");
        assert_eq!(record.kind, SymbolKind::INTERFACE);
    }

    #[test]
    fn test_bean_explicit_name_wins() {
        let record = build(
            &BeanSymbolProvider,
            BEAN_ANNOTATION,
            "@Bean(name = \"client\")",
            vec![("name", vec!["client", "alias"])],
            Some((DeclarationKind::Method, "restTemplate", Some("RestTemplate"))),
        )
        .unwrap();
        assert_eq!(record.name, "@+ 'client' RestTemplate");

        let record = build(
            &BeanSymbolProvider,
            BEAN_ANNOTATION,
            "@Bean(\"other\")",
            vec![("value", vec!["other"])],
            Some((DeclarationKind::Method, "restTemplate", Some("RestTemplate"))),
        )
        .unwrap();
        assert_eq!(record.name, "@+ 'other' RestTemplate");
    }

    #[test]
    fn test_bean_outside_method_yields_nothing() {
        assert!(build(
            &BeanSymbolProvider,
            BEAN_ANNOTATION,
            "@Bean",
            vec![],
            Some((DeclarationKind::Field, "template", Some("RestTemplate"))),
        )
        .is_none());
        assert!(build(&BeanSymbolProvider, BEAN_ANNOTATION, "@Bean", vec![], None).is_none());
    }

    #[test]
    fn test_component_default_name() {
        let record = build(
            &ComponentSymbolProvider,
            COMPONENT_ANNOTATIONS[1],
            "@Service",
            vec![],
            Some((DeclarationKind::Class, "GreetingService", None)),
        )
        .unwrap();
        assert_eq!(record.name, "@+ 'greetingService' (@Service) GreetingService");
    }

    #[test]
    fn test_component_explicit_value() {
        let record = build(
            &ComponentSymbolProvider,
            COMPONENT_ANNOTATIONS[4],
            "@RestController(\"api\")",
            vec![("value", vec!["api"])],
            Some((DeclarationKind::Class, "ApiController", None)),
        )
        .unwrap();
        assert_eq!(record.name, "@+ 'api' (@RestController) ApiController");
    }

    #[test]
    fn test_component_on_method_yields_nothing() {
        assert!(build(
            &ComponentSymbolProvider,
            COMPONENT_ANNOTATIONS[0],
            "@Component",
            vec![],
            Some((DeclarationKind::Method, "make", Some("Object"))),
        )
        .is_none());
    }

    #[test]
    fn test_decapitalize() {
        assert_eq!(decapitalize("FooService"), "fooService");
        assert_eq!(decapitalize("URLParser"), "URLParser");
        assert_eq!(decapitalize("A"), "a");
        assert_eq!(decapitalize("Émile"), "émile");
        assert_eq!(decapitalize(""), "");
    }
}
