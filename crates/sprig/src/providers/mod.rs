//
// providers/mod.rs
//
// Symbol providers keyed by qualified annotation type name
//

mod bean;
mod request_mapping;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::document::TextDocument;
use crate::error::ProviderError;
use crate::symbols::{AnnotationSite, SymbolRecord};

pub use bean::{BeanSymbolProvider, ComponentSymbolProvider, BEAN_ANNOTATION, COMPONENT_ANNOTATIONS};
pub use request_mapping::{RequestMappingSymbolProvider, REQUEST_MAPPING_ANNOTATIONS};

/// Turns one annotation site into at most one symbol.
pub trait SymbolProvider: Send + Sync {
    fn build_symbol(
        &self,
        site: &AnnotationSite<'_>,
        document: &TextDocument,
    ) -> Result<Option<SymbolRecord>, ProviderError>;
}

/// Registered providers in registration order.
#[derive(Clone, Default)]
pub struct SymbolProviderRegistry {
    providers: IndexMap<String, Arc<dyn SymbolProvider>>,
}

impl SymbolProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the request-mapping, bean and component providers.
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();

        let mapping: Arc<dyn SymbolProvider> = Arc::new(RequestMappingSymbolProvider);
        for name in REQUEST_MAPPING_ANNOTATIONS {
            registry.register(name, mapping.clone());
        }

        registry.register(BEAN_ANNOTATION, Arc::new(BeanSymbolProvider));

        let component: Arc<dyn SymbolProvider> = Arc::new(ComponentSymbolProvider);
        for name in COMPONENT_ANNOTATIONS {
            registry.register(name, component.clone());
        }

        registry
    }

    /// Register `provider` for `qualified_name`, returning the one it replaces.
    pub fn register(
        &mut self,
        qualified_name: impl Into<String>,
        provider: Arc<dyn SymbolProvider>,
    ) -> Option<Arc<dyn SymbolProvider>> {
        self.providers.insert(qualified_name.into(), provider)
    }

    pub fn unregister(&mut self, qualified_name: &str) -> Option<Arc<dyn SymbolProvider>> {
        self.providers.shift_remove(qualified_name)
    }

    pub fn lookup(&self, qualified_name: &str) -> Option<&Arc<dyn SymbolProvider>> {
        self.providers.get(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn annotation_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for SymbolProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolProviderRegistry")
            .field("annotations", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}
