//
// handler.rs
//
// Query façade: one fresh scan state per workspace symbol query
//

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::SymbolsConfig;
use crate::error::{Diagnostic, QueryError};
use crate::front_end::{JavaFrontEnd, SourceFrontEnd};
use crate::project::ProjectFinder;
use crate::providers::SymbolProviderRegistry;
use crate::scanner::{AnnotationScanner, ScanCounters, ScanState};
use crate::symbols::SymbolRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Complete,
    Canceled,
}

/// Result of one query. `symbols` is unordered and may hold duplicates.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub symbols: Vec<SymbolRecord>,
    pub status: ScanStatus,
    pub diagnostics: Vec<Diagnostic>,
    pub counters: ScanCounters,
}

pub struct WorkspaceSymbolHandler {
    scanner: AnnotationScanner,
}

impl WorkspaceSymbolHandler {
    pub fn new(scanner: AnnotationScanner) -> Self {
        Self { scanner }
    }

    /// Handler with the Java front-end and built-in providers.
    pub fn with_defaults(finder: Arc<dyn ProjectFinder>, config: SymbolsConfig) -> Self {
        let front_end: Arc<dyn SourceFrontEnd> = Arc::new(JavaFrontEnd::from_config(&config));
        let providers = Arc::new(SymbolProviderRegistry::with_builtin_providers());
        Self::new(AnnotationScanner::new(finder, front_end, providers, config))
    }

    pub fn config(&self) -> &SymbolsConfig {
        self.scanner.config()
    }

    pub fn handle(&self, root: &Path) -> Result<ScanOutcome, QueryError> {
        self.handle_with_cancellation(root, CancellationToken::new())
    }

    /// Scan `root`. When `cancel` fires mid-scan the symbols gathered so far
    /// come back with status `Canceled`.
    pub fn handle_with_cancellation(
        &self,
        root: &Path,
        cancel: CancellationToken,
    ) -> Result<ScanOutcome, QueryError> {
        let state = ScanState::with_cancellation(cancel);
        self.scanner.scan(root, &state)?;

        let status = if state.is_canceled() {
            ScanStatus::Canceled
        } else {
            ScanStatus::Complete
        };
        let (symbols, diagnostics, counters) = state.into_parts();
        Ok(ScanOutcome {
            symbols,
            status,
            diagnostics,
            counters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_feed::{ChangeFeed, FileObserver};
    use crate::project::ManifestProjectFinder;
    use std::fs;
    use tempfile::TempDir;

    fn handler() -> WorkspaceSymbolHandler {
        let feed: Arc<dyn ChangeFeed> = Arc::new(FileObserver::new());
        let finder = Arc::new(ManifestProjectFinder::new("classpath.json", feed));
        WorkspaceSymbolHandler::with_defaults(finder, SymbolsConfig::default())
    }

    #[test]
    fn test_empty_workspace_completes() {
        let dir = TempDir::new().unwrap();
        let outcome = handler().handle(dir.path()).unwrap();
        assert!(outcome.symbols.is_empty());
        assert_eq!(outcome.status, ScanStatus::Complete);
        assert_eq!(outcome.counters, ScanCounters::default());
    }

    #[test]
    fn test_canceled_token_reports_canceled() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("classpath.json"), r#"{"entries": []}"#).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let outcome = handler()
            .handle_with_cancellation(dir.path(), token)
            .unwrap();
        assert_eq!(outcome.status, ScanStatus::Canceled);
        assert_eq!(outcome.counters.projects, 0);
    }

    #[test]
    fn test_unreadable_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "not a directory").unwrap();
        assert!(handler().handle(&file).is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ScanStatus::Canceled).unwrap(),
            serde_json::json!("canceled")
        );
    }
}
