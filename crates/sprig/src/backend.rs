//
// backend.rs
//
// Language server exposing workspace symbols and feeding artifact changes
// into the type indexes
//

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::Client;
use tower_lsp::LanguageServer;
use tower_lsp::LspService;
use tower_lsp::Server;

use crate::change_feed::{ChangeDispatcher, ChangeEvent, ChangeFeed, ChangeKind, FileObserver, FsWatcher};
use crate::config::{parse_symbols_config, SymbolsConfig};
use crate::handler::{ScanStatus, WorkspaceSymbolHandler};
use crate::project::ManifestProjectFinder;

const WATCHER_REGISTRATION_ID: &str = "sprig/watchedArtifacts";

/// Query-side state, replaced as a whole when configuration changes.
struct ServerState {
    workspace_folders: Vec<Url>,
    config: SymbolsConfig,
    handler: Arc<WorkspaceSymbolHandler>,
    dynamic_watchers: bool,
}

impl ServerState {
    fn new(config: SymbolsConfig, feed: Arc<dyn ChangeFeed>) -> Self {
        Self {
            workspace_folders: Vec::new(),
            handler: Arc::new(build_handler(&config, feed)),
            config,
            dynamic_watchers: false,
        }
    }

    fn workspace_roots(&self) -> Vec<PathBuf> {
        self.workspace_folders
            .iter()
            .filter_map(|uri| uri.to_file_path().ok())
            .collect()
    }
}

fn build_handler(config: &SymbolsConfig, feed: Arc<dyn ChangeFeed>) -> WorkspaceSymbolHandler {
    let finder = Arc::new(ManifestProjectFinder::new(
        config.project_manifest.clone(),
        feed,
    ));
    WorkspaceSymbolHandler::with_defaults(finder, config.clone())
}

pub struct Backend {
    client: Client,
    state: Arc<RwLock<ServerState>>,
    observer: FileObserver,
    dispatcher: ChangeDispatcher,
    watcher: Mutex<Option<FsWatcher>>,
    shutdown: CancellationToken,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        let observer = FileObserver::new();
        let feed: Arc<dyn ChangeFeed> = Arc::new(observer.clone());
        let state = ServerState::new(SymbolsConfig::default(), feed);
        Self {
            client,
            state: Arc::new(RwLock::new(state)),
            dispatcher: ChangeDispatcher::new(observer.clone()),
            observer,
            watcher: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    fn feed(&self) -> Arc<dyn ChangeFeed> {
        Arc::new(self.observer.clone())
    }

    /// Watch workspace folders ourselves when the client cannot.
    fn start_fs_watcher(&self, roots: &[PathBuf]) {
        let mut watcher = match FsWatcher::new(self.dispatcher.sender()) {
            Ok(watcher) => watcher,
            Err(e) => {
                log::warn!("Filesystem watching unavailable, type indexes will not refresh: {}", e);
                return;
            }
        };
        for root in roots {
            if let Err(e) = watcher.watch(root) {
                log::warn!("{}", e);
            }
        }
        if let Ok(mut guard) = self.watcher.lock() {
            *guard = Some(watcher);
        }
    }
}

/// Client-side watchers for compiled artifacts. Deletions of any path are
/// requested so removed output folders reach the index.
pub fn artifact_watchers() -> DidChangeWatchedFilesRegistrationOptions {
    let artifact = |pattern: &str| FileSystemWatcher {
        glob_pattern: GlobPattern::String(pattern.to_string()),
        kind: None,
    };
    DidChangeWatchedFilesRegistrationOptions {
        watchers: vec![
            artifact("**/*.class"),
            artifact("**/*.jar"),
            artifact("**/*.zip"),
            FileSystemWatcher {
                glob_pattern: GlobPattern::String("**/*".to_string()),
                kind: Some(WatchKind::Delete),
            },
        ],
    }
}

/// Convert a watched-files notification into change events, in order.
pub fn watched_file_events(params: &DidChangeWatchedFilesParams) -> Vec<ChangeEvent> {
    params
        .changes
        .iter()
        .filter_map(|change| {
            let kind = match change.typ {
                FileChangeType::CREATED => ChangeKind::Created,
                FileChangeType::CHANGED => ChangeKind::Changed,
                FileChangeType::DELETED => ChangeKind::Deleted,
                _ => return None,
            };
            Some(ChangeEvent::new(kind, change.uri.clone()))
        })
        .collect()
}

fn supports_dynamic_watchers(capabilities: &ClientCapabilities) -> bool {
    capabilities
        .workspace
        .as_ref()
        .and_then(|w| w.did_change_watched_files.as_ref())
        .and_then(|d| d.dynamic_registration)
        .unwrap_or(false)
}

fn internal_error(message: impl Into<String>) -> Error {
    let message: String = message.into();
    let mut error = Error::internal_error();
    error.message = message.into();
    error
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        log::info!("Initializing sprig");

        let mut state = self.state.write().await;

        if let Some(folders) = params.workspace_folders {
            for folder in folders {
                log::info!("Adding workspace folder: {}", folder.uri);
                state.workspace_folders.push(folder.uri);
            }
        } else if let Some(root_uri) = params.root_uri {
            log::info!("Adding root URI as workspace folder: {}", root_uri);
            state.workspace_folders.push(root_uri);
        }

        if let Some(config) = params
            .initialization_options
            .as_ref()
            .and_then(parse_symbols_config)
        {
            log::info!("Using symbols configuration from initialization options");
            state.handler = Arc::new(build_handler(&config, self.feed()));
            state.config = config;
        }
        state.dynamic_watchers = supports_dynamic_watchers(&params.capabilities);

        drop(state);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                workspace_symbol_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: String::from("sprig"),
                version: Some(String::from(env!("CARGO_PKG_VERSION"))),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        log::info!("sprig initialized");

        let (dynamic_watchers, roots) = {
            let state = self.state.read().await;
            (state.dynamic_watchers, state.workspace_roots())
        };

        if dynamic_watchers {
            let registration = Registration {
                id: WATCHER_REGISTRATION_ID.to_string(),
                method: "workspace/didChangeWatchedFiles".to_string(),
                register_options: serde_json::to_value(artifact_watchers()).ok(),
            };
            match self.client.register_capability(vec![registration]).await {
                Ok(()) => {
                    log::info!("Registered client-side watchers for compiled artifacts");
                    return;
                }
                Err(e) => log::warn!("Watcher registration failed, watching locally: {}", e),
            }
        }

        self.start_fs_watcher(&roots);
    }

    async fn shutdown(&self) -> Result<()> {
        log::info!("sprig shutting down");
        self.shutdown.cancel();
        self.dispatcher.shutdown();
        if let Ok(mut guard) = self.watcher.lock() {
            guard.take();
        }
        Ok(())
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let Some(config) = parse_symbols_config(&params.settings) else {
            log::trace!("No symbols section in settings, keeping current configuration");
            return;
        };

        let mut state = self.state.write().await;
        if state.config == config {
            return;
        }
        log::info!("Symbols configuration changed");
        state.handler = Arc::new(build_handler(&config, self.feed()));
        state.config = config;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        log::trace!(
            "Received watched files change: {} changes",
            params.changes.len()
        );
        self.dispatcher.submit(watched_file_events(&params));
    }

    async fn symbol(
        &self,
        params: WorkspaceSymbolParams,
    ) -> Result<Option<Vec<SymbolInformation>>> {
        let (handler, roots) = {
            let state = self.state.read().await;
            (state.handler.clone(), state.workspace_roots())
        };
        if roots.is_empty() {
            return Ok(Some(Vec::new()));
        }
        log::trace!("workspace/symbol query '{}'", params.query);

        // Dropping this future (client cancellation) cancels the scan
        let token = self.shutdown.child_token();
        let _cancel_on_drop = token.clone().drop_guard();

        let scan = tokio::task::spawn_blocking(move || {
            let mut symbols = Vec::new();
            for root in roots {
                let outcome = handler.handle_with_cancellation(&root, token.clone())?;
                symbols.extend(outcome.symbols.iter().map(|s| s.to_symbol_information()));
                if outcome.status == ScanStatus::Canceled {
                    break;
                }
            }
            Ok::<_, crate::error::QueryError>(symbols)
        })
        .await;

        match scan {
            Ok(Ok(symbols)) => Ok(Some(symbols)),
            Ok(Err(e)) => {
                log::error!("workspace/symbol failed: {}", e);
                Err(internal_error(e.to_string()))
            }
            Err(e) => {
                log::error!("workspace/symbol task failed: {}", e);
                Err(internal_error(e.to_string()))
            }
        }
    }
}

pub async fn start_lsp() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_watched_file_events_keep_order_and_kind() {
        let params = DidChangeWatchedFilesParams {
            changes: vec![
                FileEvent::new(
                    Url::parse("file:///p/out/demo/Hello.class").unwrap(),
                    FileChangeType::CREATED,
                ),
                FileEvent::new(
                    Url::parse("file:///p/out/demo/Hello.class").unwrap(),
                    FileChangeType::CHANGED,
                ),
                FileEvent::new(
                    Url::parse("file:///p/out/demo").unwrap(),
                    FileChangeType::DELETED,
                ),
            ],
        };
        let events = watched_file_events(&params);
        let kinds: Vec<ChangeKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Created, ChangeKind::Changed, ChangeKind::Deleted]
        );
        assert_eq!(events[2].uri.as_str(), "file:///p/out/demo");
    }

    #[test]
    fn test_artifact_watchers_registration_options() {
        let value = serde_json::to_value(artifact_watchers()).unwrap();
        let watchers = value["watchers"].as_array().unwrap();
        assert_eq!(watchers.len(), 4);
        assert_eq!(watchers[0]["globPattern"], json!("**/*.class"));
        assert_eq!(watchers[3]["kind"], json!(4));
    }

    #[test]
    fn test_dynamic_watcher_capability_detection() {
        assert!(!supports_dynamic_watchers(&ClientCapabilities::default()));

        let capabilities = ClientCapabilities {
            workspace: Some(WorkspaceClientCapabilities {
                did_change_watched_files: Some(DidChangeWatchedFilesClientCapabilities {
                    dynamic_registration: Some(true),
                    relative_pattern_support: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(supports_dynamic_watchers(&capabilities));
    }

    #[test]
    fn test_internal_error_carries_message() {
        let error = internal_error("cannot enumerate workspace root /w");
        assert_eq!(error.code, tower_lsp::jsonrpc::ErrorCode::InternalError);
        assert_eq!(error.message, "cannot enumerate workspace root /w");
    }
}
