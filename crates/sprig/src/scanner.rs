//
// scanner.rs
//
// Full-workspace annotation scan: project discovery, parallel parsing and
// provider dispatch into a per-query accumulator
//

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::SymbolKind;
use walkdir::WalkDir;

use crate::config::SymbolsConfig;
use crate::error::{Diagnostic, ProviderError, QueryError};
use crate::front_end::{Annotation, CompilationUnit, SourceFrontEnd};
use crate::perf::TimingGuard;
use crate::project::{Project, ProjectFinder};
use crate::providers::SymbolProviderRegistry;
use crate::symbols::{AnnotationSite, SymbolRecord};

/// Version-control metadata never holds projects or sources.
const SKIPPED_DIRECTORIES: &[&str] = &[".git", ".hg", ".svn"];

fn is_skipped_directory(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && SKIPPED_DIRECTORIES
            .iter()
            .any(|skipped| entry.file_name() == *skipped)
}

// ============================================================================
// Per-query state
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCounters {
    pub projects: usize,
    pub files_scanned: usize,
    pub files_failed: usize,
    pub annotation_sites: usize,
    pub symbols: usize,
}

/// Accumulator for one query. Never shared between queries.
pub struct ScanState {
    symbols: Mutex<Vec<SymbolRecord>>,
    diagnostics: Mutex<Vec<Diagnostic>>,
    projects: AtomicUsize,
    files_scanned: AtomicUsize,
    files_failed: AtomicUsize,
    annotation_sites: AtomicUsize,
    cancel: CancellationToken,
}

impl ScanState {
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            symbols: Mutex::new(Vec::new()),
            diagnostics: Mutex::new(Vec::new()),
            projects: AtomicUsize::new(0),
            files_scanned: AtomicUsize::new(0),
            files_failed: AtomicUsize::new(0),
            annotation_sites: AtomicUsize::new(0),
            cancel,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn push_symbol(&self, symbol: SymbolRecord) {
        if let Ok(mut guard) = self.symbols.lock() {
            guard.push(symbol);
        }
    }

    pub fn record(&self, diagnostic: Diagnostic) {
        if let Ok(mut guard) = self.diagnostics.lock() {
            guard.push(diagnostic);
        }
    }

    pub fn counters(&self) -> ScanCounters {
        ScanCounters {
            projects: self.projects.load(Ordering::Relaxed),
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            annotation_sites: self.annotation_sites.load(Ordering::Relaxed),
            symbols: self.symbols.lock().map(|g| g.len()).unwrap_or(0),
        }
    }

    /// Consume the state, returning symbols, diagnostics and counters.
    pub fn into_parts(self) -> (Vec<SymbolRecord>, Vec<Diagnostic>, ScanCounters) {
        let counters = self.counters();
        let symbols = self.symbols.into_inner().unwrap_or_default();
        let diagnostics = self.diagnostics.into_inner().unwrap_or_default();
        (symbols, diagnostics, counters)
    }
}

impl Default for ScanState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Scanner
// ============================================================================

/// What the workspace walk does with one directory.
enum Visit {
    Project(Arc<Project>),
    Descend,
    Skip(Option<Diagnostic>),
}

pub struct AnnotationScanner {
    finder: Arc<dyn ProjectFinder>,
    front_end: Arc<dyn SourceFrontEnd>,
    providers: Arc<SymbolProviderRegistry>,
    config: SymbolsConfig,
    pool: Option<rayon::ThreadPool>,
}

impl AnnotationScanner {
    pub fn new(
        finder: Arc<dyn ProjectFinder>,
        front_end: Arc<dyn SourceFrontEnd>,
        providers: Arc<SymbolProviderRegistry>,
        config: SymbolsConfig,
    ) -> Self {
        let threads = config.effective_scan_threads();
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("sprig-scan-{}", i))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!("Failed to build scan pool, parsing sequentially: {}", e);
                None
            }
        };
        Self {
            finder,
            front_end,
            providers,
            config,
            pool,
        }
    }

    pub fn config(&self) -> &SymbolsConfig {
        &self.config
    }

    pub fn providers(&self) -> &SymbolProviderRegistry {
        &self.providers
    }

    /// Walk `root` and fill `state`. Only an unreadable root is an error.
    pub fn scan(&self, root: &Path, state: &ScanState) -> Result<(), QueryError> {
        let _guard = TimingGuard::new("scan");
        let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            if state.is_canceled() {
                log::info!("Scan of {} canceled", root.display());
                break;
            }

            match self.visit(&dir) {
                Visit::Project(project) => {
                    state.projects.fetch_add(1, Ordering::Relaxed);
                    self.scan_project(&project, state);
                }
                Visit::Skip(diagnostic) => {
                    if let Some(diagnostic) = diagnostic {
                        log::warn!("{}", diagnostic);
                        state.record(diagnostic);
                    }
                }
                Visit::Descend => {
                    let entries = match fs::read_dir(&dir) {
                        Ok(entries) => entries,
                        Err(source) if dir == root => {
                            return Err(QueryError::WorkspaceRoot {
                                path: dir,
                                source,
                            });
                        }
                        Err(e) => {
                            let diagnostic = Diagnostic::DirectoryWalk {
                                path: dir.clone(),
                                message: e.to_string(),
                            };
                            log::warn!("{}", diagnostic);
                            state.record(diagnostic);
                            continue;
                        }
                    };

                    let mut children: Vec<PathBuf> = entries
                        .flatten()
                        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
                        .filter(|entry| {
                            !SKIPPED_DIRECTORIES
                                .iter()
                                .any(|skipped| entry.file_name() == *skipped)
                        })
                        .map(|entry| entry.path())
                        .collect();
                    // Reverse-sorted so the stack pops in name order
                    children.sort_unstable_by(|a, b| b.cmp(a));
                    stack.extend(children);
                }
            }
        }

        let counters = state.counters();
        log::info!(
            "Scanned {}: {} projects, {} files ({} failed), {} annotation sites, {} symbols",
            root.display(),
            counters.projects,
            counters.files_scanned,
            counters.files_failed,
            counters.annotation_sites,
            counters.symbols
        );
        Ok(())
    }

    fn visit(&self, dir: &Path) -> Visit {
        if !self.finder.is_project_root(dir) {
            return Visit::Descend;
        }
        match self.finder.resolve(dir) {
            Ok(Some(project)) => Visit::Project(project),
            Ok(None) => {
                log::trace!("{} is not a project after all, skipping", dir.display());
                Visit::Skip(None)
            }
            Err(e) => Visit::Skip(Some(Diagnostic::ProjectResolution {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })),
        }
    }

    /// Source files under the project root plus any source folders that lie
    /// outside it, sorted and unique.
    fn source_files(&self, project: &Project, state: &ScanState) -> Vec<PathBuf> {
        let roots = std::iter::once(project.root()).chain(
            project
                .classpath()
                .source_dirs()
                .filter(|dir| !dir.starts_with(project.root())),
        );

        let mut files = Vec::new();
        for root in roots {
            if !root.is_dir() {
                log::trace!("Source folder {} does not exist", root.display());
                continue;
            }
            let walker = WalkDir::new(root)
                .follow_links(false)
                .into_iter()
                .filter_entry(|entry| !(entry.depth() > 0 && is_skipped_directory(entry)));
            for entry in walker {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file() && self.config.is_source_file(entry.path())
                        {
                            files.push(entry.into_path());
                        }
                    }
                    Err(e) => {
                        let path = e
                            .path()
                            .map(Path::to_path_buf)
                            .unwrap_or_else(|| root.to_path_buf());
                        let diagnostic = Diagnostic::DirectoryWalk {
                            path,
                            message: e.to_string(),
                        };
                        log::warn!("{}", diagnostic);
                        state.record(diagnostic);
                    }
                }
            }
        }
        files.sort_unstable();
        files.dedup();
        files
    }

    fn scan_project(&self, project: &Project, state: &ScanState) {
        let files = self.source_files(project, state);
        log::info!(
            "Scanning project '{}' ({} source files)",
            project.name(),
            files.len()
        );

        let visit_file = |path: &PathBuf| {
            if state.is_canceled() {
                return;
            }
            self.scan_file(project, path, state);
        };

        match &self.pool {
            Some(pool) => pool.install(|| files.par_iter().for_each(visit_file)),
            None => files.iter().for_each(visit_file),
        }
    }

    fn scan_file(&self, project: &Project, path: &Path, state: &ScanState) {
        state.files_scanned.fetch_add(1, Ordering::Relaxed);
        let unit = match self.front_end.parse(path, project.classpath()) {
            Ok(unit) => unit,
            Err(e) => {
                state.files_failed.fetch_add(1, Ordering::Relaxed);
                let diagnostic = Diagnostic::SourceParse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                };
                log::warn!("{}", diagnostic);
                state.record(diagnostic);
                return;
            }
        };
        log::trace!(
            "Parsed {} ({} annotations{})",
            path.display(),
            unit.annotations.len(),
            if unit.has_errors { ", with syntax errors" } else { "" }
        );

        for annotation in &unit.annotations {
            state.annotation_sites.fetch_add(1, Ordering::Relaxed);
            self.dispatch(&unit, annotation, state);
        }
    }

    fn dispatch(&self, unit: &CompilationUnit, annotation: &Annotation, state: &ScanState) {
        let Some(qualified_name) = annotation.qualified_name() else {
            log::trace!(
                "Unresolved annotation @{} in {}",
                annotation.written_name,
                unit.uri()
            );
            state.record(Diagnostic::BindingResolution {
                uri: unit.uri().clone(),
                annotation: annotation.written_name.clone(),
            });
            return;
        };
        let site = AnnotationSite::new(&unit.document, qualified_name, annotation);

        if let Some(provider) = self.providers.lookup(qualified_name) {
            let result =
                panic::catch_unwind(AssertUnwindSafe(|| provider.build_symbol(&site, &unit.document)))
                    .unwrap_or_else(|payload| Err(ProviderError::Panicked(panic_message(payload.as_ref()))));
            match result {
                Ok(Some(symbol)) => state.push_symbol(symbol),
                Ok(None) => {}
                Err(e) => {
                    let diagnostic = Diagnostic::ProviderFailure {
                        uri: unit.uri().clone(),
                        annotation: qualified_name.to_string(),
                        message: e.to_string(),
                    };
                    log::warn!("{}", diagnostic);
                    state.record(diagnostic);
                }
            }
            return;
        }

        if is_reserved(qualified_name, &self.config.reserved_prefixes) {
            state.push_symbol(SymbolRecord::at_site(
                site.raw_text(),
                SymbolKind::INTERFACE,
                &site,
            ));
        }
    }
}

/// True when `name` equals a prefix or lies in its namespace.
pub fn is_reserved(name: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        name.strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
