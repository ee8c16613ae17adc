//
// type_index/mod.rs
//
// Per-classpath index of compiled types, kept current by the change feed
//
// One sub-index per classpath entry. Lookups walk the sub-indexes in entry
// order and the first hit wins; duplicates across entries are kept apart and
// never merged.
//

mod archive;
mod sub_index;


use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::change_feed::{ChangeFeed, Subscription};
use crate::classfile::{ParsedClass, TypeKind};
use crate::classpath::ClasspathEntry;
use crate::error::{ArtifactError, Diagnostic};
use crate::perf::TimingGuard;

use sub_index::SubIndex;

pub(crate) use sub_index::derive_type_name;

/// Maximum number of artifact diagnostics retained per index.
const MAX_RECENT_DIAGNOSTICS: usize = 64;

/// Descriptor of one compiled type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRecord {
    /// Binary name derived from the artifact path; nested types keep `$`.
    pub name: String,
    pub kind: TypeKind,
    pub access_flags: u16,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    /// Class file path, or `<archive>!/<entry>` for archive members.
    pub origin: PathBuf,
}

impl TypeRecord {
    pub(crate) fn from_parsed(name: String, parsed: ParsedClass, origin: PathBuf) -> Self {
        Self {
            name,
            kind: parsed.kind,
            access_flags: parsed.access_flags,
            super_name: parsed.super_name,
            interfaces: parsed.interfaces,
            origin,
        }
    }

    /// Name as written in source: `demo.Outer$Inner` → `demo.Outer.Inner`.
    pub fn qualified_name(&self) -> String {
        self.name.replace('$', ".")
    }

    pub fn simple_name(&self) -> &str {
        self.name
            .rsplit(|c| c == '.' || c == '$')
            .next()
            .unwrap_or(&self.name)
    }

    pub fn is_annotation(&self) -> bool {
        self.kind == TypeKind::Annotation
    }
}

/// Point-in-time copy of the index counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeIndexMetrics {
    pub lookups: u64,
    pub hits: u64,
    pub artifacts_indexed: u64,
    pub artifact_errors: u64,
    pub events_applied: u64,
    pub events_ignored: u64,
}

#[derive(Debug, Default)]
pub(crate) struct IndexCounters {
    lookups: AtomicU64,
    hits: AtomicU64,
    artifacts_indexed: AtomicU64,
    artifact_errors: AtomicU64,
    events_applied: AtomicU64,
    events_ignored: AtomicU64,
}

impl IndexCounters {
    pub(crate) fn record_indexed(&self, count: usize) {
        self.artifacts_indexed
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_event_applied(&self) {
        self.events_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_event_ignored(&self) {
        self.events_ignored.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TypeIndexMetrics {
        TypeIndexMetrics {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            artifacts_indexed: self.artifacts_indexed.load(Ordering::Relaxed),
            artifact_errors: self.artifact_errors.load(Ordering::Relaxed),
            events_applied: self.events_applied.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
        }
    }
}

/// State shared by all sub-indexes of one index.
#[derive(Debug, Default)]
pub(crate) struct IndexShared {
    pub(crate) counters: IndexCounters,
    diagnostics: Mutex<VecDeque<Diagnostic>>,
}

impl IndexShared {
    pub(crate) fn report(&self, error: &ArtifactError) {
        log::warn!("Skipping artifact: {}", error);
        self.counters.artifact_errors.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            if diagnostics.len() == MAX_RECENT_DIAGNOSTICS {
                diagnostics.pop_front();
            }
            diagnostics.push_back(Diagnostic::artifact(error));
        }
    }
}

pub struct TypeIndex {
    sub_indexes: Vec<Arc<SubIndex>>,
    shared: Arc<IndexShared>,
    // Dropped with the index, which unsubscribes every sub-index
    _subscriptions: Vec<Subscription>,
}

impl TypeIndex {
    /// Build the index for `entries`. Each sub-index subscribes before it
    /// indexes the disk, so no event between the two is lost.
    pub fn new(entries: Vec<ClasspathEntry>, feed: &dyn ChangeFeed) -> Self {
        let _guard = TimingGuard::with_threshold("type_index_build", 1000);
        let shared = Arc::new(IndexShared::default());
        let mut sub_indexes = Vec::with_capacity(entries.len());
        let mut subscriptions = Vec::with_capacity(entries.len());

        for entry in entries {
            let sub_index = Arc::new(SubIndex::new(entry, shared.clone()));
            let watched = sub_index.entry().watched_path().to_path_buf();
            subscriptions.push(feed.subscribe(&watched, sub_index.clone()));
            sub_index.load();
            sub_indexes.push(sub_index);
        }

        log::info!(
            "Type index ready: {} entr{}, {} type(s)",
            sub_indexes.len(),
            if sub_indexes.len() == 1 { "y" } else { "ies" },
            sub_indexes.iter().map(|s| s.len()).sum::<usize>()
        );

        Self {
            sub_indexes,
            shared,
            _subscriptions: subscriptions,
        }
    }

    /// Look up a binary name. The first entry in classpath order wins.
    pub fn find_type(&self, name: &str) -> Option<Arc<TypeRecord>> {
        self.shared.counters.lookups.fetch_add(1, Ordering::Relaxed);
        let found = self.sub_indexes.iter().find_map(|sub| sub.get(name));
        if found.is_some() {
            self.shared.counters.hits.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Look up a name written with dots only (`a.Outer.Inner`), trying the
    /// nesting interpretations from outermost package to innermost.
    pub fn find_source_type(&self, qualified: &str) -> Option<Arc<TypeRecord>> {
        nesting_candidates(qualified).find_map(|candidate| self.find_type(&candidate))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sub_indexes.iter().any(|sub| sub.get(name).is_some())
    }

    /// Number of records across all sub-indexes, duplicates included.
    pub fn len(&self) -> usize {
        self.sub_indexes.iter().map(|sub| sub.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> impl Iterator<Item = &ClasspathEntry> {
        self.sub_indexes.iter().map(|sub| sub.entry())
    }

    /// Names held by the sub-index of the entry at `position`.
    pub fn entry_type_names(&self, position: usize) -> Vec<String> {
        self.sub_indexes
            .get(position)
            .map(|sub| sub.names())
            .unwrap_or_default()
    }

    pub fn recent_diagnostics(&self) -> Vec<Diagnostic> {
        self.shared
            .diagnostics
            .lock()
            .map(|diagnostics| diagnostics.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn metrics(&self) -> TypeIndexMetrics {
        self.shared.counters.snapshot()
    }
}

/// `a.b.Outer.Inner` → `a.b.Outer.Inner`, `a.b.Outer$Inner`, `a.b$Outer$Inner`, `a$b$Outer$Inner`.
fn nesting_candidates(qualified: &str) -> impl Iterator<Item = String> + '_ {
    let segments: Vec<&str> = qualified.split('.').collect();
    let count = segments.len();
    (1..=count).rev().map(move |split| {
        let outer = segments[..split].join(".");
        if split == count {
            outer
        } else {
            format!("{}${}", outer, segments[split..].join("$"))
        }
    })
}
