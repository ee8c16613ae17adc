// cli/symbols.rs — `sprig symbols` subcommand
//
// Runs one workspace symbol query against a directory and prints the result,
// without starting the language server. Useful for checking what a client
// would see and for timing scans (`SPRIG_PERF=1`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use crate::change_feed::{ChangeFeed, FileObserver};
use crate::config::SymbolsConfig;
use crate::handler::{ScanOutcome, ScanStatus, WorkspaceSymbolHandler};
use crate::project::ManifestProjectFinder;
use crate::scanner::ScanCounters;
use crate::symbols::{symbol_kind_label, SymbolRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolsArgs {
    pub path: PathBuf,
    pub json: bool,
    /// Replaces the default reserved prefixes when non-empty.
    pub reserved_prefixes: Vec<String>,
    pub threads: Option<usize>,
    pub manifest: Option<String>,
}

impl SymbolsArgs {
    pub fn config(&self) -> SymbolsConfig {
        let mut config = SymbolsConfig::default();
        if !self.reserved_prefixes.is_empty() {
            config.reserved_prefixes = self.reserved_prefixes.clone();
        }
        if let Some(threads) = self.threads {
            config.scan_threads = threads;
        }
        if let Some(manifest) = &self.manifest {
            config.project_manifest = manifest.clone();
        }
        config
    }
}

/// Parse `symbols` arguments from the remaining CLI args.
///
/// Expected usage:
/// `sprig symbols <path> [--json] [--reserved-prefix <p>]... [--threads <n>] [--manifest <name>]`
pub fn parse_args(args: &mut impl Iterator<Item = String>) -> Result<SymbolsArgs, String> {
    let mut path: Option<PathBuf> = None;
    let mut json = false;
    let mut reserved_prefixes = Vec::new();
    let mut threads = None;
    let mut manifest = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--reserved-prefix" => {
                let prefix = args
                    .next()
                    .ok_or_else(|| "--reserved-prefix requires a namespace".to_string())?;
                reserved_prefixes.push(prefix);
            }
            "--threads" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--threads requires a number".to_string())?;
                let n = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid thread count '{}'", value))?;
                threads = Some(n);
            }
            "--manifest" => {
                let name = args
                    .next()
                    .ok_or_else(|| "--manifest requires a file name".to_string())?;
                manifest = Some(name);
            }
            other if other.starts_with('-') => {
                return Err(format!("Unknown flag: '{}'", other));
            }
            _ => {
                if path.is_some() {
                    return Err("Multiple paths provided; expected exactly one".to_string());
                }
                path = Some(PathBuf::from(arg));
            }
        }
    }

    let path = path.ok_or_else(|| "Missing required <path> argument".to_string())?;
    if !path.is_dir() {
        return Err(format!("Not a directory: {}", path.display()));
    }

    Ok(SymbolsArgs {
        path,
        json,
        reserved_prefixes,
        threads,
        manifest,
    })
}

/// Run one query over `args.path`.
pub fn run_symbols(args: &SymbolsArgs) -> anyhow::Result<ScanOutcome> {
    let config = args.config();
    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", args.path.display()))?;

    let feed: Arc<dyn ChangeFeed> = Arc::new(FileObserver::new());
    let finder = Arc::new(ManifestProjectFinder::new(
        config.project_manifest.clone(),
        feed,
    ));
    let handler = WorkspaceSymbolHandler::with_defaults(finder, config);
    let outcome = handler.handle(&root)?;
    Ok(outcome)
}

/// `name<TAB>kind<TAB>path:line:col`, with the path relative to `root` when possible.
pub fn format_symbol_line(symbol: &SymbolRecord, root: &Path) -> String {
    let location = match symbol.uri.to_file_path() {
        Ok(path) => path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or(path)
            .display()
            .to_string(),
        Err(_) => symbol.uri.to_string(),
    };
    format!(
        "{}\t{}\t{}:{}:{}",
        symbol.name,
        symbol_kind_label(symbol.kind),
        location,
        symbol.range.start.line + 1,
        symbol.range.start.character + 1
    )
}

/// Symbols sorted by location, for stable output.
fn sorted_symbols(outcome: &ScanOutcome) -> Vec<&SymbolRecord> {
    let mut symbols: Vec<&SymbolRecord> = outcome.symbols.iter().collect();
    symbols.sort_by(|a, b| {
        (a.uri.as_str(), a.range.start.line, a.range.start.character, &a.name).cmp(&(
            b.uri.as_str(),
            b.range.start.line,
            b.range.start.character,
            &b.name,
        ))
    });
    symbols
}

/// Print symbols one per line, then a summary on stderr.
pub fn print_outcome(outcome: &ScanOutcome, root: &Path) {
    for symbol in sorted_symbols(outcome) {
        println!("{}", format_symbol_line(symbol, root));
    }
    for diagnostic in &outcome.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }
    let counters = &outcome.counters;
    eprintln!(
        "{} symbols from {} files in {} projects ({} files failed){}",
        counters.symbols,
        counters.files_scanned,
        counters.projects,
        counters.files_failed,
        if outcome.status == ScanStatus::Canceled {
            ", canceled"
        } else {
            ""
        }
    );
}

#[derive(Serialize)]
struct JsonOutcome<'a> {
    status: ScanStatus,
    symbols: Vec<&'a SymbolRecord>,
    diagnostics: Vec<String>,
    counters: ScanCounters,
}

pub fn outcome_to_json(outcome: &ScanOutcome) -> serde_json::Value {
    let json = JsonOutcome {
        status: outcome.status,
        symbols: sorted_symbols(outcome),
        diagnostics: outcome.diagnostics.iter().map(|d| d.to_string()).collect(),
        counters: outcome.counters,
    };
    serde_json::to_value(&json).unwrap_or(serde_json::Value::Null)
}

pub fn print_outcome_json(outcome: &ScanOutcome) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&outcome_to_json(outcome))?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::{Position, Range, SymbolKind, Url};

    fn args(list: &[&str]) -> Result<SymbolsArgs, String> {
        let mut iter = list.iter().map(|s| s.to_string());
        parse_args(&mut iter)
    }

    #[test]
    fn test_parse_args_basic() {
        let result = args(&["."]).unwrap();
        assert_eq!(result.path, PathBuf::from("."));
        assert!(!result.json);
        assert!(result.reserved_prefixes.is_empty());
        assert_eq!(result.config(), SymbolsConfig::default());
    }

    #[test]
    fn test_parse_args_all_flags() {
        let result = args(&[
            "--json",
            ".",
            "--reserved-prefix",
            "io.micronaut",
            "--reserved-prefix",
            "org.springframework",
            "--threads",
            "3",
            "--manifest",
            "sprig.json",
        ])
        .unwrap();
        assert!(result.json);
        let config = result.config();
        assert_eq!(
            config.reserved_prefixes,
            vec!["io.micronaut", "org.springframework"]
        );
        assert_eq!(config.scan_threads, 3);
        assert_eq!(config.project_manifest, "sprig.json");
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(args(&[]).unwrap_err().contains("Missing required <path>"));
        assert!(args(&[".", "--threads", "many"])
            .unwrap_err()
            .contains("Invalid thread count"));
        assert!(args(&[".", "--reserved-prefix"]).is_err());
        assert!(args(&[".", "--bogus"]).unwrap_err().contains("Unknown flag"));
        assert!(args(&[".", "."]).unwrap_err().contains("Multiple paths"));
        assert!(args(&["/definitely/not/here"])
            .unwrap_err()
            .contains("Not a directory"));
    }

    #[test]
    fn test_format_symbol_line() {
        let root = std::env::temp_dir().join("ws");
        let file = root.join("app").join("A.java");
        let symbol = SymbolRecord::new(
            "@/hello -- GET",
            SymbolKind::METHOD,
            Url::from_file_path(&file).unwrap(),
            Range::new(Position::new(4, 2), Position::new(4, 20)),
        );
        let expected = format!(
            "@/hello -- GET\tmethod\t{}:5:3",
            Path::new("app").join("A.java").display()
        );
        assert_eq!(format_symbol_line(&symbol, &root), expected);
    }

    #[test]
    fn test_json_outcome_shape() {
        let outcome = ScanOutcome {
            symbols: vec![SymbolRecord::new(
                "@Bean",
                SymbolKind::INTERFACE,
                Url::parse("file:///w/A.java").unwrap(),
                Range::default(),
            )],
            status: ScanStatus::Complete,
            diagnostics: Vec::new(),
            counters: ScanCounters {
                symbols: 1,
                ..ScanCounters::default()
            },
        };
        let json = outcome_to_json(&outcome);
        assert_eq!(json["status"], "complete");
        assert_eq!(json["symbols"][0]["name"], "@Bean");
        assert_eq!(json["symbols"][0]["kind"], "interface");
        assert_eq!(json["counters"]["symbols"], 1);
        assert_eq!(json["counters"]["filesScanned"], 0);
    }
}
