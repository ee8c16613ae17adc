//
// config.rs
//
// Settings for workspace symbol queries
//

use std::num::NonZeroUsize;

/// Default namespaces whose annotations produce a symbol without a provider.
pub const DEFAULT_RESERVED_PREFIX: &str = "org.springframework";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolsConfig {
    /// Annotation namespaces handled by the default policy.
    pub reserved_prefixes: Vec<String>,
    /// File name that marks a project root.
    pub project_manifest: String,
    /// Extensions (without the dot) of source files to scan.
    pub source_extensions: Vec<String>,
    /// Parse pool size. Zero uses the available parallelism.
    pub scan_threads: usize,
    pub parse_timeout_ms: u64,
    pub max_file_size_bytes: u64,
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self {
            reserved_prefixes: vec![DEFAULT_RESERVED_PREFIX.to_string()],
            project_manifest: "classpath.json".to_string(),
            source_extensions: vec!["java".to_string()],
            scan_threads: 0,
            parse_timeout_ms: 5000,
            max_file_size_bytes: 2 * 1024 * 1024,
        }
    }
}

impl SymbolsConfig {
    /// Number of parse threads to use.
    pub fn effective_scan_threads(&self) -> usize {
        if self.scan_threads > 0 {
            return self.scan_threads;
        }
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }

    pub fn is_source_file(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.source_extensions.iter().any(|e| e == ext))
            .unwrap_or(false)
    }
}

/// Parse the `symbols` section from client settings.
///
/// Accepts either the full settings object (`{"sprig": {"symbols": {...}}}`)
/// or the `sprig` section itself. Missing or ill-typed values keep their
/// defaults; returns `None` when there is no `symbols` section at all.
pub fn parse_symbols_config(settings: &serde_json::Value) -> Option<SymbolsConfig> {
    let section = settings.get("sprig").unwrap_or(settings);
    let symbols = section.get("symbols")?;

    let mut config = SymbolsConfig::default();

    if let Some(v) = string_list(symbols.get("reservedPrefixes")) {
        config.reserved_prefixes = v;
    }
    if let Some(v) = symbols
        .get("projectManifest")
        .and_then(|v| v.as_str())
        .filter(|v| !v.trim().is_empty())
    {
        config.project_manifest = v.trim().to_string();
    }
    if let Some(v) = string_list(symbols.get("sourceExtensions")) {
        let extensions: Vec<String> = v
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect();
        if !extensions.is_empty() {
            config.source_extensions = extensions;
        }
    }
    if let Some(v) = symbols.get("scanThreads").and_then(|v| v.as_u64()) {
        config.scan_threads = v as usize;
    }
    if let Some(v) = symbols.get("parseTimeoutMs").and_then(|v| v.as_u64()) {
        config.parse_timeout_ms = v;
    }
    if let Some(v) = symbols.get("maxFileSizeBytes").and_then(|v| v.as_u64()) {
        config.max_file_size_bytes = v;
    }

    Some(config)
}

fn string_list(value: Option<&serde_json::Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::to_string)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = SymbolsConfig::default();
        assert_eq!(config.reserved_prefixes, vec!["org.springframework"]);
        assert_eq!(config.project_manifest, "classpath.json");
        assert_eq!(config.source_extensions, vec!["java"]);
        assert!(config.effective_scan_threads() >= 1);
    }

    #[test]
    fn test_no_symbols_section() {
        assert!(parse_symbols_config(&json!({})).is_none());
        assert!(parse_symbols_config(&json!({"sprig": {}})).is_none());
    }

    #[test]
    fn test_full_settings() {
        let config = parse_symbols_config(&json!({
            "sprig": {
                "symbols": {
                    "reservedPrefixes": ["org.springframework", "io.micronaut"],
                    "projectManifest": "sprig.json",
                    "sourceExtensions": [".java", "jav"],
                    "scanThreads": 3,
                    "parseTimeoutMs": 250,
                    "maxFileSizeBytes": 1024
                }
            }
        }))
        .unwrap();

        assert_eq!(config.reserved_prefixes, vec!["org.springframework", "io.micronaut"]);
        assert_eq!(config.project_manifest, "sprig.json");
        assert_eq!(config.source_extensions, vec!["java", "jav"]);
        assert_eq!(config.effective_scan_threads(), 3);
        assert_eq!(config.parse_timeout_ms, 250);
        assert_eq!(config.max_file_size_bytes, 1024);
    }

    #[test]
    fn test_section_without_wrapper_and_invalid_values() {
        let config = parse_symbols_config(&json!({
            "symbols": {
                "reservedPrefixes": [],
                "projectManifest": "  ",
                "sourceExtensions": [""],
                "scanThreads": "four",
                "parseTimeoutMs": -1
            }
        }))
        .unwrap();

        // An explicit empty list disables the default policy
        assert!(config.reserved_prefixes.is_empty());
        assert_eq!(config.project_manifest, "classpath.json");
        assert_eq!(config.source_extensions, vec!["java"]);
        assert_eq!(config.scan_threads, 0);
        assert_eq!(config.parse_timeout_ms, 5000);
    }

    #[test]
    fn test_is_source_file() {
        let config = SymbolsConfig::default();
        assert!(config.is_source_file(std::path::Path::new("/p/A.java")));
        assert!(!config.is_source_file(std::path::Path::new("/p/A.class")));
        assert!(!config.is_source_file(std::path::Path::new("/p/README")));
    }
}
