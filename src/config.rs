//! Analyzer configuration.
//!
//! All detector heuristics (thresholds, complexity weights, allow-lists)
//! are explicit data passed into detector constructors so tests and
//! users can substitute their own tables. The defaults preserve the
//! hand-tuned values the heuristics were shipped with; they were never
//! derived from measurement and should be treated as configuration, not
//! truth.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub detectors: DetectorConfig,
    #[serde(default)]
    pub fixes: FixConfig,
}

impl AnalyzerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.detectors.simple_loop_threshold == 0 {
            return Err("simple_loop_threshold must be positive".to_string());
        }
        if self.detectors.complex_loop_threshold == 0 {
            return Err("complex_loop_threshold must be positive".to_string());
        }
        if self.detectors.complex_loop_threshold > self.detectors.simple_loop_threshold {
            return Err(
                "complex_loop_threshold must not exceed simple_loop_threshold".to_string(),
            );
        }
        if self.fixes.iteration_divisor == 0 || self.fixes.sleep_divisor == 0 {
            return Err("fix divisors must be positive".to_string());
        }
        Ok(())
    }
}

/// Heuristic tables for the nine detectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Iteration bound above which a weight-0/1 loop is reported.
    #[serde(default = "default_simple_loop_threshold")]
    pub simple_loop_threshold: u64,

    /// Iteration bound above which a complex loop is reported.
    #[serde(default = "default_complex_loop_threshold")]
    pub complex_loop_threshold: u64,

    /// A loop is "complex" when its weight exceeds this cutoff. Weight
    /// counts calls (1), channel operations (1), selects (2) and
    /// goroutine launches (2) in the loop body.
    #[serde(default = "default_complex_weight_cutoff")]
    pub complex_weight_cutoff: u32,

    /// Total statically-resolvable sleep above which SleepDelay fires.
    #[serde(default = "default_sleep_threshold_ms")]
    pub sleep_threshold_ms: u64,

    /// Total sleep above which SleepDelay escalates to High.
    #[serde(default = "default_sleep_high_ms")]
    pub sleep_high_ms: u64,

    /// Package qualifiers (as seen at call sites) that indicate
    /// networking, file I/O, databases or external services.
    #[serde(default = "default_io_packages")]
    pub io_packages: Vec<String>,

    /// Call base names that indicate external-dependency work even
    /// without a recognized qualifier.
    #[serde(default = "default_io_call_names")]
    pub io_call_names: Vec<String>,

    /// Type-name suffixes that mark a production implementation.
    #[serde(default = "default_implementation_suffixes")]
    pub implementation_suffixes: Vec<String>,

    /// Name fragments that mark a test double.
    #[serde(default = "default_mock_markers")]
    pub mock_markers: Vec<String>,

    /// Type-name suffixes treated as interface-shaped for the
    /// MissingMock heuristic ("er" covers the Go single-method
    /// convention: Reader, Dialer, Manager, ...).
    #[serde(default = "default_interface_suffixes")]
    pub interface_suffixes: Vec<String>,

    /// Benchmark-only receiver methods on `*testing.B`.
    #[serde(default = "default_benchmark_helper_methods")]
    pub benchmark_helper_methods: Vec<String>,

    /// Benchmark-only helper functions, matched by full call path.
    #[serde(default = "default_benchmark_helper_functions")]
    pub benchmark_helper_functions: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            simple_loop_threshold: default_simple_loop_threshold(),
            complex_loop_threshold: default_complex_loop_threshold(),
            complex_weight_cutoff: default_complex_weight_cutoff(),
            sleep_threshold_ms: default_sleep_threshold_ms(),
            sleep_high_ms: default_sleep_high_ms(),
            io_packages: default_io_packages(),
            io_call_names: default_io_call_names(),
            implementation_suffixes: default_implementation_suffixes(),
            mock_markers: default_mock_markers(),
            interface_suffixes: default_interface_suffixes(),
            benchmark_helper_methods: default_benchmark_helper_methods(),
            benchmark_helper_functions: default_benchmark_helper_functions(),
        }
    }
}

impl DetectorConfig {
    pub fn sleep_threshold(&self) -> Duration {
        Duration::from_millis(self.sleep_threshold_ms)
    }

    pub fn sleep_high(&self) -> Duration {
        Duration::from_millis(self.sleep_high_ms)
    }

    /// Whether a constructor or type name refers to a test double.
    pub fn is_mock_name(&self, name: &str) -> bool {
        let base = name.rsplit('.').next().unwrap_or(name);
        let base = base.strip_prefix("New").unwrap_or(base);
        self.mock_markers.iter().any(|marker| {
            base.contains(marker.as_str()) || base.starts_with(marker.to_lowercase().as_str())
        })
    }

    /// Whether a type name looks like a production implementation. A
    /// package qualifier counts as context, so `http.Client` matches
    /// even though a bare `Client` is just a suffix.
    pub fn is_implementation_name(&self, name: &str) -> bool {
        let qualified = name.contains('.');
        let base = name.rsplit('.').next().unwrap_or(name);
        self.implementation_suffixes
            .iter()
            .any(|suffix| base.ends_with(suffix.as_str()) && (qualified || base.len() > suffix.len()))
    }

    /// Whether a type name is interface-shaped per the suffix table.
    pub fn is_interface_like(&self, name: &str) -> bool {
        let base = name.rsplit('.').next().unwrap_or(name);
        self.interface_suffixes
            .iter()
            .any(|suffix| base.ends_with(suffix.as_str()) && base.len() > suffix.len())
    }

    /// Whether a call reaches networking/file-I/O/database/external
    /// services per the package-or-name allow-list.
    pub fn is_io_call(&self, qualifier: Option<&str>, base_name: &str) -> bool {
        if let Some(q) = qualifier {
            let q = q.rsplit('.').next().unwrap_or(q);
            if self.io_packages.iter().any(|p| p == q) {
                return true;
            }
        }
        self.io_call_names.iter().any(|n| n == base_name)
    }
}

/// Knobs for the fix generators and the file-mutation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixConfig {
    /// Timeout inserted by AddTimeout/AddLoopExit when the issue
    /// context does not carry one.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// ReduceIterations rewrites the bound to `max(old / divisor, floor)`.
    #[serde(default = "default_iteration_divisor")]
    pub iteration_divisor: u64,
    #[serde(default = "default_iteration_floor")]
    pub iteration_floor: u64,

    /// OptimizeSleep rewrites durations to `max(old / divisor, 1ms)`.
    #[serde(default = "default_sleep_divisor")]
    pub sleep_divisor: u32,

    /// Where backups are written; defaults to a `.testmedic_backups`
    /// directory next to the mutated file.
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,

    /// Run `gofmt` on mutated files when it is on PATH.
    #[serde(default = "default_true")]
    pub reformat: bool,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            iteration_divisor: default_iteration_divisor(),
            iteration_floor: default_iteration_floor(),
            sleep_divisor: default_sleep_divisor(),
            backup_dir: None,
            reformat: default_true(),
        }
    }
}

impl FixConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_iteration_divisor() -> u64 {
    10
}

fn default_iteration_floor() -> u64 {
    10
}

fn default_sleep_divisor() -> u32 {
    20
}

fn default_simple_loop_threshold() -> u64 {
    100
}

fn default_complex_loop_threshold() -> u64 {
    20
}

fn default_complex_weight_cutoff() -> u32 {
    1
}

fn default_sleep_threshold_ms() -> u64 {
    100
}

fn default_sleep_high_ms() -> u64 {
    1000
}

fn default_io_packages() -> Vec<String> {
    ["http", "net", "os", "sql", "exec", "rpc", "grpc", "ioutil"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_io_call_names() -> Vec<String> {
    [
        "Dial",
        "DialContext",
        "Query",
        "QueryContext",
        "Exec",
        "ExecContext",
        "NewRequest",
        "Get",
        "Post",
        "Do",
        "Open",
        "Connect",
        "ReadFile",
        "WriteFile",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_implementation_suffixes() -> Vec<String> {
    [
        "Client",
        "Server",
        "Service",
        "Manager",
        "Provider",
        "Store",
        "Repository",
        "Handler",
        "Conn",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_mock_markers() -> Vec<String> {
    ["Mock", "Fake", "Stub"].iter().map(|s| s.to_string()).collect()
}

fn default_interface_suffixes() -> Vec<String> {
    [
        "er",
        "Interface",
        "Client",
        "Service",
        "Store",
        "Repository",
        "Provider",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_benchmark_helper_methods() -> Vec<String> {
    [
        "ResetTimer",
        "StartTimer",
        "StopTimer",
        "ReportAllocs",
        "SetBytes",
        "SetParallelism",
        "RunParallel",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_benchmark_helper_functions() -> Vec<String> {
    ["testing.Benchmark", "testing.AllocsPerRun"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_shipped_thresholds() {
        let config = DetectorConfig::default();
        assert_eq!(config.simple_loop_threshold, 100);
        assert_eq!(config.complex_loop_threshold, 20);
        assert_eq!(config.complex_weight_cutoff, 1);
        assert_eq!(config.sleep_threshold(), Duration::from_millis(100));
        assert_eq!(config.sleep_high(), Duration::from_secs(1));
    }

    #[test]
    fn empty_toml_round_trips_to_defaults() {
        let config: AnalyzerConfig = toml::from_str("").unwrap();
        assert_eq!(
            config.detectors.simple_loop_threshold,
            DetectorConfig::default().simple_loop_threshold
        );
        assert_eq!(config.fixes.default_timeout_secs, 5);
        assert_eq!(config.fixes.iteration_divisor, 10);
        assert_eq!(config.fixes.iteration_floor, 10);
        assert_eq!(config.fixes.sleep_divisor, 20);
        assert!(config.fixes.reformat);
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: AnalyzerConfig = toml::from_str(
            "[detectors]\nsleep_threshold_ms = 150\n\n[fixes]\ndefault_timeout_secs = 30\n",
        )
        .unwrap();
        assert_eq!(config.detectors.sleep_threshold_ms, 150);
        assert_eq!(config.detectors.simple_loop_threshold, 100);
        assert_eq!(config.fixes.default_timeout_secs, 30);
    }

    #[test]
    fn validate_rejects_inverted_thresholds() {
        let mut config = AnalyzerConfig::default();
        config.detectors.complex_loop_threshold = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn mock_name_heuristic() {
        let config = DetectorConfig::default();
        assert!(config.is_mock_name("NewMockStore"));
        assert!(config.is_mock_name("mockStore"));
        assert!(config.is_mock_name("StoreMock"));
        assert!(config.is_mock_name("FakeClient"));
        assert!(!config.is_mock_name("NewStore"));
        assert!(!config.is_mock_name("http.Client"));
    }

    #[test]
    fn implementation_and_interface_heuristics() {
        let config = DetectorConfig::default();
        assert!(config.is_implementation_name("http.Client"));
        assert!(config.is_implementation_name("sql.Conn"));
        assert!(config.is_implementation_name("PostgresStore"));
        assert!(!config.is_implementation_name("Client")); // bare suffix
        assert!(!config.is_implementation_name("helper"));

        assert!(config.is_interface_like("Retriever"));
        assert!(config.is_interface_like("VectorStore"));
        assert!(!config.is_interface_like("config"));
    }

    #[test]
    fn io_call_heuristic() {
        let config = DetectorConfig::default();
        assert!(config.is_io_call(Some("http"), "Get"));
        assert!(config.is_io_call(Some("db"), "QueryContext"));
        assert!(config.is_io_call(None, "Dial"));
        assert!(!config.is_io_call(Some("strings"), "Join"));
    }
}
