//! Test-function extraction and classification.
//!
//! Classification rule, applied in order: `Benchmark`/`Fuzz` prefixed
//! functions are Load tests; in an integration-suite file (name ends
//! `_integration_test.go`) the remaining collected functions are
//! Integration; `Test` prefixed functions are Unit. Prefix checks are
//! case-sensitive and prefix-only. Other top-level functions are not
//! test functions and are not collected.

use crate::config::DetectorConfig;
use crate::core::ast::{self, Expr, GoFunction, Stmt};
use crate::core::errors::AnalyzerError;
use crate::core::{CancelToken, TestFile, TestFunction, TestKind};
use crate::parser::{go, lower};
use log::debug;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Parse a Go test file from disk and collect its test functions.
pub fn parse_file(
    path: &Path,
    config: &DetectorConfig,
    cancel: &CancelToken,
) -> Result<TestFile, AnalyzerError> {
    if cancel.is_cancelled() {
        return Err(AnalyzerError::Cancelled);
    }
    let source = fs::read_to_string(path).map_err(|e| AnalyzerError::io(path, e))?;
    parse_source(path, &source, config, cancel)
}

/// Parse already-loaded Go source. Separated from `parse_file` so tests
/// and in-memory re-analysis can skip the filesystem.
pub fn parse_source(
    path: &Path,
    source: &str,
    config: &DetectorConfig,
    cancel: &CancelToken,
) -> Result<TestFile, AnalyzerError> {
    let tree = go::parse_source(source).map_err(|e| AnalyzerError::parse(path, e.to_string()))?;
    if go::has_parse_errors(&tree) {
        return Err(AnalyzerError::parse(path, "source contains syntax errors"));
    }

    let package = go::package_name(&tree, source).unwrap_or_default();
    let is_integration_suite = is_integration_file(path);

    let mut functions = Vec::new();
    for decl in lower::lower_functions(&tree, source) {
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }
        let Some(kind) = classify(&decl.name, is_integration_suite) else {
            continue;
        };
        functions.push(build_function(
            &decl,
            kind,
            path,
            &package,
            is_integration_suite,
            config,
        ));
    }
    debug!(
        "parsed {}: package {}, {} test functions",
        path.display(),
        package,
        functions.len()
    );

    Ok(TestFile {
        path: path.to_path_buf(),
        package,
        is_integration_suite,
        source: source.to_string(),
        functions,
    })
}

/// Integration-suite naming convention.
pub fn is_integration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with("_integration_test.go"))
        .unwrap_or(false)
}

/// Classify a collected function by name prefix; `None` means the
/// function is not a test function at all.
pub fn classify(name: &str, integration_suite: bool) -> Option<TestKind> {
    if name.starts_with("Benchmark") || name.starts_with("Fuzz") {
        return Some(TestKind::Load);
    }
    if !name.starts_with("Test") {
        return None;
    }
    if integration_suite {
        Some(TestKind::Integration)
    } else {
        Some(TestKind::Unit)
    }
}

fn build_function(
    decl: &GoFunction,
    kind: TestKind,
    path: &Path,
    package: &str,
    is_integration_suite: bool,
    config: &DetectorConfig,
) -> TestFunction {
    let timeout_duration = find_timeout(&decl.body);
    let usage = scan_usage(&decl.body, config);
    let uses_real = !usage.real.is_empty();
    let uses_mocks = !usage.mock.is_empty();

    TestFunction {
        name: decl.name.clone(),
        kind,
        file: path.to_path_buf(),
        package: package.to_string(),
        is_integration_suite,
        line_start: decl.line_start,
        line_end: decl.line_end,
        has_timeout: timeout_duration.is_some(),
        timeout_duration: timeout_duration.flatten(),
        uses_real_implementation: uses_real,
        uses_mocks,
        mixed_usage: uses_real && uses_mocks,
        body: decl.body.clone(),
        issues: Vec::new(),
    }
}

/// Look for a deadline construct: a `context.WithTimeout`/`WithDeadline`
/// call, or a select case receiving from `time.After`. The outer Option
/// is "any timeout found"; the inner is its statically resolved value.
fn find_timeout(body: &[Stmt]) -> Option<Option<Duration>> {
    let mut found: Option<Option<Duration>> = None;
    ast::walk_exprs(body, &mut |expr| {
        if found.is_some() {
            return;
        }
        if let Expr::Call(call) = expr {
            match call.path.as_str() {
                "context.WithTimeout" => {
                    found = Some(call.args.get(1).and_then(ast::resolve_duration));
                }
                "context.WithDeadline" => found = Some(None),
                _ => {}
            }
        }
    });
    if found.is_some() {
        return found;
    }

    ast::walk_stmts(body, &mut |stmt| {
        if found.is_some() {
            return;
        }
        if let Stmt::Select(sel) = stmt {
            for case in &sel.cases {
                if let Some(Expr::Receive(inner)) = &case.comm {
                    if let Expr::Call(call) = inner.as_ref() {
                        if call.path == "time.After" {
                            found = Some(call.args.first().and_then(ast::resolve_duration));
                        }
                    }
                }
            }
        }
    });
    found
}

/// One observed construction of a named component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedUse {
    /// Component name with constructor prefix and package qualifier
    /// stripped: `store.NewPostgresStore(..)` → `PostgresStore`.
    pub component: String,
    pub line: usize,
}

/// Constructor and composite-literal usage split into real
/// implementations and test doubles. Shared by the extractor's
/// attribute flags and the mock-usage detectors.
#[derive(Debug, Clone, Default)]
pub struct UsageScan {
    pub real: Vec<NamedUse>,
    pub mock: Vec<NamedUse>,
}

impl UsageScan {
    pub fn has_mock_for(&self, component: &str) -> bool {
        self.mock.iter().any(|m| m.component == component)
    }
}

pub fn scan_usage(body: &[Stmt], config: &DetectorConfig) -> UsageScan {
    let mut scan = UsageScan::default();
    ast::walk_exprs(body, &mut |expr| {
        let (name, line) = match expr {
            Expr::Call(call) => {
                let base = call.base_name();
                if !base.starts_with("New") || base == "New" {
                    return;
                }
                (base.to_string(), call.line)
            }
            // keep the qualifier so `http.Client{}` registers as an
            // implementation even though a bare `Client` would not
            Expr::Composite { type_name, line } => (type_name.clone(), *line),
            _ => return,
        };

        let unqualified = name.rsplit('.').next().unwrap_or(name.as_str());
        if config.is_mock_name(unqualified) {
            scan.mock.push(NamedUse {
                component: strip_mock_marker(unqualified, config),
                line,
            });
        } else if config.is_implementation_name(&name) || config.is_interface_like(&name) {
            let component = unqualified.strip_prefix("New").unwrap_or(unqualified).to_string();
            scan.real.push(NamedUse { component, line });
        }
    });
    scan
}

/// `NewMockStore` / `mockStore` / `StoreMock` → `Store`.
fn strip_mock_marker(name: &str, config: &DetectorConfig) -> String {
    let base = name.strip_prefix("New").unwrap_or(name);
    for marker in &config.mock_markers {
        if let Some(rest) = base.strip_prefix(marker.as_str()) {
            return rest.to_string();
        }
        if let Some(rest) = base.strip_prefix(marker.to_lowercase().as_str()) {
            return uppercase_first(rest);
        }
        if let Some(rest) = base.strip_suffix(marker.as_str()) {
            return rest.to_string();
        }
    }
    base.to_string()
}

fn uppercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
