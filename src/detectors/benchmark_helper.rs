//! Benchmark-framework helpers called outside benchmarks. `ResetTimer`
//! and friends are no-ops (or panics, for `RunParallel`) on a
//! `*testing.T`, so a non-Load test calling them is copy-paste debris.
//! Matched by receiver-method name or by full helper-function path;
//! reported once per distinct callee.

use crate::config::DetectorConfig;
use crate::core::ast::{self, Expr};
use crate::core::{IssueKind, PerformanceIssue, Severity, TestFunction, TestKind};
use crate::detectors::Detector;
use serde_json::json;
use std::collections::HashMap;

pub struct BenchmarkHelperUsageDetector {
    config: DetectorConfig,
}

impl BenchmarkHelperUsageDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    fn is_helper_call(&self, call: &ast::CallExpr) -> bool {
        if self.config.benchmark_helper_functions.iter().any(|f| f == &call.path) {
            return true;
        }
        call.qualifier().is_some()
            && self
                .config
                .benchmark_helper_methods
                .iter()
                .any(|m| m == call.base_name())
    }
}

impl Detector for BenchmarkHelperUsageDetector {
    fn name(&self) -> &'static str {
        "benchmark_helper_usage"
    }

    fn detect(&self, func: &TestFunction) -> Vec<PerformanceIssue> {
        if func.kind == TestKind::Load {
            return Vec::new();
        }
        let mut seen: Vec<String> = Vec::new();
        let mut issues = Vec::new();
        ast::walk_exprs(&func.body, &mut |expr| {
            let Expr::Call(call) = expr else { return };
            if !self.is_helper_call(call) || seen.contains(&call.path) {
                return;
            }
            seen.push(call.path.clone());

            let mut context = HashMap::new();
            context.insert("helper".to_string(), json!(call.path));
            context.insert("line".to_string(), json!(call.line));

            issues.push(PerformanceIssue {
                kind: IssueKind::BenchmarkHelperUsage,
                severity: Severity::Low,
                location: func.location(),
                description: format!(
                    "{} calls benchmark helper {} outside a benchmark",
                    func.name, call.path
                ),
                context,
                fixable: false,
            });
        });
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::testutil;
    use indoc::indoc;

    fn detect(file: &str, source: &str) -> Vec<PerformanceIssue> {
        let func = testutil::function(file, source);
        BenchmarkHelperUsageDetector::new(DetectorConfig::default()).detect(&func)
    }

    #[test]
    fn reset_timer_in_unit_test_is_low_and_not_fixable() {
        let issues = detect(
            "bench_test.go",
            indoc! {r#"
                package demo

                func TestTimer(t *testing.T) {
                    b.ResetTimer()
                }
            "#},
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::BenchmarkHelperUsage);
        assert_eq!(issues[0].severity, Severity::Low);
        assert!(!issues[0].fixable);
        assert_eq!(issues[0].context.get("helper"), Some(&json!("b.ResetTimer")));
    }

    #[test]
    fn helper_functions_match_by_full_path() {
        let issues = detect(
            "bench_test.go",
            indoc! {r#"
                package demo

                func TestMeasure(t *testing.T) {
                    result := testing.Benchmark(run)
                    _ = result
                }
            "#},
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].context.get("helper"),
            Some(&json!("testing.Benchmark"))
        );
    }

    #[test]
    fn benchmarks_may_use_their_own_helpers() {
        let issues = detect(
            "bench_test.go",
            indoc! {r#"
                package demo

                func BenchmarkTimer(b *testing.B) {
                    b.ResetTimer()
                }
            "#},
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn repeated_calls_report_once_per_callee() {
        let issues = detect(
            "bench_test.go",
            indoc! {r#"
                package demo

                func TestTimers(t *testing.T) {
                    b.ResetTimer()
                    b.ResetTimer()
                    b.StopTimer()
                }
            "#},
        );
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn unqualified_names_do_not_match_methods() {
        let issues = detect(
            "bench_test.go",
            indoc! {r#"
                package demo

                func TestLocal(t *testing.T) {
                    ResetTimer()
                }
            "#},
        );
        assert!(issues.is_empty());
    }
}
