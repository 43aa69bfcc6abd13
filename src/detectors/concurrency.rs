//! External I/O inside loops. Networking, file, database and
//! external-service calls are recognized by the package-or-name
//! allow-list in `DetectorConfig`; one finding is reported per loop,
//! anchored at the first matching call, and a call shared by nested
//! loops is reported only for the outermost one.

use crate::config::DetectorConfig;
use crate::core::ast::{self, Expr};
use crate::core::{IssueKind, PerformanceIssue, Severity, TestFunction};
use crate::detectors::{collect_loops, Detector};
use serde_json::json;
use std::collections::{HashMap, HashSet};

pub struct HighConcurrencyDetector {
    config: DetectorConfig,
}

impl HighConcurrencyDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

impl Detector for HighConcurrencyDetector {
    fn name(&self) -> &'static str {
        "high_concurrency"
    }

    fn detect(&self, func: &TestFunction) -> Vec<PerformanceIssue> {
        let mut issues = Vec::new();
        let mut reported_lines: HashSet<usize> = HashSet::new();

        for loop_stmt in collect_loops(&func.body) {
            let mut hit: Option<(String, usize)> = None;
            ast::walk_exprs(&loop_stmt.body, &mut |expr| {
                if hit.is_some() {
                    return;
                }
                if let Expr::Call(call) = expr {
                    if self.config.is_io_call(call.qualifier(), call.base_name()) {
                        hit = Some((call.path.clone(), call.line));
                    }
                }
            });
            let Some((path, line)) = hit else { continue };
            if !reported_lines.insert(line) {
                continue;
            }

            let mut location = func.location();
            location.line_start = loop_stmt.line_start;
            location.line_end = loop_stmt.line_end;

            let mut context = HashMap::new();
            context.insert("call".to_string(), json!(path));
            context.insert("line".to_string(), json!(line));

            issues.push(PerformanceIssue {
                kind: IssueKind::HighConcurrency,
                severity: Severity::High,
                location,
                description: format!(
                    "Loop at line {} performs external I/O via {path}",
                    loop_stmt.line_start
                ),
                context,
                fixable: true,
            });
        }
        issues
    }
}
