//! Count-controlled loops with large literal bounds.
//!
//! The bound is only trusted when the loop condition compares against
//! an integer literal; anything dynamic is skipped. Loop complexity is
//! a weighted count of the work in the body: plain calls and channel
//! operations weigh 1, selects and goroutine launches weigh 2. Loops
//! heavier than the cutoff get the much lower "complex" threshold.

use crate::config::DetectorConfig;
use crate::core::ast::{self, Expr, ForHeader, Stmt};
use crate::core::{IssueKind, PerformanceIssue, Severity, TestFunction};
use crate::detectors::{collect_loops, Detector};
use serde_json::json;
use std::collections::HashMap;

pub struct LargeIterationDetector {
    config: DetectorConfig,
}

impl LargeIterationDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

impl Detector for LargeIterationDetector {
    fn name(&self) -> &'static str {
        "large_iteration"
    }

    fn detect(&self, func: &TestFunction) -> Vec<PerformanceIssue> {
        let mut issues = Vec::new();
        for loop_stmt in collect_loops(&func.body) {
            let ForHeader::Counted { bound: Some(bound) } = loop_stmt.header else {
                continue;
            };
            let weight = loop_weight(&loop_stmt.body);
            let complex = weight > self.config.complex_weight_cutoff;
            let threshold = if complex {
                self.config.complex_loop_threshold
            } else {
                self.config.simple_loop_threshold
            };
            if bound <= threshold {
                continue;
            }

            let mut location = func.location();
            location.line_start = loop_stmt.line_start;
            location.line_end = loop_stmt.line_end;

            let mut context = HashMap::new();
            context.insert("iterations".to_string(), json!(bound));
            context.insert("threshold".to_string(), json!(threshold));
            context.insert("weight".to_string(), json!(weight));
            context.insert("complex".to_string(), json!(complex));

            issues.push(PerformanceIssue {
                kind: IssueKind::LargeIteration,
                severity: if complex {
                    Severity::High
                } else {
                    Severity::Medium
                },
                location,
                description: format!(
                    "Loop at line {} runs {bound} iterations (threshold {threshold})",
                    loop_stmt.line_start
                ),
                context,
                fixable: true,
            });
        }
        issues
    }
}

/// Weighted work count for one loop body.
fn loop_weight(body: &[Stmt]) -> u32 {
    let mut weight: u32 = 0;
    ast::walk_stmts(body, &mut |stmt| match stmt {
        Stmt::Select(_) => weight += 2,
        Stmt::Go(_) => weight += 2,
        Stmt::Send { .. } => weight += 1,
        _ => {}
    });
    ast::walk_exprs(body, &mut |expr| match expr {
        Expr::Call(_) => weight += 1,
        Expr::Receive(_) => weight += 1,
        _ => {}
    });
    weight
}
