//! Unconditional loops (`for {}` / `for true {}`).
//!
//! A loop whose body contains a `select` with a receiving case is
//! reported as the High-severity timer pattern even when no case breaks
//! or returns. That over-approximation is deliberate: timer-driven
//! runner loops usually terminate through channel closure, which is
//! invisible to static analysis. A `select` without a receive, or a
//! reachable `break`/`return`, suppresses the finding entirely;
//! everything else is Critical.

use crate::core::ast::{Expr, ForHeader, ForStmt, Stmt};
use crate::core::{IssueKind, PerformanceIssue, Severity, TestFunction};
use crate::detectors::{collect_loops, Detector};
use serde_json::json;
use std::collections::HashMap;

#[derive(Default)]
pub struct InfiniteLoopDetector;

impl InfiniteLoopDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for InfiniteLoopDetector {
    fn name(&self) -> &'static str {
        "infinite_loop"
    }

    fn detect(&self, func: &TestFunction) -> Vec<PerformanceIssue> {
        let mut issues = Vec::new();
        for loop_stmt in collect_loops(&func.body) {
            if !is_unconditional(&loop_stmt.header) {
                continue;
            }
            let shape = inspect_body(&loop_stmt.body);

            if shape.has_receive_select {
                issues.push(issue(
                    func,
                    loop_stmt,
                    Severity::High,
                    format!(
                        "Unconditional loop at line {} waits on channels with no deadline",
                        loop_stmt.line_start
                    ),
                    true,
                ));
            } else if !shape.has_select && !shape.has_exit {
                issues.push(issue(
                    func,
                    loop_stmt,
                    Severity::Critical,
                    format!(
                        "Infinite loop at line {} has no exit path",
                        loop_stmt.line_start
                    ),
                    false,
                ));
            }
        }
        issues
    }
}

fn is_unconditional(header: &ForHeader) -> bool {
    match header {
        ForHeader::Infinite => true,
        ForHeader::While(cond) => matches!(cond, Expr::BoolLit(true)),
        _ => false,
    }
}

#[derive(Default)]
struct BodyShape {
    has_receive_select: bool,
    has_select: bool,
    has_exit: bool,
}

fn inspect_body(body: &[Stmt]) -> BodyShape {
    let mut shape = BodyShape::default();
    crate::core::ast::walk_stmts(body, &mut |stmt| match stmt {
        Stmt::Select(sel) => {
            shape.has_select = true;
            if sel.cases.iter().any(|c| c.is_receive) {
                shape.has_receive_select = true;
            }
        }
        Stmt::Break | Stmt::Return => shape.has_exit = true,
        _ => {}
    });
    shape
}

fn issue(
    func: &TestFunction,
    loop_stmt: &ForStmt,
    severity: Severity,
    description: String,
    timer_pattern: bool,
) -> PerformanceIssue {
    let mut location = func.location();
    location.line_start = loop_stmt.line_start;
    location.line_end = loop_stmt.line_end;

    let mut context = HashMap::new();
    context.insert("line".to_string(), json!(loop_stmt.line_start));
    if timer_pattern {
        context.insert("pattern".to_string(), json!("ConcurrentTestRunner"));
    }

    PerformanceIssue {
        kind: IssueKind::InfiniteLoop,
        severity,
        location,
        description,
        context,
        fixable: true,
    }
}
