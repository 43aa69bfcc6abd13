//! Missing-deadline detection. The heavy lifting (finding
//! `context.WithTimeout`, `context.WithDeadline` or a `<-time.After`
//! select case) happens during extraction; this detector only reads the
//! precomputed `has_timeout` flag and grades by test kind.

use crate::core::{IssueKind, PerformanceIssue, Severity, TestFunction, TestKind};
use crate::detectors::Detector;
use serde_json::json;
use std::collections::HashMap;

#[derive(Default)]
pub struct MissingTimeoutDetector;

impl MissingTimeoutDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for MissingTimeoutDetector {
    fn name(&self) -> &'static str {
        "missing_timeout"
    }

    fn detect(&self, func: &TestFunction) -> Vec<PerformanceIssue> {
        if func.has_timeout {
            return Vec::new();
        }
        // Unit tests hang entire suite runs, integration tests usually
        // run under an outer harness deadline, benchmarks are bounded
        // by the framework.
        let severity = match func.kind {
            TestKind::Unit => Severity::High,
            TestKind::Integration => Severity::Medium,
            TestKind::Load => Severity::Low,
        };

        let mut context = HashMap::new();
        context.insert("test_kind".to_string(), json!(func.kind.to_string()));

        vec![PerformanceIssue {
            kind: IssueKind::MissingTimeout,
            severity,
            location: func.location(),
            description: format!("{} has no timeout or deadline construct", func.name),
            context,
            fixable: true,
        }]
    }
}
