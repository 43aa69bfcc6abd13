//! Accumulated `time.Sleep` delay. Only statically resolvable durations
//! count toward the total, so `time.Sleep(computeDelay())` contributes
//! nothing. Accumulation is a plain sum and therefore independent of
//! the order the sleeps appear in.

use crate::config::DetectorConfig;
use crate::core::ast::{self, format_go_duration, Expr};
use crate::core::{IssueKind, PerformanceIssue, Severity, TestFunction};
use crate::detectors::Detector;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

pub struct SleepDelayDetector {
    config: DetectorConfig,
}

impl SleepDelayDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

impl Detector for SleepDelayDetector {
    fn name(&self) -> &'static str {
        "sleep_delay"
    }

    fn detect(&self, func: &TestFunction) -> Vec<PerformanceIssue> {
        let mut total = Duration::ZERO;
        let mut count: usize = 0;
        ast::walk_exprs(&func.body, &mut |expr| {
            if let Expr::Call(call) = expr {
                if call.path == "time.Sleep" {
                    if let Some(d) = call.args.first().and_then(ast::resolve_duration) {
                        total += d;
                        count += 1;
                    }
                }
            }
        });

        if total <= self.config.sleep_threshold() {
            return Vec::new();
        }
        let severity = if total > self.config.sleep_high() {
            Severity::High
        } else {
            Severity::Medium
        };

        let mut context = HashMap::new();
        context.insert("total_sleep".to_string(), json!(format_go_duration(total)));
        context.insert(
            "threshold".to_string(),
            json!(format_go_duration(self.config.sleep_threshold())),
        );
        context.insert("sleep_count".to_string(), json!(count));

        vec![PerformanceIssue {
            kind: IssueKind::SleepDelay,
            severity,
            location: func.location(),
            description: format!(
                "{} sleeps for {} across {count} call(s)",
                func.name,
                format_go_duration(total)
            ),
            context,
            fixable: true,
        }]
    }
}
