//! Mock hygiene for unit tests: real implementations where a test
//! double belongs, mixing doubles with real components, and
//! interface-shaped components with no mock constructor in sight. All
//! three only apply to `Unit` tests; integration and load tests are
//! expected to touch real components.

use crate::config::DetectorConfig;
use crate::core::{IssueKind, PerformanceIssue, Severity, TestFunction, TestKind};
use crate::detectors::Detector;
use crate::parser::{scan_usage, UsageScan};
use serde_json::json;
use std::collections::HashMap;

pub struct ActualImplementationUsageDetector {
    config: DetectorConfig,
}

impl ActualImplementationUsageDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

impl Detector for ActualImplementationUsageDetector {
    fn name(&self) -> &'static str {
        "actual_implementation_usage"
    }

    fn detect(&self, func: &TestFunction) -> Vec<PerformanceIssue> {
        if func.kind != TestKind::Unit {
            return Vec::new();
        }
        let scan = scan_usage(&func.body, &self.config);
        if scan.real.is_empty() || !scan.mock.is_empty() {
            return Vec::new();
        }

        let components = distinct_components(&scan.real);
        let first = &scan.real[0];

        let mut context = HashMap::new();
        context.insert("component_name".to_string(), json!(first.component));
        context.insert("components".to_string(), json!(components));
        context.insert("line".to_string(), json!(first.line));

        vec![PerformanceIssue {
            kind: IssueKind::ActualImplementationUsage,
            severity: Severity::High,
            location: func.location(),
            description: format!(
                "{} constructs real implementation {} with no test double",
                func.name, first.component
            ),
            context,
            fixable: true,
        }]
    }
}

pub struct MixedMockRealUsageDetector {
    config: DetectorConfig,
}

impl MixedMockRealUsageDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

impl Detector for MixedMockRealUsageDetector {
    fn name(&self) -> &'static str {
        "mixed_mock_real_usage"
    }

    fn detect(&self, func: &TestFunction) -> Vec<PerformanceIssue> {
        if func.kind != TestKind::Unit {
            return Vec::new();
        }
        let scan = scan_usage(&func.body, &self.config);
        if scan.real.is_empty() || scan.mock.is_empty() {
            return Vec::new();
        }

        let mut context = HashMap::new();
        context.insert(
            "component_name".to_string(),
            json!(scan.real[0].component),
        );
        context.insert(
            "real_components".to_string(),
            json!(distinct_components(&scan.real)),
        );
        context.insert(
            "mock_components".to_string(),
            json!(distinct_components(&scan.mock)),
        );

        vec![PerformanceIssue {
            kind: IssueKind::MixedMockRealUsage,
            severity: Severity::Medium,
            location: func.location(),
            description: format!(
                "{} mixes real implementation {} with mocks",
                func.name, scan.real[0].component
            ),
            context,
            fixable: true,
        }]
    }
}

pub struct MissingMockDetector {
    config: DetectorConfig,
}

impl MissingMockDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

impl Detector for MissingMockDetector {
    fn name(&self) -> &'static str {
        "missing_mock"
    }

    fn detect(&self, func: &TestFunction) -> Vec<PerformanceIssue> {
        if func.kind != TestKind::Unit {
            return Vec::new();
        }
        let scan = scan_usage(&func.body, &self.config);
        let package_path = func
            .file
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        distinct_components(&scan.real)
            .into_iter()
            .filter(|component| {
                self.config.is_interface_like(component) && !scan.has_mock_for(component)
            })
            .map(|component| {
                let mut context = HashMap::new();
                context.insert("component_name".to_string(), json!(component));
                context.insert("interface_name".to_string(), json!(component));
                context.insert("package_path".to_string(), json!(package_path));

                PerformanceIssue {
                    kind: IssueKind::MissingMock,
                    severity: Severity::Medium,
                    location: func.location(),
                    description: format!("No mock implementation exists for {component}"),
                    context,
                    fixable: true,
                }
            })
            .collect()
    }
}

fn distinct_components(uses: &[crate::parser::extractor::NamedUse]) -> Vec<String> {
    let mut seen = Vec::new();
    for use_site in uses {
        if !seen.contains(&use_site.component) {
            seen.push(use_site.component.clone());
        }
    }
    seen
}
