//! Dual validation of applied fixes.
//!
//! Step 1 (mock fixes only): the mock's method set must cover every
//! method of the original interface; any missing method records an
//! incompatibility and skips step 2. Step 2: `go test` in the affected
//! package, bounded by the caller-supplied timeout. A fix is `Validated`
//! only when both steps hold; otherwise it moves to `Failed`.
//! Incompatibility and failing tests are verdicts, not errors — only
//! infrastructure problems (missing toolchain, spawn failure, timeout)
//! surface as `ValidationError`.

use crate::core::errors::ValidationError;
use crate::core::{Fix, FixKind, FixStatus, ValidationResult};
use crate::mocks::{self, MockConvention};
use chrono::Utc;
use log::{debug, info, warn};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use which::which;

pub struct ValidationEngine {
    go: PathBuf,
    /// Upper bound on one `go test` run; `None` waits indefinitely.
    timeout: Option<Duration>,
}

impl ValidationEngine {
    pub fn new(timeout: Option<Duration>) -> Result<Self, ValidationError> {
        let go = which("go").map_err(|_| ValidationError::GoMissing)?;
        Ok(Self { go, timeout })
    }

    /// Validate an applied fix and advance its status. `baseline` is the
    /// package's pre-fix test duration when the caller measured one;
    /// without it, `execution_time_improved` stays false.
    pub fn validate_fix(
        &self,
        fix: &mut Fix,
        baseline: Option<Duration>,
    ) -> Result<ValidationResult, ValidationError> {
        let target = fix.issue.location.file.clone();
        let mut errors = Vec::new();

        let interface_compatible = match fix.kind {
            FixKind::ReplaceWithMock | FixKind::CreateMock => {
                interface_compatibility(fix, &mut errors)
            }
            // Non-mock fixes do not change any method set.
            _ => true,
        };

        let (tests_pass, test_output, elapsed) = if interface_compatible {
            let package_dir = target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let run = self.run_go_test(&package_dir)?;
            if !run.passed {
                errors.push("tests failed after fix".to_string());
            }
            (run.passed, run.output, run.elapsed)
        } else {
            debug!("skipping test run for {}: incompatible mock", target.display());
            (false, String::new(), Duration::ZERO)
        };

        let verdict = if interface_compatible && tests_pass {
            FixStatus::Validated
        } else {
            FixStatus::Failed
        };
        if let Err(err) = fix.transition(verdict) {
            warn!("{err}");
            errors.push(err.to_string());
        }
        info!(
            "validated {} fix on {}: {}",
            fix.kind,
            target.display(),
            fix.status
        );

        Ok(ValidationResult {
            fix_kind: fix.kind,
            target,
            interface_compatible,
            tests_pass,
            execution_time_improved: baseline.map(|b| elapsed < b).unwrap_or(false),
            original_execution_time: baseline.unwrap_or(Duration::ZERO),
            new_execution_time: elapsed,
            errors,
            test_output,
            validated_at: Utc::now(),
        })
    }

    fn run_go_test(&self, package_dir: &Path) -> Result<TestRun, ValidationError> {
        let start = Instant::now();
        let mut child = Command::new(&self.go)
            .args(["test", "-count=1", "."])
            .current_dir(package_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ValidationError::Spawn {
                package: package_dir.to_path_buf(),
                source,
            })?;

        // Drain both pipes off-thread so a chatty test run cannot
        // deadlock against a full pipe buffer.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_handle = thread::spawn(move || read_all(stdout));
        let err_handle = thread::spawn(move || read_all(stderr));

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    return Err(ValidationError::Spawn {
                        package: package_dir.to_path_buf(),
                        source,
                    })
                }
            }
            if let Some(bound) = self.timeout {
                if start.elapsed() > bound {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ValidationError::TimedOut(bound));
                }
            }
            thread::sleep(Duration::from_millis(50));
        };
        let elapsed = start.elapsed();

        let mut output = out_handle.join().unwrap_or_default();
        output.push_str(&err_handle.join().unwrap_or_default());
        Ok(TestRun {
            passed: status.success(),
            output,
            elapsed,
        })
    }
}

struct TestRun {
    passed: bool,
    output: String,
    elapsed: Duration,
}

fn read_all(pipe: Option<impl Read>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

/// Step 1: every interface method must exist on the mock type. Records
/// one error per missing method, or one for an unlocatable interface.
fn interface_compatibility(fix: &Fix, errors: &mut Vec<String>) -> bool {
    let issue = &fix.issue;
    let Some(component) = issue
        .context
        .get("component_name")
        .and_then(|v| v.as_str())
    else {
        errors.push("issue context carries no component name".to_string());
        return false;
    };
    let interface = issue
        .context
        .get("interface_name")
        .and_then(|v| v.as_str())
        .unwrap_or(component);
    let package_dir = issue
        .context
        .get("package_path")
        .and_then(|v| v.as_str())
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .or_else(|| issue.location.file.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    let interface_methods = match mocks::find_interface(&package_dir, interface) {
        Ok(methods) => methods,
        Err(err) => {
            errors.push(err.to_string());
            return false;
        }
    };

    let mock_type = MockConvention::detect(&package_dir).struct_name(component);
    let mock_methods = mocks::mock_method_names(&package_dir, &mock_type);

    let mut compatible = true;
    for method in &interface_methods {
        if !mock_methods.contains(&method.name) {
            errors.push(format!(
                "mock {mock_type} is missing interface method {}",
                method.name
            ));
            compatible = false;
        }
    }
    compatible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CodeChange, IssueKind, Location, PerformanceIssue, Severity};
    use indoc::indoc;
    use serde_json::json;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn mock_fix(dir: &Path, component: &str) -> Fix {
        let mut context = HashMap::new();
        context.insert("component_name".to_string(), json!(component));
        context.insert("interface_name".to_string(), json!(component));
        context.insert("package_path".to_string(), json!(dir.display().to_string()));
        let issue = PerformanceIssue {
            kind: IssueKind::MissingMock,
            severity: Severity::Medium,
            location: Location {
                file: dir.join("store_test.go"),
                function: "TestStore".to_string(),
                line_start: 1,
                line_end: 1,
            },
            description: String::new(),
            context,
            fixable: true,
        };
        Fix::proposed(issue, FixKind::CreateMock, Vec::<CodeChange>::new())
    }

    const STORE_IFACE: &str = indoc! {r#"
        package store

        type Store interface {
            Get(key string) (string, error)
            Close()
        }
    "#};

    #[test]
    fn complete_mock_is_compatible() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("store.go"), STORE_IFACE).unwrap();
        fs::write(
            dir.path().join("store_mock.go"),
            indoc! {r#"
                package store

                type MockStore struct{}

                func (m *MockStore) Get(key string) (string, error) { return "", nil }
                func (m *MockStore) Close()                         {}
            "#},
        )
        .unwrap();

        let fix = mock_fix(dir.path(), "Store");
        let mut errors = Vec::new();
        assert!(interface_compatibility(&fix, &mut errors));
        assert!(errors.is_empty());
    }

    #[test]
    fn missing_method_records_an_incompatibility() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("store.go"), STORE_IFACE).unwrap();
        fs::write(
            dir.path().join("store_mock.go"),
            "package store\n\ntype MockStore struct{}\n\nfunc (m *MockStore) Close() {}\n",
        )
        .unwrap();

        let fix = mock_fix(dir.path(), "Store");
        let mut errors = Vec::new();
        assert!(!interface_compatibility(&fix, &mut errors));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Get"));
    }

    #[test]
    fn unlocatable_interface_is_incompatible() {
        let dir = TempDir::new().unwrap();
        let fix = mock_fix(dir.path(), "Ghost");
        let mut errors = Vec::new();
        assert!(!interface_compatibility(&fix, &mut errors));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("not found"));
    }

    #[test]
    fn failed_validation_rolls_back_to_the_original_bytes() {
        use crate::config::FixConfig;
        use crate::fixes::FixEngine;

        let dir = TempDir::new().unwrap();
        let file = dir.path().join("client_test.go");
        let original =
            "package demo\n\nfunc TestFetch(t *testing.T) {\n\tclient := NewHTTPClient()\n\t_ = client\n}\n";
        fs::write(&file, original).unwrap();

        let mut context = HashMap::new();
        context.insert("component_name".to_string(), json!("HTTPClient"));
        let issue = PerformanceIssue {
            kind: IssueKind::ActualImplementationUsage,
            severity: Severity::High,
            location: Location {
                file: file.clone(),
                function: "TestFetch".to_string(),
                line_start: 3,
                line_end: 6,
            },
            description: String::new(),
            context,
            fixable: true,
        };

        let fix_engine = FixEngine::new(FixConfig {
            reformat: false,
            ..FixConfig::default()
        });
        let mut fix = fix_engine.apply_fix(&issue).unwrap();
        assert_eq!(fix.status, FixStatus::Applied);
        assert!(fs::read_to_string(&file)
            .unwrap()
            .contains("NewMockHTTPClient()"));

        // no HTTPClient interface exists, so step 1 fails and step 2
        // (the test subprocess) is never reached
        let engine = ValidationEngine {
            go: PathBuf::from("go"),
            timeout: None,
        };
        let result = engine.validate_fix(&mut fix, None).unwrap();
        assert!(!result.interface_compatible);
        assert!(!result.tests_pass);
        assert_eq!(fix.status, FixStatus::Failed);

        fix_engine.rollback_fix(&mut fix).unwrap();
        assert_eq!(fix.status, FixStatus::RolledBack);
        assert_eq!(fs::read_to_string(&file).unwrap(), original);
    }
}
