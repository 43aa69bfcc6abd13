//! Project mock-naming convention detection.
//!
//! Before synthesizing a mock we look at how the package already names
//! its doubles: a `test_utils.go`, `mocks.go` or `*_mock.go` file is
//! scanned for an existing constructor prefix (`NewMock*`, `NewFake*`,
//! `NewStub*`), an embedded recording-double type and a functional
//! option type. Packages without any of those get the built-in default.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

static CONSTRUCTOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^func\s+New(Mock|Fake|Stub)\w+\s*\(").unwrap());
static OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^type\s+(\w+Option)\s+func\s*\(").unwrap());
static RECORDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s+(mock\.Mock|\w*CallRecorder)\b").unwrap());

/// How mocks are named and structured in a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockConvention {
    /// Marker prepended to the component name for the struct type.
    pub struct_prefix: String,
    /// Marker prepended to the component name for the constructor.
    pub constructor_prefix: String,
    /// Suffix appended to the struct name for the functional option type.
    pub option_suffix: String,
    /// Recording-double type the package embeds in its mocks, when one
    /// was found in the convention file.
    pub recorder_embed: Option<String>,
    /// The file the convention was read from, if any.
    pub source_file: Option<PathBuf>,
}

impl Default for MockConvention {
    fn default() -> Self {
        Self {
            struct_prefix: "Mock".to_string(),
            constructor_prefix: "NewMock".to_string(),
            option_suffix: "Option".to_string(),
            recorder_embed: None,
            source_file: None,
        }
    }
}

impl MockConvention {
    /// Detect the convention used by the package at `package_dir`,
    /// falling back to the default when no convention file exists or
    /// none of the probes match.
    pub fn detect(package_dir: &Path) -> Self {
        let Some(file) = convention_file(package_dir) else {
            return Self::default();
        };
        let Ok(content) = fs::read_to_string(&file) else {
            return Self::default();
        };

        let mut convention = Self::default();
        convention.source_file = Some(file);

        if let Some(caps) = CONSTRUCTOR_RE.captures(&content) {
            let marker = &caps[1];
            convention.struct_prefix = marker.to_string();
            convention.constructor_prefix = format!("New{marker}");
        }
        if OPTION_RE.is_match(&content) {
            // The suffix convention is fixed; the probe only confirms
            // the package uses functional options at all.
            convention.option_suffix = "Option".to_string();
        }
        if let Some(caps) = RECORDER_RE.captures(&content) {
            convention.recorder_embed = Some(caps[1].to_string());
        }
        convention
    }

    pub fn struct_name(&self, component: &str) -> String {
        format!("{}{component}", self.struct_prefix)
    }

    pub fn constructor_name(&self, component: &str) -> String {
        format!("{}{component}", self.constructor_prefix)
    }

    pub fn option_name(&self, component: &str) -> String {
        format!("{}{}", self.struct_name(component), self.option_suffix)
    }
}

/// The first convention file present: `test_utils.go`, `mocks.go`, then
/// any `*_mock.go` in lexicographic order.
fn convention_file(package_dir: &Path) -> Option<PathBuf> {
    for name in ["test_utils.go", "mocks.go"] {
        let candidate = package_dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    let mut mock_files: Vec<PathBuf> = fs::read_dir(package_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with("_mock.go"))
                .unwrap_or(false)
        })
        .collect();
    mock_files.sort();
    mock_files.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tempfile::TempDir;

    #[test]
    fn default_convention_without_a_convention_file() {
        let dir = TempDir::new().unwrap();
        let convention = MockConvention::detect(dir.path());
        assert_eq!(convention, MockConvention::default());
        assert_eq!(convention.struct_name("Store"), "MockStore");
        assert_eq!(convention.constructor_name("Store"), "NewMockStore");
        assert_eq!(convention.option_name("Store"), "MockStoreOption");
    }

    #[test]
    fn fake_prefix_is_picked_up_from_test_utils() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("test_utils.go"),
            indoc! {r#"
                package demo

                type FakeStore struct{}

                func NewFakeStore() *FakeStore {
                    return &FakeStore{}
                }
            "#},
        )
        .unwrap();
        let convention = MockConvention::detect(dir.path());
        assert_eq!(convention.struct_prefix, "Fake");
        assert_eq!(convention.constructor_name("Client"), "NewFakeClient");
    }

    #[test]
    fn recorder_embed_is_detected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("mocks.go"),
            indoc! {r#"
                package demo

                type MockClient struct {
                    mock.Mock
                }

                func NewMockClient() *MockClient {
                    return &MockClient{}
                }
            "#},
        )
        .unwrap();
        let convention = MockConvention::detect(dir.path());
        assert_eq!(convention.recorder_embed.as_deref(), Some("mock.Mock"));
        assert!(convention.source_file.is_some());
    }

    #[test]
    fn mock_files_are_scanned_in_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("store_mock.go"),
            "package demo\n\nfunc NewStubStore() *StubStore { return nil }\n",
        )
        .unwrap();
        let convention = MockConvention::detect(dir.path());
        assert_eq!(convention.constructor_prefix, "NewStub");
    }
}
