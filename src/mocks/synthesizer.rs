//! Mock synthesis from interface declarations.
//!
//! `find_interface` scans the package directory (and its `internal/`
//! subfolder) for an interface declaration and extracts its method
//! signatures. `synthesize` renders a call-recording mock with one
//! method per interface method, returning zero-valued placeholders.
//! Whenever a zero value or an import cannot be resolved, the renderer
//! falls back to a template variant whose method bodies carry explicit
//! completion markers; the pipeline never silently emits plausible but
//! wrong method bodies.

use crate::core::errors::MockError;
use crate::core::{MethodSignature, MockImplementation, MockStatus, Parameter, ReturnValue};
use crate::mocks::convention::MockConvention;
use crate::parser::go;
use chrono::Utc;
use log::{debug, warn};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// Scan a package directory for `interface_name` and return its method
/// signatures.
pub fn find_interface(
    package_dir: &Path,
    interface_name: &str,
) -> Result<Vec<MethodSignature>, MockError> {
    locate_interface(package_dir, interface_name).map(|found| found.methods)
}

/// Render a mock for `component` implementing `interface_name`.
///
/// Fails only when the interface cannot be found; render problems
/// degrade to the template variant instead.
pub fn synthesize(
    component: &str,
    interface_name: &str,
    package_dir: &Path,
) -> Result<MockImplementation, MockError> {
    let found = locate_interface(package_dir, interface_name)?;
    let convention = MockConvention::detect(package_dir);
    Ok(build(
        component,
        interface_name,
        &found.package,
        package_dir,
        found.methods,
        &convention,
    ))
}

/// Like [`synthesize`], but a missing interface degrades to an empty
/// template mock instead of failing. Used by the fix engine, which must
/// produce *something* reviewable for every `MissingMock` issue.
pub fn synthesize_or_template(
    component: &str,
    interface_name: &str,
    package_dir: &Path,
) -> MockImplementation {
    match synthesize(component, interface_name, package_dir) {
        Ok(mock) => mock,
        Err(err) => {
            warn!("falling back to template mock for {component}: {err}");
            let convention = MockConvention::detect(package_dir);
            let package = package_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("main")
                .to_string();
            let code = render_template(component, interface_name, &package, &[], &convention);
            MockImplementation {
                component_name: component.to_string(),
                interface_name: interface_name.to_string(),
                package,
                file_path: default_mock_path(package_dir, component),
                code,
                interface_methods: Vec::new(),
                status: MockStatus::Template,
                requires_manual_completion: true,
                generated_at: Utc::now(),
            }
        }
    }
}

fn build(
    component: &str,
    interface_name: &str,
    package: &str,
    package_dir: &Path,
    methods: Vec<MethodSignature>,
    convention: &MockConvention,
) -> MockImplementation {
    let (code, status, manual) =
        match render(component, interface_name, package, &methods, convention) {
            Some(code) => (code, MockStatus::Complete, false),
            None => {
                debug!("zero values unresolvable for {interface_name}; emitting template");
                let code = render_template(component, interface_name, package, &methods, convention);
                (code, MockStatus::Template, true)
            }
        };
    MockImplementation {
        component_name: component.to_string(),
        interface_name: interface_name.to_string(),
        package: package.to_string(),
        file_path: default_mock_path(package_dir, component),
        code,
        interface_methods: methods,
        status,
        requires_manual_completion: manual,
        generated_at: Utc::now(),
    }
}

/// Exact receiver-type comparison: `(m *MockStore)` matches `MockStore`
/// but `(m *MockStoreX)` does not.
fn receiver_type_matches(receiver_text: &str, type_name: &str) -> bool {
    let inner = receiver_text
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')');
    let ty = inner.split_whitespace().last().unwrap_or("");
    ty.trim_start_matches('*') == type_name
}

fn default_mock_path(package_dir: &Path, component: &str) -> PathBuf {
    package_dir.join(format!("{}_mock.go", component.to_lowercase()))
}

/// Names of all methods declared on `type_name` (pointer or value
/// receiver) across the package's Go files. Used by the validation
/// engine to compare a mock's method set against its interface.
pub fn mock_method_names(package_dir: &Path, type_name: &str) -> Vec<String> {
    let Ok(files) = go_files(package_dir) else {
        return Vec::new();
    };
    let mut names = Vec::new();
    for file in files {
        let Ok(source) = fs::read_to_string(&file) else {
            continue;
        };
        let Ok(tree) = go::parse_source(&source) else {
            continue;
        };
        let root = tree.root_node();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if child.kind() != "method_declaration" {
                continue;
            }
            let Some(receiver) = child.child_by_field_name("receiver") else {
                continue;
            };
            let receiver_text = go::node_text(&receiver, source.as_str());
            if !receiver_type_matches(receiver_text, type_name) {
                continue;
            }
            if let Some(name) = child.child_by_field_name("name") {
                names.push(go::node_text(&name, source.as_str()).to_string());
            }
        }
    }
    names
}

struct FoundInterface {
    methods: Vec<MethodSignature>,
    package: String,
}

fn locate_interface(
    package_dir: &Path,
    interface_name: &str,
) -> Result<FoundInterface, MockError> {
    for file in go_files(package_dir)? {
        let source = match fs::read_to_string(&file) {
            Ok(source) => source,
            Err(err) => {
                debug!("skipping unreadable {}: {err}", file.display());
                continue;
            }
        };
        let tree = go::parse_source(&source)
            .map_err(|_| MockError::Parse { path: file.clone() })?;
        if let Some(methods) = extract_interface(tree.root_node(), &source, interface_name) {
            let package = go::package_name(&tree, &source).unwrap_or_default();
            debug!(
                "found interface {interface_name} in {} ({} methods)",
                file.display(),
                methods.len()
            );
            return Ok(FoundInterface { methods, package });
        }
    }
    Err(MockError::InterfaceNotFound {
        interface: interface_name.to_string(),
        package: package_dir.to_path_buf(),
    })
}

/// `*.go` files directly in the package directory, then directly in its
/// `internal/` subfolder.
fn go_files(package_dir: &Path) -> Result<Vec<PathBuf>, MockError> {
    let mut files = list_go_files(package_dir).map_err(|source| MockError::Io {
        path: package_dir.to_path_buf(),
        source,
    })?;
    let internal = package_dir.join("internal");
    if internal.is_dir() {
        files.extend(list_go_files(&internal).unwrap_or_default());
    }
    Ok(files)
}

fn list_go_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("go"))
        .collect();
    files.sort();
    Ok(files)
}

fn extract_interface(root: Node, source: &str, interface_name: &str) -> Option<Vec<MethodSignature>> {
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() != "type_declaration" {
            continue;
        }
        let mut specs = child.walk();
        for spec in child.named_children(&mut specs) {
            if spec.kind() != "type_spec" {
                continue;
            }
            let Some(name) = spec.child_by_field_name("name") else {
                continue;
            };
            if go::node_text(&name, source) != interface_name {
                continue;
            }
            let Some(body) = spec.child_by_field_name("type") else {
                continue;
            };
            if body.kind() != "interface_type" {
                continue;
            }
            return Some(interface_methods(body, source));
        }
    }
    None
}

fn interface_methods(interface_type: Node, source: &str) -> Vec<MethodSignature> {
    let mut methods = Vec::new();
    let mut cursor = interface_type.walk();
    for member in interface_type.named_children(&mut cursor) {
        // Embedded interfaces (bare type names) are not expanded.
        if !matches!(member.kind(), "method_elem" | "method_spec") {
            continue;
        }
        let Some(name) = member.child_by_field_name("name") else {
            continue;
        };
        let parameters = member
            .child_by_field_name("parameters")
            .map(|p| extract_parameters(p, source))
            .unwrap_or_default();
        let returns = member
            .child_by_field_name("result")
            .map(|r| extract_returns(r, source))
            .unwrap_or_default();
        methods.push(MethodSignature {
            name: go::node_text(&name, source).to_string(),
            parameters,
            returns,
        });
    }
    methods
}

fn extract_parameters(list: Node, source: &str) -> Vec<Parameter> {
    let mut params = Vec::new();
    let mut cursor = list.walk();
    for decl in list.named_children(&mut cursor) {
        let variadic = decl.kind() == "variadic_parameter_declaration";
        if !variadic && decl.kind() != "parameter_declaration" {
            continue;
        }
        let type_name = decl
            .child_by_field_name("type")
            .map(|t| go::node_text(&t, source).to_string())
            .unwrap_or_default();
        let type_name = if variadic {
            format!("...{type_name}")
        } else {
            type_name
        };
        let names: Vec<String> = {
            let mut inner = decl.walk();
            decl.named_children(&mut inner)
                .filter(|c| c.kind() == "identifier")
                .map(|c| go::node_text(&c, source).to_string())
                .collect()
        };
        if names.is_empty() {
            params.push(Parameter {
                name: String::new(),
                type_name,
            });
        } else {
            for name in names {
                params.push(Parameter {
                    name,
                    type_name: type_name.clone(),
                });
            }
        }
    }
    params
}

fn extract_returns(result: Node, source: &str) -> Vec<ReturnValue> {
    if result.kind() != "parameter_list" {
        return vec![ReturnValue {
            name: String::new(),
            type_name: go::node_text(&result, source).to_string(),
        }];
    }
    extract_parameters(result, source)
        .into_iter()
        .map(|p| ReturnValue {
            name: p.name,
            type_name: p.type_name,
        })
        .collect()
}

/// Render the complete mock; `None` when a zero value or import cannot
/// be resolved for some method.
fn render(
    component: &str,
    interface_name: &str,
    package: &str,
    methods: &[MethodSignature],
    convention: &MockConvention,
) -> Option<String> {
    let imports = resolve_imports(methods)?;
    let mut bodies = String::new();
    for method in methods {
        let zeros: Option<Vec<String>> = method
            .returns
            .iter()
            .map(|r| zero_value(&r.type_name))
            .collect();
        let zeros = zeros?;
        let return_stmt = if zeros.is_empty() {
            String::new()
        } else {
            format!("\treturn {}\n", zeros.join(", "))
        };
        bodies.push_str(&format!(
            "// {name} records the call and returns zero values.\n\
             func (m *{mock}) {sig} {{\n\tm.recordCall(\"{name}\")\n{ret}}}\n\n",
            name = method.name,
            mock = convention.struct_name(component),
            sig = signature(method),
            ret = return_stmt,
        ));
    }
    Some(assemble(
        component,
        interface_name,
        package,
        &imports,
        bodies.trim_end(),
        convention,
    ))
}

/// Template variant: identical structure, but every method body panics
/// with a completion marker.
fn render_template(
    component: &str,
    interface_name: &str,
    package: &str,
    methods: &[MethodSignature],
    convention: &MockConvention,
) -> String {
    let mock_name = convention.struct_name(component);
    let imports = resolve_imports(methods).unwrap_or_else(|| vec!["sync".to_string()]);
    let mut bodies = String::new();
    for method in methods {
        bodies.push_str(&format!(
            "func (m *{mock_name}) {sig} {{\n\
             \tm.recordCall(\"{name}\")\n\
             \tpanic(\"TODO: implement {mock_name}.{name}\")\n}}\n\n",
            name = method.name,
            sig = signature(method),
        ));
    }
    assemble(
        component,
        interface_name,
        package,
        &imports,
        bodies.trim_end(),
        convention,
    )
}

fn assemble(
    component: &str,
    interface_name: &str,
    package: &str,
    imports: &[String],
    method_bodies: &str,
    convention: &MockConvention,
) -> String {
    let mock_name = convention.struct_name(component);
    let option_name = convention.option_name(component);
    let constructor = convention.constructor_name(component);

    let import_block = if imports.len() == 1 {
        format!("import \"{}\"", imports[0])
    } else {
        let lines: Vec<String> = imports.iter().map(|i| format!("\t\"{i}\"")).collect();
        format!("import (\n{}\n)", lines.join("\n"))
    };

    let mut out = format!(
        "// Code generated by testmedic; review before committing.\n\n\
         package {package}\n\n\
         {import_block}\n\n\
         // {mock_name} is a test double for {interface_name}.\n\
         type {mock_name} struct {{\n\
         \tmu    sync.Mutex\n\
         \tcalls map[string]int\n\
         }}\n\n\
         // {option_name} configures a {mock_name}.\n\
         type {option_name} func(*{mock_name})\n\n\
         // {constructor} builds a {mock_name}; options are applied in order.\n\
         func {constructor}(opts ...{option_name}) *{mock_name} {{\n\
         \tm := &{mock_name}{{calls: make(map[string]int)}}\n\
         \tfor _, opt := range opts {{\n\
         \t\topt(m)\n\
         \t}}\n\
         \treturn m\n\
         }}\n\n\
         func (m *{mock_name}) recordCall(name string) {{\n\
         \tm.mu.Lock()\n\
         \tdefer m.mu.Unlock()\n\
         \tm.calls[name]++\n\
         }}\n\n\
         // CallCount reports how many times the named method was invoked.\n\
         func (m *{mock_name}) CallCount(name string) int {{\n\
         \tm.mu.Lock()\n\
         \tdefer m.mu.Unlock()\n\
         \treturn m.calls[name]\n\
         }}\n",
    );
    if !method_bodies.is_empty() {
        out.push('\n');
        out.push_str(method_bodies);
        out.push('\n');
    }
    out
}

fn signature(method: &MethodSignature) -> String {
    let params: Vec<String> = method
        .parameters
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let name = if p.name.is_empty() {
                format!("arg{i}")
            } else {
                p.name.clone()
            };
            format!("{name} {}", p.type_name)
        })
        .collect();
    let returns: Vec<&str> = method.returns.iter().map(|r| r.type_name.as_str()).collect();
    let ret = match returns.len() {
        0 => String::new(),
        1 => format!(" {}", returns[0]),
        _ => format!(" ({})", returns.join(", ")),
    };
    format!("{}({}){ret}", method.name, params.join(", "))
}

/// Import paths needed by the method signatures; `None` when a type
/// refers to a package qualifier we cannot map to an import path.
fn resolve_imports(methods: &[MethodSignature]) -> Option<Vec<String>> {
    let mut qualifiers: BTreeSet<&str> = BTreeSet::new();
    for method in methods {
        for type_name in method
            .parameters
            .iter()
            .map(|p| p.type_name.as_str())
            .chain(method.returns.iter().map(|r| r.type_name.as_str()))
        {
            for qualifier in type_qualifiers(type_name) {
                qualifiers.insert(qualifier);
            }
        }
    }

    let mut imports = vec!["sync".to_string()];
    for qualifier in qualifiers {
        imports.push(import_path(qualifier)?.to_string());
    }
    imports.sort();
    imports.dedup();
    Some(imports)
}

fn type_qualifiers(type_name: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let bytes = type_name.as_bytes();
    let mut start = None;
    for (i, &b) in bytes.iter().enumerate() {
        if b.is_ascii_alphanumeric() || b == b'_' {
            if start.is_none() {
                start = Some(i);
            }
        } else {
            if b == b'.' {
                if let Some(s) = start {
                    out.push(&type_name[s..i]);
                }
            }
            start = None;
        }
    }
    out
}

fn import_path(qualifier: &str) -> Option<&'static str> {
    match qualifier {
        "context" => Some("context"),
        "time" => Some("time"),
        "io" => Some("io"),
        "fmt" => Some("fmt"),
        "bytes" => Some("bytes"),
        "strings" => Some("strings"),
        "http" => Some("net/http"),
        "url" => Some("net/url"),
        "sql" => Some("database/sql"),
        "json" => Some("encoding/json"),
        _ => None,
    }
}

/// Zero-valued placeholder for a declared return type; `None` for types
/// we cannot safely guess.
fn zero_value(type_name: &str) -> Option<String> {
    let t = type_name.trim();
    if t.starts_with('*')
        || t.starts_with("[]")
        || t.starts_with("map[")
        || t.starts_with("chan")
        || t.starts_with("<-chan")
        || t.starts_with("func")
        || t.starts_with("interface{")
    {
        return Some("nil".to_string());
    }
    match t {
        "string" => Some("\"\"".to_string()),
        "bool" => Some("false".to_string()),
        "error" | "any" | "context.Context" => Some("nil".to_string()),
        "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16" | "uint32"
        | "uint64" | "uintptr" | "byte" | "rune" | "float32" | "float64" | "complex64"
        | "complex128" | "time.Duration" => Some("0".to_string()),
        "time.Time" => Some("time.Time{}".to_string()),
        _ => None,
    }
}
