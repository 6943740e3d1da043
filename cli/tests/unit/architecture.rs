//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries
//! (domain → application → infra/output → commands) hold.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

fn src_dir(sub: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src").join(sub)
}

fn rel(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string()
        .replace('\\', "/")
}

fn is_test_start(trimmed: &str) -> bool {
    trimmed.starts_with("#[cfg(test)]") || trimmed.starts_with("#[cfg(all(test")
}

/// Non-comment lines up to the first test module, with 1-based line numbers.
fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .enumerate()
        .take_while(|(_, l)| !is_test_start(l.trim()))
        .filter(|(_, l)| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(|(i, l)| (i + 1, l.to_string()))
        .collect()
}

/// Skip test support modules that only exist under `#[cfg(test)]`.
fn is_test_support(file: &Path) -> bool {
    let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    matches!(name, "test_support.rs" | "testing.rs" | "tests.rs")
}

/// Flag any production line in `dir` containing one of `patterns`.
fn forbid(dir: &Path, patterns: &[&str], exempt: impl Fn(&str) -> bool) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let rel = rel(&file);
        if is_test_support(&file) || exempt(&rel) {
            continue;
        }
        for (lineno, line) in production_lines(&file) {
            for pattern in patterns {
                if line.contains(pattern) {
                    violations.push(format!("{rel}:{lineno}: `{pattern}`: {}", line.trim()));
                }
            }
        }
    }
    violations
}

#[test]
fn domain_is_pure() {
    let violations = forbid(
        &src_dir("domain"),
        &[
            "tokio::",
            "std::fs",
            "reqwest",
            "crate::application",
            "crate::infra",
            "crate::output",
            "crate::commands",
        ],
        |_| false,
    );
    assert!(
        violations.is_empty(),
        "domain/ must stay free of I/O and outer layers:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_depends_only_on_domain() {
    let violations = forbid(
        &src_dir("application"),
        &[
            "crate::infra",
            "crate::output",
            "crate::commands",
            "std::fs::",
            "std::net::",
            "std::process::Command",
            "reqwest",
        ],
        |_| false,
    );
    assert!(
        violations.is_empty(),
        "application/ must reach the outside world through ports only:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let violations = forbid(
        &src_dir("infra"),
        &["crate::commands", "crate::output"],
        |_| false,
    );
    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let violations = forbid(&src_dir("infra"), &["println!", "eprintln!"], |_| false);
    assert!(
        violations.is_empty(),
        "infra/ must not use println!/eprintln! outside tests:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_tokio_command_runner_new_outside_infra() {
    let violations = forbid(&src_dir(""), &["TokioCommandRunner::new"], |rel| {
        rel.contains("/infra/") || rel.ends_with("/app.rs")
    });
    assert!(
        violations.is_empty(),
        "Construct process runners in infra/ or app.rs only:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_concrete_adapters_in_service_signatures() {
    let concrete = [
        "CfApiClient",
        "RegistryClient",
        "LocalArtifacts",
        "TokioCommandRunner",
        "CfCli<",
    ];
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir("application")) {
        let rel = rel(&file);
        for (lineno, line) in production_lines(&file) {
            if !line.contains("fn ") && !line.contains(": &") {
                continue;
            }
            for name in &concrete {
                if line.contains(name) {
                    violations.push(format!("{rel}:{lineno}: concrete `{name}`: {}", line.trim()));
                }
            }
        }
    }
    assert!(
        violations.is_empty(),
        "Services take port trait bounds, not adapters:\n{}",
        violations.join("\n")
    );
}

/// Track brace depth to find lines inside an async fn but outside `spawn_blocking`.
struct AsyncContextTracker {
    in_async_fn: bool,
    in_spawn_blocking: bool,
    brace_depth: i32,
    async_fn_start_depth: i32,
    spawn_blocking_start_depth: i32,
}

impl AsyncContextTracker {
    fn new() -> Self {
        Self {
            in_async_fn: false,
            in_spawn_blocking: false,
            brace_depth: 0,
            async_fn_start_depth: 0,
            spawn_blocking_start_depth: 0,
        }
    }

    fn process_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.contains("async fn ") {
            self.in_async_fn = true;
            self.async_fn_start_depth = self.brace_depth;
        } else if trimmed.contains("fn ") && !trimmed.contains("async ") {
            self.in_async_fn = false;
            self.in_spawn_blocking = false;
        }
        if self.in_async_fn && line.contains("spawn_blocking") {
            self.in_spawn_blocking = true;
            self.spawn_blocking_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_spawn_blocking && self.brace_depth <= self.spawn_blocking_start_depth
                    {
                        self.in_spawn_blocking = false;
                    }
                    if self.in_async_fn && self.brace_depth <= self.async_fn_start_depth {
                        self.in_async_fn = false;
                    }
                }
                _ => {}
            }
        }
        self.in_async_fn && !self.in_spawn_blocking
    }
}

#[test]
fn infra_async_functions_do_not_use_blocking_fs() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir("infra")) {
        if is_test_support(&file) {
            continue;
        }
        let rel = rel(&file);
        let mut tracker = AsyncContextTracker::new();
        for (lineno, line) in production_lines(&file) {
            if tracker.process_line(&line) && line.contains("std::fs::") {
                violations.push(format!("{rel}:{lineno}: {}", line.trim()));
            }
        }
    }
    assert!(
        violations.is_empty(),
        "infra/ async functions must not use blocking std::fs outside spawn_blocking:\n{}",
        violations.join("\n")
    );
}

#[test]
fn command_handlers_accept_app_context() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir("commands")) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        if content.contains("pub async fn run(") && !content.contains("app: &AppContext") {
            violations.push(rel(&file));
        }
    }
    assert!(
        violations.is_empty(),
        "Async command handlers must accept &AppContext:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_module_level_dead_code_allows_in_layers() {
    let mut violations = Vec::new();
    for dir in ["domain", "application", "infra", "output", "commands"] {
        for file in collect_rs_files(&src_dir(dir)) {
            let Ok(content) = std::fs::read_to_string(&file) else {
                continue;
            };
            for (i, line) in content.lines().enumerate() {
                if line.trim() == "#![allow(dead_code)]" {
                    violations.push(format!("{}:{}", rel(&file), i + 1));
                }
            }
        }
    }
    assert!(
        violations.is_empty(),
        "Module-level #![allow(dead_code)] found; use item-level suppression:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_unwrap_or_expect_in_production_code() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir("")) {
        if is_test_support(&file) {
            continue;
        }
        let rel = rel(&file);
        if rel.ends_with("output/progress.rs") {
            continue;
        }
        for (lineno, line) in production_lines(&file) {
            if line.contains(".unwrap()") || line.contains(".expect(") {
                violations.push(format!("{rel}:{lineno}: {}", line.trim()));
            }
        }
    }
    assert!(
        violations.is_empty(),
        "Propagate errors instead of unwrapping:\n{}",
        violations.join("\n")
    );
}

#[test]
fn command_handlers_are_reasonably_sized() {
    const LIMIT: usize = 150;
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir("commands")) {
        let count = production_lines(&file)
            .iter()
            .filter(|(_, l)| !l.trim().is_empty())
            .count();
        if count > LIMIT {
            violations.push(format!("{}: {count} non-test lines (limit: {LIMIT})", rel(&file)));
        }
    }
    assert!(
        violations.is_empty(),
        "Command handler files are too long; move logic into application services:\n{}",
        violations.join("\n")
    );
}
