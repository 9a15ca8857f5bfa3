use std::path::Path;

use weld_model::ValidationSpec;

/// Outcome of checking one post-run assertion against the live system.
#[derive(Debug, Clone)]
pub struct PostRunResult {
    pub index: usize,
    pub description: String,
    pub passed: bool,
    pub message: String,
}

/// Check every post-run assertion a document declared. Each check is
/// independent of the others and of whatever apply/verify run preceded it —
/// a document with no `validations` yields an empty, trivially-passing list.
pub fn run(validations: &[ValidationSpec]) -> Vec<PostRunResult> {
    validations
        .iter()
        .enumerate()
        .map(|(index, spec)| check(index, spec))
        .collect()
}

pub fn all_passed(results: &[PostRunResult]) -> bool {
    results.iter().all(|r| r.passed)
}

fn check(index: usize, spec: &ValidationSpec) -> PostRunResult {
    let description = spec.describe();
    let (passed, message) = match spec {
        ValidationSpec::CommandExists { command } => {
            if command_on_path(command) {
                (true, format!("`{command}` found on PATH"))
            } else {
                (false, format!("`{command}` not found on PATH"))
            }
        }
        ValidationSpec::FileExists { path } => {
            if Path::new(path).exists() {
                (true, format!("`{path}` exists"))
            } else {
                (false, format!("`{path}` does not exist"))
            }
        }
        ValidationSpec::PathContains { file, text } => match std::fs::read_to_string(file) {
            Ok(contents) if contents.contains(text.as_str()) => {
                (true, format!("`{file}` contains `{text}`"))
            }
            Ok(_) => (false, format!("`{file}` does not contain `{text}`")),
            Err(e) => (false, format!("could not read `{file}`: {e}")),
        },
    };
    PostRunResult { index, description, passed, message }
}

/// Mirrors what a shell's own lookup does: split `PATH` on the platform
/// separator and check each directory for an executable file of that name.
fn command_on_path(command: &str) -> bool {
    if Path::new(command).is_absolute() {
        return is_executable_file(Path::new(command));
    }
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| is_executable_file(&dir.join(command)))
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn command_exists_finds_true_on_path() {
        let results = run(&[ValidationSpec::CommandExists { command: "true".into() }]);
        assert!(results[0].passed);
    }

    #[test]
    fn command_exists_reports_missing_command() {
        let results =
            run(&[ValidationSpec::CommandExists { command: "definitely-not-a-real-binary".into() }]);
        assert!(!results[0].passed);
    }

    #[test]
    fn file_exists_checks_real_path() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("marker");
        std::fs::write(&file, "hi").unwrap();

        let results = run(&[ValidationSpec::FileExists { path: file.to_str().unwrap().to_string() }]);
        assert!(results[0].passed);
    }

    #[test]
    fn path_contains_matches_substring() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("config");
        std::fs::write(&file, "enable_feature = true\n").unwrap();

        let results = run(&[ValidationSpec::PathContains {
            file: file.to_str().unwrap().to_string(),
            text: "enable_feature".to_string(),
        }]);
        assert!(results[0].passed);
    }

    #[test]
    fn path_contains_reports_missing_substring() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("config");
        std::fs::write(&file, "nothing here\n").unwrap();

        let results = run(&[ValidationSpec::PathContains {
            file: file.to_str().unwrap().to_string(),
            text: "enable_feature".to_string(),
        }]);
        assert!(!results[0].passed);
    }

    #[test]
    fn all_passed_is_false_on_any_failure() {
        let results = run(&[
            ValidationSpec::CommandExists { command: "true".into() },
            ValidationSpec::CommandExists { command: "definitely-not-a-real-binary".into() },
        ]);
        assert!(!all_passed(&results));
    }
}
