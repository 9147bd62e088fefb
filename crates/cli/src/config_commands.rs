use std::path::Path;

use {
    anyhow::Result,
    drivelink_config::{Severity, ValidationResult},
};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Load the config at `path` and print its diagnostics. Fails when the file
/// cannot be loaded or any diagnostic is an error.
pub fn check(path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    let config = match drivelink_config::load_or_default(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("  {BOLD}{RED}error{RESET} {e:#}\n");
            eprintln!("1 error(s), 0 warning(s)");
            anyhow::bail!("configuration could not be loaded");
        },
    };

    let result = drivelink_config::validate(&config);
    print_diagnostics(&result);

    let errors = result.count(Severity::Error);
    if errors > 0 {
        anyhow::bail!("configuration has {errors} error(s)");
    }
    Ok(())
}

/// Warnings and errors, one per line, followed by a tally.
pub fn print_diagnostics(result: &ValidationResult) {
    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if !result.diagnostics.is_empty() {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, std::path::PathBuf};

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("drivelink.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_pass_with_warnings() {
        assert!(check(None).is_ok());
    }

    #[test]
    fn errors_fail_the_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[relay]\nsize_limit_mb = 0\n");
        let err = check(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("1 error(s)"));
    }

    #[test]
    fn unparseable_file_fails_the_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[relay]\nsize_limit_mb = \"not a number\"\noversize_policy = \"reject\"\n",
        );
        let err = check(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("could not be loaded"));
    }
}
