//! Configuration for a bisection run.
//!
//! Two layers, following the file → CLI precedence rule (CLI wins):
//! - `SectToml` — optional per-repository defaults read from
//!   `<repo>/.gitsect.toml`
//! - `BisectConfig` — the fully resolved runtime configuration the
//!   controller consumes
//!
//! # Configuration File Format
//!
//! ```toml
//! [build]
//! command = "make"
//! args = ["-j4", "all"]
//!
//! [test]
//! command = "./scripts/regress.sh"
//! marker = "AssertionError"
//!
//! [run]
//! max_skips = 50
//! tmp_dir = "~/tmp"
//! ```

use crate::classify::{ClassifierKind, MarkerClassifier};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name looked up inside the repository working tree.
pub const CONFIG_FILE: &str = ".gitsect.toml";

/// Build-procedure defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildSection {
    /// Build program (no build step when absent)
    #[serde(default)]
    pub command: Option<String>,
    /// Ordered extra arguments appended to the build program
    #[serde(default)]
    pub args: Vec<String>,
}

/// Test-procedure defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestSection {
    /// Path to the executable test script
    #[serde(default)]
    pub command: Option<String>,
    /// Failure marker scanned for in the test's stderr
    #[serde(default)]
    pub marker: Option<String>,
}

/// Run-behavior defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// Abort after this many skipped revisions (0 disables the guard)
    #[serde(default = "default_max_skips")]
    pub max_skips: u32,
    /// Scratch directory for per-step output logs
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: String,
}

fn default_max_skips() -> u32 {
    50
}

fn default_tmp_dir() -> String {
    "~/tmp".to_string()
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            max_skips: default_max_skips(),
            tmp_dir: default_tmp_dir(),
        }
    }
}

/// The complete `.gitsect.toml` structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectToml {
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub test: TestSection,
    #[serde(default)]
    pub run: RunSection,
}

impl SectToml {
    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse .gitsect.toml")
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Load configuration from the repository working tree, or defaults if
    /// no file exists there.
    pub fn load_or_default(repo_dir: &Path) -> Result<Self> {
        let config_path = repo_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// CLI-provided values layered over the file configuration.
///
/// `None` means the flag was not given and the file value (or built-in
/// default) applies. Build command and arguments resolve as a pair: explicit
/// `--build-arg`s always win, otherwise the file's argument list rides along
/// with whichever command was selected.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub repo: PathBuf,
    pub test: Option<String>,
    pub build: Option<String>,
    pub build_args: Vec<String>,
    pub marker: Option<String>,
    pub classifier: ClassifierKind,
    pub max_skips: Option<u32>,
    pub tmp_dir: Option<String>,
}

/// Fully resolved configuration for one bisection run.
#[derive(Debug, Clone)]
pub struct BisectConfig {
    /// Canonicalized repository working tree
    pub repo_path: PathBuf,
    /// Test procedure, `~`-expanded and absolutized when it names a file
    pub test_command: String,
    /// Optional build program
    pub build_command: Option<String>,
    /// Ordered extra build arguments
    pub build_args: Vec<String>,
    /// Failure marker for the marker classifier
    pub marker: String,
    /// Classification strategy
    pub classifier: ClassifierKind,
    /// Abort after this many skips (0 disables the guard)
    pub max_skips: u32,
    /// Scratch directory for step logs, `~`-expanded
    pub tmp_dir: PathBuf,
}

impl BisectConfig {
    /// Merge CLI values over the file configuration and validate paths.
    pub fn resolve(cli: CliOverrides, file: &SectToml) -> Result<Self> {
        let repo_path = cli.repo.canonicalize().with_context(|| {
            format!("Failed to resolve repository directory {}", cli.repo.display())
        })?;

        let test_command = cli
            .test
            .or_else(|| file.test.command.clone())
            .context("No test procedure given (pass TEST or set [test] command in .gitsect.toml)")?;
        let test_command = resolve_test_command(&test_command);

        let build_command = cli.build.or_else(|| file.build.command.clone());
        let build_args = if cli.build_args.is_empty() {
            file.build.args.clone()
        } else {
            cli.build_args
        };

        let marker = cli
            .marker
            .or_else(|| file.test.marker.clone())
            .unwrap_or_else(|| MarkerClassifier::DEFAULT_MARKER.to_string());

        let max_skips = cli.max_skips.unwrap_or(file.run.max_skips);
        let tmp_dir = expand_tilde(&cli.tmp_dir.unwrap_or_else(|| file.run.tmp_dir.clone()));

        Ok(Self {
            repo_path,
            test_command,
            build_command,
            build_args,
            marker,
            classifier: cli.classifier,
            max_skips,
            tmp_dir,
        })
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Expand `~` in the test procedure and pin it to an absolute path when it
/// names an existing file, so the later cwd switch into the repository
/// cannot change what it refers to. Bare program names are left for PATH
/// lookup.
fn resolve_test_command(command: &str) -> String {
    let expanded = expand_tilde(command);
    if expanded.exists()
        && let Ok(absolute) = expanded.canonicalize()
    {
        return absolute.to_string_lossy().into_owned();
    }
    expanded.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cli_for(repo: &Path) -> CliOverrides {
        CliOverrides {
            repo: repo.to_path_buf(),
            test: Some("run-tests".to_string()),
            ..Default::default()
        }
    }

    // =========================================
    // SectToml parsing
    // =========================================

    #[test]
    fn parse_empty_yields_defaults() {
        let toml = SectToml::parse("").unwrap();
        assert!(toml.build.command.is_none());
        assert!(toml.test.command.is_none());
        assert!(toml.test.marker.is_none());
        assert_eq!(toml.run.max_skips, 50);
        assert_eq!(toml.run.tmp_dir, "~/tmp");
    }

    #[test]
    fn parse_full_file() {
        let content = r#"
[build]
command = "make"
args = ["-j4", "all"]

[test]
command = "./scripts/regress.sh"
marker = "REGRESSION"

[run]
max_skips = 10
tmp_dir = "/var/tmp/sect"
"#;
        let toml = SectToml::parse(content).unwrap();
        assert_eq!(toml.build.command.as_deref(), Some("make"));
        assert_eq!(toml.build.args, vec!["-j4", "all"]);
        assert_eq!(toml.test.command.as_deref(), Some("./scripts/regress.sh"));
        assert_eq!(toml.test.marker.as_deref(), Some("REGRESSION"));
        assert_eq!(toml.run.max_skips, 10);
        assert_eq!(toml.run.tmp_dir, "/var/tmp/sect");
    }

    #[test]
    fn parse_partial_run_section_keeps_other_defaults() {
        let toml = SectToml::parse("[run]\nmax_skips = 5\n").unwrap();
        assert_eq!(toml.run.max_skips, 5);
        assert_eq!(toml.run.tmp_dir, "~/tmp");
    }

    #[test]
    fn parse_rejects_malformed_toml() {
        let err = SectToml::parse("[build\ncommand = ").unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let toml = SectToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml.run.max_skips, 50);
        assert!(toml.test.command.is_none());
    }

    #[test]
    fn load_or_default_reads_existing_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[run]\nmax_skips = 3\n").unwrap();
        let toml = SectToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml.run.max_skips, 3);
    }

    // =========================================
    // Resolution and precedence
    // =========================================

    #[test]
    fn resolve_rejects_missing_repository_directory() {
        let cli = cli_for(Path::new("/gitsect-does-not-exist"));
        let err = BisectConfig::resolve(cli, &SectToml::default()).unwrap_err();
        assert!(
            err.to_string()
                .contains("Failed to resolve repository directory")
        );
    }

    #[test]
    fn resolve_requires_a_test_procedure_from_somewhere() {
        let dir = tempdir().unwrap();
        let mut cli = cli_for(dir.path());
        cli.test = None;
        let err = BisectConfig::resolve(cli, &SectToml::default()).unwrap_err();
        assert!(err.to_string().contains("No test procedure"));
    }

    #[test]
    fn resolve_applies_builtin_defaults() {
        let dir = tempdir().unwrap();
        let config = BisectConfig::resolve(cli_for(dir.path()), &SectToml::default()).unwrap();
        assert_eq!(config.marker, "AssertionError");
        assert_eq!(config.max_skips, 50);
        assert!(config.build_command.is_none());
        assert!(config.build_args.is_empty());
        assert_eq!(config.classifier, ClassifierKind::Marker);
        assert_eq!(config.repo_path, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn resolve_takes_file_values_when_cli_is_silent() {
        let dir = tempdir().unwrap();
        let file = SectToml::parse(
            r#"
[build]
command = "make"
args = ["tseries"]

[test]
command = "./t.sh"
marker = "FAILED"

[run]
max_skips = 7
"#,
        )
        .unwrap();

        let mut cli = cli_for(dir.path());
        cli.test = None;
        let config = BisectConfig::resolve(cli, &file).unwrap();
        assert_eq!(config.test_command, "./t.sh");
        assert_eq!(config.build_command.as_deref(), Some("make"));
        assert_eq!(config.build_args, vec!["tseries"]);
        assert_eq!(config.marker, "FAILED");
        assert_eq!(config.max_skips, 7);
    }

    #[test]
    fn resolve_lets_cli_override_the_file() {
        let dir = tempdir().unwrap();
        let file = SectToml::parse(
            r#"
[build]
command = "make"

[test]
marker = "FAILED"

[run]
max_skips = 7
tmp_dir = "/file/tmp"
"#,
        )
        .unwrap();

        let cli = CliOverrides {
            repo: dir.path().to_path_buf(),
            test: Some("run-tests".to_string()),
            build: Some("cargo".to_string()),
            build_args: vec!["build".to_string()],
            marker: Some("panicked".to_string()),
            classifier: ClassifierKind::ExitCode,
            max_skips: Some(2),
            tmp_dir: Some("/cli/tmp".to_string()),
        };
        let config = BisectConfig::resolve(cli, &file).unwrap();
        assert_eq!(config.build_command.as_deref(), Some("cargo"));
        assert_eq!(config.build_args, vec!["build"]);
        assert_eq!(config.marker, "panicked");
        assert_eq!(config.classifier, ClassifierKind::ExitCode);
        assert_eq!(config.max_skips, 2);
        assert_eq!(config.tmp_dir, PathBuf::from("/cli/tmp"));
    }

    #[test]
    fn resolve_pairs_cli_build_with_file_args_when_none_given() {
        let dir = tempdir().unwrap();
        let file = SectToml::parse("[build]\ncommand = \"make\"\nargs = [\"-j4\"]\n").unwrap();
        let mut cli = cli_for(dir.path());
        cli.build = Some("gmake".to_string());
        let config = BisectConfig::resolve(cli, &file).unwrap();
        assert_eq!(config.build_command.as_deref(), Some("gmake"));
        assert_eq!(config.build_args, vec!["-j4"]);
    }

    #[test]
    fn resolve_absolutizes_an_existing_test_script() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("t.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();

        let mut cli = cli_for(dir.path());
        cli.test = Some(script.to_string_lossy().into_owned());
        let config = BisectConfig::resolve(cli, &SectToml::default()).unwrap();
        assert!(Path::new(&config.test_command).is_absolute());
        assert!(config.test_command.ends_with("t.sh"));
    }

    // =========================================
    // Path expansion
    // =========================================

    #[test]
    fn expand_tilde_prefixed_path() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_tilde("~/tmp"), home.join("tmp"));
        assert_eq!(expand_tilde("~"), home);
    }

    #[test]
    fn expand_leaves_plain_paths_untouched() {
        assert_eq!(expand_tilde("/var/tmp"), PathBuf::from("/var/tmp"));
        assert_eq!(expand_tilde("relative/dir"), PathBuf::from("relative/dir"));
    }

    #[test]
    fn resolve_expands_tilde_in_tmp_dir() {
        let dir = tempdir().unwrap();
        let config = BisectConfig::resolve(cli_for(dir.path()), &SectToml::default()).unwrap();
        let home = dirs::home_dir().unwrap();
        assert_eq!(config.tmp_dir, home.join("tmp"));
    }
}
