// Grader configuration: defaults file merged with command-line overrides
use crate::error::FatalError;
use crate::types::Credentials;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Hard per-command limit when nothing else is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Environment variable naming an alternative defaults file
pub const CONFIG_ENV: &str = "GRADE_CONFIG";

/// Contents of the defaults file; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub credentials: Option<Credentials>,
    pub digital: Option<PathBuf>,
    pub org: Option<String>,
    pub project: Option<String>,
    pub students: Vec<String>,
    pub tests_path: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Load a defaults file; a missing file yields empty defaults
    pub fn load(path: &Path) -> Result<Self, FatalError> {
        if !path.exists() {
            debug!(path = %path.display(), "No defaults file");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            FatalError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            FatalError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// `$GRADE_CONFIG`, else `$HOME/.config/grade/config.toml`
    pub fn load_default() -> Result<Self, FatalError> {
        match default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}

fn default_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| Path::new(&home).join(".config/grade/config.toml"))
}

/// Expand a leading `~/` against `$HOME`
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var("HOME")) {
        (Ok(rest), Ok(home)) => Path::new(&home).join(rest),
        _ => path.to_path_buf(),
    }
}

/// Diagnostic switches; each is independent except that `show_both`
/// implies `show_diff`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verbosity {
    /// Print a diff when a test fails
    pub show_diff: bool,
    /// Print expected and actual for every test
    pub show_both: bool,
    /// Echo every command and its output
    pub echo_commands: bool,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, verbose2: bool, very_verbose: bool) -> Self {
        Self {
            show_diff: verbose || verbose2,
            show_both: verbose2,
            echo_commands: very_verbose,
        }
    }
}

/// Values given on the command line; `None` defers to the defaults file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub credentials: Option<Credentials>,
    pub digital: Option<PathBuf>,
    pub local: Option<PathBuf>,
    pub test_name: Option<String>,
    pub org: Option<String>,
    pub project: Option<String>,
    pub students: Vec<String>,
    pub tests_path: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub verbosity: Verbosity,
}

/// The single configuration value passed to every component
#[derive(Debug, Clone)]
pub struct GraderConfig {
    pub credentials: Credentials,
    pub digital: Option<PathBuf>,
    pub local: Option<PathBuf>,
    pub test_name: Option<String>,
    pub org: Option<String>,
    pub project: Option<String>,
    pub students: Vec<String>,
    pub tests_path: Option<PathBuf>,
    pub timeout: Duration,
    pub verbosity: Verbosity,
}

impl GraderConfig {
    pub fn resolve(file: ConfigFile, overrides: ConfigOverrides) -> Self {
        let students = if overrides.students.is_empty() {
            file.students
        } else {
            overrides.students
        };
        let timeout_secs = overrides
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            credentials: overrides.credentials.or(file.credentials).unwrap_or_default(),
            digital: overrides.digital.or(file.digital).map(|p| expand_home(&p)),
            local: overrides.local.map(|p| expand_home(&p)),
            test_name: overrides.test_name,
            org: overrides.org.or(file.org),
            project: overrides.project.or(file.project),
            students,
            tests_path: overrides.tests_path.or(file.tests_path).map(|p| expand_home(&p)),
            timeout: Duration::from_secs(timeout_secs),
            verbosity: overrides.verbosity,
        }
    }

    pub fn require_project(&self) -> Result<&str, FatalError> {
        self.project
            .as_deref()
            .ok_or_else(|| FatalError::Configuration("project is required (--project)".to_string()))
    }

    pub fn require_tests_path(&self) -> Result<&Path, FatalError> {
        self.tests_path.as_deref().ok_or_else(|| {
            FatalError::Configuration("tests path is required (--tests-path)".to_string())
        })
    }

    pub fn require_org(&self) -> Result<&str, FatalError> {
        self.org
            .as_deref()
            .ok_or_else(|| FatalError::Configuration("org is required (--org)".to_string()))
    }

    pub fn require_students(&self) -> Result<&[String], FatalError> {
        if self.students.is_empty() {
            return Err(FatalError::Configuration(
                "at least one student is required (--students)".to_string(),
            ));
        }
        Ok(&self.students)
    }
}
