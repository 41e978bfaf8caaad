use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// Where a test case's actual output comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    Stdout,
    /// File path relative to the repository's working directory
    File(PathBuf),
}

impl CaptureMode {
    /// `"stdout"` selects standard output, anything else names a file
    pub fn parse(output: &str) -> Self {
        if output == "stdout" {
            CaptureMode::Stdout
        } else {
            CaptureMode::File(PathBuf::from(output))
        }
    }
}

/// One validated test definition, shared read-only by every repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub command_template: Vec<String>,
    pub expected: String,
    pub rubric: u32,
    pub capture: CaptureMode,
}

impl TestCase {
    /// Resolve every token of the command template against `ctx`
    pub fn resolve_argv(&self, ctx: &ExecutionContext) -> Vec<String> {
        self.command_template
            .iter()
            .map(|token| ctx.resolve(token))
            .collect()
    }
}

/// Placeholders recognized in command templates
///
/// Order matters: `$project_tests` must be tried before `$project`, which is
/// one of its prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    ProjectTests,
    Project,
    Digital,
}

impl Placeholder {
    pub const ORDERED: [Placeholder; 3] = [
        Placeholder::ProjectTests,
        Placeholder::Project,
        Placeholder::Digital,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::ProjectTests => "$project_tests",
            Placeholder::Project => "$project",
            Placeholder::Digital => "$digital",
        }
    }
}

/// Per-repository execution settings, built once before any test runs
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub working_directory: PathBuf,
    substitutions: Vec<(Placeholder, Option<String>)>,
}

impl ExecutionContext {
    pub fn new(
        working_directory: impl Into<PathBuf>,
        project: &str,
        tests_path: Option<&Path>,
        digital: Option<&Path>,
    ) -> Self {
        let project_tests = tests_path.map(|p| p.join(project).to_string_lossy().into_owned());
        let substitutions = vec![
            (Placeholder::ProjectTests, project_tests),
            (Placeholder::Project, Some(project.to_string())),
            (Placeholder::Digital, digital.map(|p| p.to_string_lossy().into_owned())),
        ];
        Self {
            working_directory: working_directory.into(),
            substitutions,
        }
    }

    pub fn value_of(&self, placeholder: Placeholder) -> Option<&str> {
        self.substitutions
            .iter()
            .find(|(p, _)| *p == placeholder)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Substitute at most one placeholder kind in `token`
    ///
    /// The first placeholder (in `Placeholder::ORDERED`) contained in the token
    /// is replaced and no other is considered. A second, different
    /// placeholder in the same token is left as written.
    pub fn resolve(&self, token: &str) -> String {
        for placeholder in Placeholder::ORDERED {
            if !token.contains(placeholder.token()) {
                continue;
            }
            return match self.value_of(placeholder) {
                Some(value) => token.replace(placeholder.token(), value),
                None => {
                    warn!(
                        placeholder = placeholder.token(),
                        token, "placeholder has no configured value"
                    );
                    token.to_string()
                }
            };
        }
        token.to_string()
    }
}

/// Outcome of one test case against one repository
#[derive(Debug, Clone)]
pub struct TestResult {
    pub test: Arc<TestCase>,
    /// Either 0 or the full rubric weight
    pub score: u32,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.score != 0
    }
}

/// How remote URLs are formed for student repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Credentials {
    #[default]
    Https,
    Ssh,
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Https => write!(f, "https"),
            Credentials::Ssh => write!(f, "ssh"),
        }
    }
}

impl FromStr for Credentials {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "https" => Ok(Credentials::Https),
            "ssh" => Ok(Credentials::Ssh),
            other => Err(format!("unknown credentials mode '{}' (expected https or ssh)", other)),
        }
    }
}

/// One checked-out repository and the results recorded against it
#[derive(Debug, Clone)]
pub struct Repository {
    pub label: String,
    pub local_path: PathBuf,
    pub remote_url: Option<String>,
    pub results: Vec<TestResult>,
}

impl Repository {
    /// Repository addressed by an explicit local directory
    pub fn local(path: impl Into<PathBuf>) -> Self {
        let local_path = path.into();
        Self {
            label: label_for(&local_path),
            local_path,
            remote_url: None,
            results: Vec::new(),
        }
    }

    /// Repository synthesized from `{org, project, student}`
    pub fn for_student(org: &str, project: &str, student: &str, credentials: Credentials) -> Self {
        let slug = format!("{}/{}-{}", org, project, student);
        let remote_url = match credentials {
            Credentials::Https => format!("https://github.com/{}.git", slug),
            Credentials::Ssh => format!("git@github.com:/{}.git", slug),
        };
        let local_path = Path::new("github.com").join(&slug);
        Self {
            label: label_for(&local_path),
            local_path,
            remote_url: Some(remote_url),
            results: Vec::new(),
        }
    }
}

/// Final path segment; `.` and `..` fall back to the canonical directory name
fn label_for(path: &Path) -> String {
    if let Some(name) = path.file_name() {
        return name.to_string_lossy().into_owned();
    }
    path.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(
            "/repo",
            "p1",
            Some(Path::new("/tests")),
            Some(Path::new("/opt/Digital.jar")),
        )
    }

    #[test]
    fn test_project_tests_substitution() {
        let test = TestCase {
            name: "fixture".to_string(),
            command_template: vec!["run".to_string(), "$project_tests/fixture.txt".to_string()],
            expected: String::new(),
            rubric: 1,
            capture: CaptureMode::Stdout,
        };
        assert_eq!(
            test.resolve_argv(&ctx()),
            vec!["run".to_string(), "/tests/p1/fixture.txt".to_string()]
        );
    }

    #[test]
    fn test_project_and_digital_substitution() {
        let ctx = ctx();
        assert_eq!(ctx.resolve("$project.dig"), "p1.dig");
        assert_eq!(ctx.resolve("$digital"), "/opt/Digital.jar");
        assert_eq!(ctx.resolve("plain"), "plain");
    }

    #[test]
    fn test_only_first_placeholder_replaced() {
        // $project_tests wins; $digital in the same token stays as written
        assert_eq!(
            ctx().resolve("$project_tests:$digital"),
            "/tests/p1:$digital"
        );
        // $project wins over $digital
        assert_eq!(ctx().resolve("$digital/$project"), "$digital/p1");
    }

    #[test]
    fn test_unconfigured_placeholder_passes_through() {
        let ctx = ExecutionContext::new("/repo", "p1", None, None);
        assert_eq!(ctx.resolve("$digital"), "$digital");
        assert_eq!(ctx.resolve("$project_tests/a"), "$project_tests/a");
    }

    #[test]
    fn test_capture_mode_parse() {
        assert_eq!(CaptureMode::parse("stdout"), CaptureMode::Stdout);
        assert_eq!(
            CaptureMode::parse("out/result.txt"),
            CaptureMode::File(PathBuf::from("out/result.txt"))
        );
    }

    #[test]
    fn test_student_repository_https() {
        let repo = Repository::for_student("cs315", "project01", "alice", Credentials::Https);
        assert_eq!(repo.label, "project01-alice");
        assert_eq!(repo.local_path, Path::new("github.com/cs315/project01-alice"));
        assert_eq!(
            repo.remote_url.as_deref(),
            Some("https://github.com/cs315/project01-alice.git")
        );
    }

    #[test]
    fn test_student_repository_ssh() {
        let repo = Repository::for_student("cs315", "project01", "bob", Credentials::Ssh);
        assert_eq!(
            repo.remote_url.as_deref(),
            Some("git@github.com:/cs315/project01-bob.git")
        );
    }

    #[test]
    fn test_local_repository_label() {
        let repo = Repository::local("/home/grader/project01-carol");
        assert_eq!(repo.label, "project01-carol");
        assert!(repo.remote_url.is_none());
        assert!(repo.results.is_empty());
    }

    #[test]
    fn test_credentials_from_str() {
        assert_eq!("SSH".parse::<Credentials>(), Ok(Credentials::Ssh));
        assert!("ftp".parse::<Credentials>().is_err());
    }
}
