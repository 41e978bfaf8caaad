/// Repository Runner - Per-Repository Orchestration
///
/// **Responsibility:**
/// Own one checked-out repository and run a selection of test cases against
/// it, recording one `TestResult` per executed test.
///
/// **Failure Boundary:**
/// - A test that fails to run (spawn error, timeout, unreadable capture file)
///   scores 0 and the remaining tests still run
/// - Repository-level problems surface as `Recoverable` for the caller to
///   report; they never escape the class run
///
/// The runner glues the command runner (engine.rs) to the comparator
/// (evaluator.rs); it knows neither how commands run nor how output is judged.
use crate::engine;
use crate::evaluator;
use crate::vcs;
use grade_common::config::GraderConfig;
use grade_common::error::{ExecutionFailure, Recoverable};
use grade_common::types::{CaptureMode, ExecutionContext, Repository, TestCase, TestResult};
use std::sync::Arc;
use termcolor::{ColorChoice, StandardStream};
use tracing::{debug, info, instrument, warn};

pub struct RepositoryRunner<'a> {
    repository: Repository,
    context: ExecutionContext,
    config: &'a GraderConfig,
}

impl<'a> RepositoryRunner<'a> {
    pub fn new(repository: Repository, project: &str, config: &'a GraderConfig) -> Self {
        let context = ExecutionContext::new(
            repository.local_path.clone(),
            project,
            config.tests_path.as_deref(),
            config.digital.as_deref(),
        );
        Self {
            repository,
            context,
            config,
        }
    }

    #[cfg(test)]
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn into_repository(self) -> Repository {
        self.repository
    }

    /// Fail early when the repository was never cloned
    pub fn ensure_present(&self) -> Result<(), Recoverable> {
        if self.repository.local_path.is_dir() {
            Ok(())
        } else {
            Err(Recoverable::Repository(format!(
                "directory not found: {}",
                self.repository.local_path.display()
            )))
        }
    }

    /// Build then run tests; the build status is logged but not enforced
    #[instrument(skip(self, tests), fields(repo = %self.repository.label))]
    pub async fn grade(
        &mut self,
        tests: &[Arc<TestCase>],
        only_name: Option<&str>,
    ) -> Result<(), Recoverable> {
        self.ensure_present()?;
        let status = self.build().await?;
        if status != 0 {
            warn!(repo = %self.repository.label, status, "Build failed; running tests anyway");
        }
        self.run_all(tests, only_name).await;
        Ok(())
    }

    /// Run every test, or only those whose name equals `only_name`
    ///
    /// Duplicate names are not an error: every match runs.
    pub async fn run_all(&mut self, tests: &[Arc<TestCase>], only_name: Option<&str>) {
        let selected = tests
            .iter()
            .filter(|test| only_name.map_or(true, |name| test.name == name));

        for test in selected {
            let result = self.run_one(test).await;
            self.repository.results.push(result);
        }

        info!(
            repo = %self.repository.label,
            executed = self.repository.results.len(),
            "Tests complete"
        );
    }

    #[instrument(skip(self, test), fields(repo = %self.repository.label, test = %test.name))]
    async fn run_one(&self, test: &Arc<TestCase>) -> TestResult {
        let argv = test.resolve_argv(&self.context);
        let verbosity = self.config.verbosity;

        let captured = self.capture(test, &argv).await;
        let mut stdout = StandardStream::stdout(ColorChoice::Auto);

        let score = match captured {
            Ok(actual) => {
                if verbosity.echo_commands {
                    if let Err(e) = evaluator::write_transcript(&mut stdout, &argv, &actual) {
                        warn!(error = %e, "Failed to write transcript");
                    }
                }
                let passed = match evaluator::evaluate(&mut stdout, test, &argv, &actual, verbosity) {
                    Ok(passed) => passed,
                    Err(e) => {
                        warn!(error = %e, "Failed to write diagnostics");
                        evaluator::matches(&test.expected, &actual)
                    }
                };
                if passed {
                    test.rubric
                } else {
                    0
                }
            }
            Err(e) => {
                warn!(error = %e, "Test execution failed");
                if verbosity.show_diff || verbosity.echo_commands {
                    if let Err(e) = evaluator::write_execution_failure(&mut stdout, &argv, &e) {
                        warn!(error = %e, "Failed to write diagnostics");
                    }
                }
                0
            }
        };

        TestResult {
            test: Arc::clone(test),
            score,
        }
    }

    async fn capture(&self, test: &TestCase, argv: &[String]) -> Result<String, ExecutionFailure> {
        let dir = &self.context.working_directory;
        let timeout = self.config.timeout;
        match &test.capture {
            CaptureMode::Stdout => {
                let output = engine::execute(argv, dir, timeout).await?;
                debug!(exit_code = ?output.exit_code, stderr = %output.stderr.trim_end(), "Captured stdout");
                Ok(output.stdout)
            }
            CaptureMode::File(path) => engine::execute_capturing_file(argv, dir, timeout, path).await,
        }
    }

    /// Clone from the remote; an existing directory is left alone
    pub async fn clone_remote(&self) -> Result<i32, Recoverable> {
        let url = self
            .repository
            .remote_url
            .as_deref()
            .ok_or_else(|| Recoverable::NoRemote(self.repository.label.clone()))?;

        if self.repository.local_path.exists() {
            println!(
                "{} already exists, skipping clone",
                self.repository.local_path.display()
            );
            return Ok(0);
        }
        vcs::clone(url, &self.repository.local_path).await
    }

    pub async fn pull(&self) -> Result<i32, Recoverable> {
        self.ensure_present()?;
        vcs::pull(&self.repository.local_path).await
    }

    pub async fn build(&self) -> Result<i32, Recoverable> {
        vcs::build(&self.repository.local_path).await
    }
}
