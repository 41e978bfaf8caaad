// CLI actions: class, clone, pull, test
use crate::executor::RepositoryRunner;
use crate::report;
use anyhow::{Context, Result};
use grade_common::config::GraderConfig;
use grade_common::error::FatalError;
use grade_common::suite::{load_suite, suite_path, TestSuite};
use grade_common::types::Repository;
use std::io::Write;
use std::path::{Path, PathBuf};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::{error, info};

/// Build and test every student repository, one report line each
pub async fn grade_class(config: &GraderConfig) -> Result<()> {
    let project = config.require_project()?;
    let repositories = student_repositories(config)?;
    let suite = load_project_suite(config, project)?;

    let width = report::column_width(repositories.iter().map(|r| r.label.as_str()));
    info!(
        project,
        repositories = repositories.len(),
        tests = suite.len(),
        "Grading class"
    );

    for repository in repositories {
        grade_repository(repository, project, &suite, config, width).await?;
    }
    Ok(())
}

/// Build and test exactly one local directory
pub async fn grade_local(config: &GraderConfig) -> Result<()> {
    let project = config.require_project()?;
    let suite = load_project_suite(config, project)?;

    let local = config.local.clone().unwrap_or_else(|| PathBuf::from("."));
    let repository = Repository::local(local);
    let width = report::column_width([repository.label.as_str()]);

    grade_repository(repository, project, &suite, config, width).await
}

pub async fn clone_class(config: &GraderConfig) -> Result<()> {
    let project = config.require_project()?;
    for repository in student_repositories(config)? {
        let label = repository.label.clone();
        let runner = RepositoryRunner::new(repository, project, config);
        match runner.clone_remote().await {
            Ok(0) => {}
            Ok(status) => notice(&format!("{}: git clone exited with status {}", label, status))?,
            Err(e) => {
                error!(repo = %label, error = %e, "Clone failed");
                notice(&format!("{}: {}", label, e))?;
            }
        }
    }
    Ok(())
}

/// Pull every student repository, or just `--local` when given
pub async fn pull_class(config: &GraderConfig) -> Result<()> {
    let project = config.require_project()?;
    let repositories = match &config.local {
        Some(local) => vec![Repository::local(local)],
        None => student_repositories(config)?,
    };

    for repository in repositories {
        let label = repository.label.clone();
        let runner = RepositoryRunner::new(repository, project, config);
        match runner.pull().await {
            Ok(0) => {}
            Ok(status) => notice(&format!("{}: git pull exited with status {}", label, status))?,
            Err(e) => {
                error!(repo = %label, error = %e, "Pull failed");
                notice(&format!("{}: {}", label, e))?;
            }
        }
    }
    Ok(())
}

fn student_repositories(config: &GraderConfig) -> Result<Vec<Repository>> {
    let org = config.require_org()?;
    let project = config.require_project()?;
    let students = config.require_students()?;
    Ok(students
        .iter()
        .map(|student| Repository::for_student(org, project, student, config.credentials))
        .collect())
}

fn load_project_suite(config: &GraderConfig, project: &str) -> Result<TestSuite> {
    let tests_path = config.require_tests_path()?;
    let path = suite_path(tests_path, project);
    let suite = load_suite(&path)?;
    check_digital(config, &suite, &path)?;
    Ok(suite)
}

/// A suite that uses `$digital` needs the tool path before grading starts
fn check_digital(config: &GraderConfig, suite: &TestSuite, path: &Path) -> Result<()> {
    let uses_digital = suite
        .iter()
        .flat_map(|test| test.command_template.iter())
        .any(|token| token.contains("$digital"));
    if uses_digital && config.digital.is_none() {
        return Err(FatalError::Configuration(format!(
            "{} uses $digital but no digital path is configured (--digital)",
            path.display()
        ))
        .into());
    }
    Ok(())
}

/// Repository boundary: nothing below here stops the run
async fn grade_repository(
    repository: Repository,
    project: &str,
    suite: &TestSuite,
    config: &GraderConfig,
    width: usize,
) -> Result<()> {
    let label = repository.label.clone();
    let mut runner = RepositoryRunner::new(repository, project, config);
    let outcome = runner.grade(suite, config.test_name.as_deref()).await;

    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    match outcome {
        Ok(()) => {
            let repository = runner.into_repository();
            let (earned, available) = report::summarize(&repository);
            info!(repo = %label, earned, available, "Repository graded");
            report::write_report_line(&mut stdout, &repository, width)
                .context("Failed to write report")?;
        }
        Err(e) => {
            error!(repo = %label, error = %e, "Repository failed");
            report::write_failure_line(&mut stdout, &label, width, &e)
                .context("Failed to write report")?;
        }
    }
    Ok(())
}

fn notice(message: &str) -> Result<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
    writeln!(stdout, "{}", message)?;
    stdout.reset()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grade_common::config::{ConfigFile, ConfigOverrides};

    fn config_with(overrides: ConfigOverrides) -> GraderConfig {
        GraderConfig::resolve(ConfigFile::default(), overrides)
    }

    fn write_suite(root: &Path, project: &str, body: &str) {
        let dir = root.join(project);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{}.toml", project)), body).unwrap();
    }

    #[tokio::test]
    async fn test_class_requires_project() {
        let config = config_with(ConfigOverrides::default());
        let err = grade_class(&config).await.unwrap_err();
        assert!(err.to_string().contains("project is required"));
    }

    #[tokio::test]
    async fn test_class_requires_students() {
        let config = config_with(ConfigOverrides {
            org: Some("org".to_string()),
            project: Some("p1".to_string()),
            ..Default::default()
        });
        let err = grade_class(&config).await.unwrap_err();
        assert!(err.to_string().contains("student"));
    }

    #[tokio::test]
    async fn test_invalid_suite_aborts_before_grading() {
        let tests_root = tempfile::tempdir().unwrap();
        write_suite(
            tests_root.path(),
            "p1",
            "[[tests]]\nname = \"a\"\ninput = [\"true\"]\nexpected = \"\"\n",
        );
        let config = config_with(ConfigOverrides {
            project: Some("p1".to_string()),
            tests_path: Some(tests_root.path().to_path_buf()),
            local: Some(PathBuf::from("/nonexistent/repo")),
            ..Default::default()
        });

        let err = grade_local(&config).await.unwrap_err();
        assert!(err.to_string().contains("missing rubric"));
    }

    #[tokio::test]
    async fn test_missing_local_repository_does_not_fail_run() {
        let tests_root = tempfile::tempdir().unwrap();
        write_suite(
            tests_root.path(),
            "p1",
            "[[tests]]\nname = \"a\"\ninput = [\"true\"]\nexpected = \"\"\nrubric = 1\n",
        );
        let config = config_with(ConfigOverrides {
            project: Some("p1".to_string()),
            tests_path: Some(tests_root.path().to_path_buf()),
            local: Some(PathBuf::from("/nonexistent/repo")),
            ..Default::default()
        });

        assert!(grade_local(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_digital_placeholder_requires_digital_path() {
        let tests_root = tempfile::tempdir().unwrap();
        write_suite(
            tests_root.path(),
            "p1",
            "[[tests]]\nname = \"d\"\ninput = [\"java\", \"-jar\", \"$digital\"]\nexpected = \"\"\nrubric = 1\n",
        );
        let config = config_with(ConfigOverrides {
            project: Some("p1".to_string()),
            tests_path: Some(tests_root.path().to_path_buf()),
            ..Default::default()
        });

        let err = grade_local(&config).await.unwrap_err();
        assert!(err.to_string().contains("$digital"));
    }

    #[test]
    fn test_student_repositories_in_given_order() {
        let config = config_with(ConfigOverrides {
            org: Some("cs315".to_string()),
            project: Some("p1".to_string()),
            students: vec!["zed".to_string(), "amy".to_string()],
            ..Default::default()
        });
        let labels: Vec<String> = student_repositories(&config)
            .unwrap()
            .into_iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(labels, vec!["p1-zed", "p1-amy"]);
    }
}
