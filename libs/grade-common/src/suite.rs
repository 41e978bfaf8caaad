// Test-suite loading and validation
use crate::error::FatalError;
use crate::types::{CaptureMode, TestCase};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toml::Value;
use tracing::debug;

/// Ordered, validated test cases for one project
pub type TestSuite = Vec<Arc<TestCase>>;

#[derive(Debug, Deserialize)]
struct SuiteFile {
    tests: Vec<RawTest>,
}

/// A record as written in the suite file, before validation
#[derive(Debug, Deserialize)]
struct RawTest {
    name: Option<Value>,
    input: Option<Value>,
    expected: Option<Value>,
    rubric: Option<Value>,
    output: Option<Value>,
}

/// `<tests_path>/<project>/<project>.toml`
pub fn suite_path(tests_path: &Path, project: &str) -> PathBuf {
    tests_path.join(project).join(format!("{}.toml", project))
}

/// Load and validate a whole suite; any bad record rejects the suite
pub fn load_suite(path: &Path) -> Result<TestSuite, FatalError> {
    let text = fs::read_to_string(path).map_err(|source| FatalError::SuiteIo {
        path: path.to_path_buf(),
        source,
    })?;
    parse_suite(&text, path)
}

pub fn parse_suite(text: &str, path: &Path) -> Result<TestSuite, FatalError> {
    let file: SuiteFile = toml::from_str(text).map_err(|source| FatalError::SuiteParse {
        path: path.to_path_buf(),
        source,
    })?;

    let suite = file
        .tests
        .into_iter()
        .enumerate()
        .map(|(index, raw)| validate(index, raw).map(Arc::new))
        .collect::<Result<TestSuite, _>>()?;

    debug!(path = %path.display(), tests = suite.len(), "Loaded test suite");
    Ok(suite)
}

fn validate(index: usize, raw: RawTest) -> Result<TestCase, FatalError> {
    let name = match raw.name {
        None => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(invalid(index, "", format!("name must be a string, got {}", other.type_str())))
        }
    };
    let fail = |reason: String| invalid(index, &name, reason);

    let rubric = match raw.rubric {
        None => return Err(fail("missing rubric".to_string())),
        Some(Value::Integer(n)) => {
            u32::try_from(n).map_err(|_| fail(format!("rubric must be a non-negative integer, got {}", n)))?
        }
        Some(other) => {
            return Err(fail(format!("rubric must be an integer, got {}", other.type_str())))
        }
    };

    let command_template = match raw.input {
        None => return Err(fail("missing input".to_string())),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(fail(format!("input entries must be strings, got {}", other.type_str()))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(fail(format!("input must be a list, got {}", other.type_str())))
        }
    };
    if command_template.is_empty() {
        return Err(fail("input must not be empty".to_string()));
    }

    let expected = match raw.expected {
        None => return Err(fail("missing expected".to_string())),
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(fail(format!("expected must be a string, got {}", other.type_str())))
        }
    };

    let capture = match raw.output {
        None => CaptureMode::Stdout,
        Some(Value::String(s)) => CaptureMode::parse(&s),
        Some(other) => {
            return Err(fail(format!("output must be a string, got {}", other.type_str())))
        }
    };

    Ok(TestCase {
        name,
        command_template,
        expected,
        rubric,
        capture,
    })
}

fn invalid(index: usize, name: &str, reason: String) -> FatalError {
    FatalError::InvalidDefinition {
        index,
        name: name.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn parse(text: &str) -> Result<TestSuite, FatalError> {
        parse_suite(text, Path::new("suite.toml"))
    }

    fn reason_of(err: FatalError) -> String {
        match err {
            FatalError::InvalidDefinition { reason, .. } => reason,
            other => panic!("expected InvalidDefinition, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_valid_suite() {
        let suite = parse(
            r#"
[[tests]]
name = "echo1"
input = ["echo", "hi"]
expected = "hi\n"
rubric = 10

[[tests]]
name = "file"
input = ["./prog", "$project_tests/a.txt"]
expected = "ok"
rubric = 0
output = "result.txt"
"#,
        )
        .unwrap();

        assert_eq!(suite.len(), 2);
        assert_eq!(suite[0].name, "echo1");
        assert_eq!(suite[0].command_template, vec!["echo", "hi"]);
        assert_eq!(suite[0].expected, "hi\n");
        assert_eq!(suite[0].rubric, 10);
        assert_eq!(suite[0].capture, CaptureMode::Stdout);
        assert_eq!(suite[1].rubric, 0);
        assert_eq!(suite[1].capture, CaptureMode::File(PathBuf::from("result.txt")));
    }

    #[test]
    fn test_explicit_stdout_output() {
        let suite = parse(
            r#"
[[tests]]
name = "a"
input = ["true"]
expected = ""
rubric = 1
output = "stdout"
"#,
        )
        .unwrap();
        assert_eq!(suite[0].capture, CaptureMode::Stdout);
    }

    #[test]
    fn test_missing_rubric_is_invalid() {
        let err = parse(
            r#"
[[tests]]
name = "a"
input = ["true"]
expected = ""
"#,
        )
        .unwrap_err();
        assert_eq!(reason_of(err), "missing rubric");
    }

    #[test]
    fn test_non_integer_rubric_is_invalid() {
        let err = parse(
            r#"
[[tests]]
name = "a"
input = ["true"]
expected = ""
rubric = "ten"
"#,
        )
        .unwrap_err();
        assert!(reason_of(err).starts_with("rubric must be an integer"));
    }

    #[test]
    fn test_negative_rubric_is_invalid() {
        let err = parse(
            r#"
[[tests]]
name = "a"
input = ["true"]
expected = ""
rubric = -1
"#,
        )
        .unwrap_err();
        assert!(reason_of(err).contains("non-negative"));
    }

    #[test]
    fn test_empty_input_is_invalid() {
        let err = parse(
            r#"
[[tests]]
name = "a"
input = []
expected = ""
rubric = 1
"#,
        )
        .unwrap_err();
        assert_eq!(reason_of(err), "input must not be empty");
    }

    #[test]
    fn test_input_must_be_list() {
        let err = parse(
            r#"
[[tests]]
name = "a"
input = "echo hi"
expected = ""
rubric = 1
"#,
        )
        .unwrap_err();
        assert!(reason_of(err).starts_with("input must be a list"));
    }

    #[test]
    fn test_missing_expected_is_invalid() {
        let err = parse(
            r#"
[[tests]]
name = "a"
input = ["true"]
rubric = 1
"#,
        )
        .unwrap_err();
        assert_eq!(reason_of(err), "missing expected");
    }

    #[test]
    fn test_one_bad_record_rejects_whole_suite() {
        let err = parse(
            r#"
[[tests]]
name = "good"
input = ["true"]
expected = ""
rubric = 1

[[tests]]
name = "bad"
input = ["true"]
expected = 42
rubric = 1
"#,
        )
        .unwrap_err();
        match err {
            FatalError::InvalidDefinition { index, name, .. } => {
                assert_eq!(index, 1);
                assert_eq!(name, "bad");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let err = parse("[[tests]\nname =").unwrap_err();
        assert!(matches!(err, FatalError::SuiteParse { .. }));
    }

    #[test]
    fn test_load_suite_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("p1");
        std::fs::create_dir_all(&project_dir).unwrap();
        let path = suite_path(dir.path(), "p1");
        assert_eq!(path, project_dir.join("p1.toml"));

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[[tests]]\nname = \"t\"\ninput = [\"echo\"]\nexpected = \"\"\nrubric = 2"
        )
        .unwrap();

        let suite = load_suite(&path).unwrap();
        assert_eq!(suite.len(), 1);
        assert_eq!(suite[0].rubric, 2);
    }

    #[test]
    fn test_load_missing_suite_is_io_error() {
        let err = load_suite(Path::new("/nonexistent/p1/p1.toml")).unwrap_err();
        assert!(matches!(err, FatalError::SuiteIo { .. }));
    }
}
