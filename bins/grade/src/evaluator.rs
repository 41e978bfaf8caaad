/// Comparator - Output Judging and Diagnostics
///
/// **Core Responsibility:**
/// Decide whether captured output matches the expected output.
///
/// **Normalization Rules:**
/// - Trim trailing whitespace: YES (spaces, tabs, carriage returns, newlines)
/// - Trim leading whitespace: NO
/// - Internal whitespace: significant
/// - Case sensitivity: YES
///
/// Diagnostics never change the verdict: one boolean comes back no matter
/// which verbosity switches are on.
use difference::{Changeset, Difference};
use grade_common::config::Verbosity;
use grade_common::types::TestCase;
use std::fmt::Display;
use std::io;
use termcolor::{Color, ColorSpec, WriteColor};

fn normalize_output(output: &str) -> &str {
    output.trim_end()
}

pub fn matches(expected: &str, actual: &str) -> bool {
    normalize_output(expected) == normalize_output(actual)
}

/// Render argv the way a user would type it; quoting is display-only
pub fn display_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if arg.contains(' ') {
                format!("\"{}\"", arg)
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split into lines that each end with exactly one `\n`
fn terminated_lines(text: &str) -> Vec<String> {
    text.lines().map(|line| format!("{}\n", line)).collect()
}

/// Line diff of expected vs actual, headed `--- expected` / `+++ actual`
pub fn render_diff(expected: &str, actual: &str) -> String {
    let mut out = String::from("--- expected\n+++ actual\n");

    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();

    // Changeset reports a lone empty chunk for empty input
    if expected_lines.is_empty() || actual_lines.is_empty() {
        for line in &expected_lines {
            out.push_str(&format!("-{}\n", line));
        }
        for line in &actual_lines {
            out.push_str(&format!("+{}\n", line));
        }
        return out;
    }

    let changeset = Changeset::new(&expected_lines.join("\n"), &actual_lines.join("\n"), "\n");
    for diff in &changeset.diffs {
        let (prefix, chunk) = match diff {
            Difference::Same(x) => (' ', x),
            Difference::Rem(x) => ('-', x),
            Difference::Add(x) => ('+', x),
        };
        for line in chunk.split('\n') {
            out.push(prefix);
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Judge one test's output and write whatever diagnostics are enabled
///
/// Show-both and diff are independent: with both on, a mismatch gets both
/// sides followed by the diff, under a single command line.
pub fn evaluate<W: WriteColor>(
    out: &mut W,
    test: &TestCase,
    argv: &[String],
    actual: &str,
    verbosity: Verbosity,
) -> io::Result<bool> {
    let passed = matches(&test.expected, actual);
    let show_diff = !passed && verbosity.show_diff;

    if verbosity.show_both || show_diff {
        write_command(out, argv)?;
    }
    if verbosity.show_both {
        write_both(out, test, actual)?;
    }
    if show_diff {
        write_diff(out, &test.expected, actual)?;
    }

    Ok(passed)
}

fn write_command<W: WriteColor>(out: &mut W, argv: &[String]) -> io::Result<()> {
    writeln!(out, "$ {}", display_command(argv))
}

fn write_both<W: WriteColor>(out: &mut W, test: &TestCase, actual: &str) -> io::Result<()> {
    writeln!(out, "--- expected ({})", test.name)?;
    write!(out, "{}", terminated_lines(&test.expected).concat())?;
    writeln!(out, "+++ actual")?;
    write!(out, "{}", terminated_lines(actual).concat())
}

fn write_diff<W: WriteColor>(out: &mut W, expected: &str, actual: &str) -> io::Result<()> {
    for line in render_diff(expected, actual).lines() {
        let color = if line.starts_with("---") || line.starts_with("+++") {
            None
        } else if line.starts_with('-') {
            Some(Color::Red)
        } else if line.starts_with('+') {
            Some(Color::Green)
        } else {
            None
        };
        out.set_color(ColorSpec::new().set_fg(color))?;
        writeln!(out, "{}", line)?;
    }
    out.reset()
}

/// Transcript mode: the command and everything it produced
pub fn write_transcript<W: WriteColor>(out: &mut W, argv: &[String], output: &str) -> io::Result<()> {
    write_command(out, argv)?;
    write!(out, "{}", terminated_lines(output).concat())
}

/// A command that never produced output to judge
pub fn write_execution_failure<W: WriteColor>(
    out: &mut W,
    argv: &[String],
    error: &dyn Display,
) -> io::Result<()> {
    write_command(out, argv)?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
    writeln!(out, "{}", error)?;
    out.reset()
}
