// Score reporting: one aligned, colored line per repository
use grade_common::types::Repository;
use std::fmt::Display;
use std::io;
use termcolor::{Color, ColorSpec, WriteColor};

/// `(earned, available)` over the recorded results
pub fn summarize(repository: &Repository) -> (u32, u32) {
    repository.results.iter().fold((0, 0), |(earned, available), result| {
        let earned = if result.score != 0 {
            earned + result.test.rubric
        } else {
            earned
        };
        (earned, available + result.test.rubric)
    })
}

/// Longest label plus one; computed once per run so all lines align
pub fn column_width<'a>(labels: impl IntoIterator<Item = &'a str>) -> usize {
    labels
        .into_iter()
        .map(|label| label.chars().count())
        .max()
        .unwrap_or(0)
        + 1
}

/// `label  test1 test2 ... earned/available`, passes green and failures red
pub fn write_report_line<W: WriteColor>(
    out: &mut W,
    repository: &Repository,
    width: usize,
) -> io::Result<()> {
    write!(out, "{:<width$}", repository.label, width = width)?;

    for result in &repository.results {
        let color = if result.passed() { Color::Green } else { Color::Red };
        out.set_color(ColorSpec::new().set_fg(Some(color)))?;
        write!(out, "{}", result.test.name)?;
        out.reset()?;
        write!(out, " ")?;
    }

    let (earned, available) = summarize(repository);
    writeln!(out, "{}/{}", earned, available)
}

/// Same column as a report line, with the error in place of the scores
pub fn write_failure_line<W: WriteColor>(
    out: &mut W,
    label: &str,
    width: usize,
    error: &dyn Display,
) -> io::Result<()> {
    write!(out, "{:<width$}", label, width = width)?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
    write!(out, "{}", error)?;
    out.reset()?;
    writeln!(out)
}
