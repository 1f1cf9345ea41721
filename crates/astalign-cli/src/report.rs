//! Human and JSON run reports.

use std::io::{self, Write};

use astalign::{AlignmentVerdict, CaseReport, CategoryRegistry, RunSummary, SnapshotOutcome};
use termcolor::{Color, ColorSpec, WriteColor};

/// Per-case status shown in the human report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pass,
    ExpectedFail,
    Stale,
    Fail,
    Error,
}

impl Status {
    pub fn of(case: &CaseReport, strict: bool) -> Self {
        if case.error.is_some() {
            Self::Error
        } else if !case.passed() {
            Self::Fail
        } else if strict && !case.stale_expectations.is_empty() {
            Self::Stale
        } else if case.verdict == Some(AlignmentVerdict::ExpectedFail) {
            Self::ExpectedFail
        } else {
            Self::Pass
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::ExpectedFail => "XFAIL",
            Self::Stale => "STALE",
            Self::Fail => "FAIL",
            Self::Error => "ERROR",
        }
    }

    const fn color(self) -> Color {
        match self {
            Self::Pass => Color::Green,
            Self::ExpectedFail => Color::Yellow,
            Self::Stale | Self::Fail | Self::Error => Color::Red,
        }
    }

    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Stale | Self::Fail | Self::Error)
    }
}

/// Whether the run should exit non-zero.
pub fn run_failed(summary: &RunSummary, strict: bool) -> bool {
    summary.cases.iter().any(|case| Status::of(case, strict).is_failure())
}

fn write_colored<W: WriteColor>(out: &mut W, color: Color, bold: bool, text: &str) -> io::Result<()> {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(color)).set_bold(bold);
    out.set_color(&spec)?;
    write!(out, "{text}")?;
    out.reset()
}

fn write_case<W: WriteColor>(out: &mut W, case: &CaseReport, strict: bool) -> io::Result<()> {
    let status = Status::of(case, strict);
    write_colored(out, status.color(), true, &format!("{:<6}", status.label()))?;
    write!(out, " {}", case.case_id)?;
    if status == Status::ExpectedFail {
        let tolerated: Vec<&str> = case
            .per_reference_verdicts
            .iter()
            .filter(|(_, verdict)| **verdict == AlignmentVerdict::ExpectedFail)
            .map(|(name, _)| name.as_str())
            .collect();
        write!(out, " ({})", tolerated.join(", "))?;
    }
    writeln!(out)?;

    if let Some(error) = &case.error {
        writeln!(out, "       {error}")?;
    }
    for (reference, verdict) in &case.per_reference_verdicts {
        if *verdict != AlignmentVerdict::UnexpectedFail {
            continue;
        }
        let diffs = case.differences.get(reference).map_or(&[][..], Vec::as_slice);
        writeln!(out, "       {reference}: {} difference(s)", diffs.len())?;
        for diff in diffs {
            writeln!(out, "         {diff}")?;
        }
    }
    for reference in &case.stale_expectations {
        let color = if strict { Color::Red } else { Color::Yellow };
        write_colored(
            out,
            color,
            false,
            &format!("       {reference}: declared failure no longer occurs"),
        )?;
        writeln!(out)?;
    }
    match &case.snapshot_result {
        Some(SnapshotOutcome::Mismatch { diff }) => {
            writeln!(out, "       snapshot mismatch:")?;
            for line in diff.lines() {
                let color = match line.as_bytes().first() {
                    Some(b'-') => Some(Color::Red),
                    Some(b'+') => Some(Color::Green),
                    Some(b'@') => Some(Color::Cyan),
                    _ => None,
                };
                let text = format!("         {line}");
                match color {
                    Some(color) => write_colored(out, color, false, &text)?,
                    None => write!(out, "{text}")?,
                }
                writeln!(out)?;
            }
        }
        Some(SnapshotOutcome::Missing) => {
            writeln!(out, "       snapshot missing (rerun with --update-snapshots)")?;
        }
        Some(SnapshotOutcome::Error { message }) => writeln!(out, "       snapshot error: {message}")?,
        Some(SnapshotOutcome::Written { replaced: true }) => writeln!(out, "       snapshot updated")?,
        Some(SnapshotOutcome::Written { replaced: false }) => writeln!(out, "       snapshot recorded")?,
        Some(SnapshotOutcome::Matched) | None => {}
    }
    Ok(())
}

/// Per-case lines followed by a one-line summary.
pub fn write_human<W: WriteColor>(out: &mut W, summary: &RunSummary, strict: bool) -> io::Result<()> {
    for case in &summary.cases {
        write_case(out, case, strict)?;
    }
    writeln!(out)?;

    let failed = run_failed(summary, strict);
    let color = if failed { Color::Red } else { Color::Green };
    write_colored(
        out,
        color,
        true,
        &format!("{} cases: {} passed, {} failed", summary.total, summary.passed, summary.failed),
    )?;
    writeln!(
        out,
        " ({} expected failures, {} snapshot failures, {} errors, {} stale expectations) in {:.1}ms",
        summary.expected_failures,
        summary.snapshot_failures,
        summary.errors,
        summary.stale_expectations,
        summary.duration.as_secs_f64() * 1000.0,
    )?;
    out.flush()
}

pub fn write_json<W: Write>(out: &mut W, summary: &RunSummary) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, summary)?;
    writeln!(out)?;
    out.flush()
}

/// One line per registered category.
pub fn write_categories<W: WriteColor>(out: &mut W, registry: &CategoryRegistry) -> io::Result<()> {
    for category in registry.iter() {
        write_colored(out, Color::Cyan, true, &category.tag)?;
        let kinds: Vec<&str> = category.kinds.iter().map(|kind| kind.as_str()).collect();
        write!(out, "  [{}]", kinds.join(", "))?;
        if let Some(pattern) = &category.path_pattern {
            write!(out, " at {pattern}")?;
        }
        if !category.description.is_empty() {
            write!(out, "  {}", category.description)?;
        }
        writeln!(out)?;
    }
    out.flush()
}

pub fn write_categories_json<W: Write>(out: &mut W, registry: &CategoryRegistry) -> io::Result<()> {
    let categories: Vec<_> = registry.iter().collect();
    serde_json::to_writer_pretty(&mut *out, &categories)?;
    writeln!(out)?;
    out.flush()
}
