use std::fmt::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::models::{ReportingPeriod, ScopeSummary};
use crate::period::PeriodCatalog;
use crate::scope::Scope;

pub fn build_report(
    scope: &Scope,
    period: &ReportingPeriod,
    aggregate: bool,
    summary: &ScopeSummary,
    catalog: &PeriodCatalog,
) -> String {
    let mut output = String::new();
    let window = if aggregate {
        "all weeks combined"
    } else {
        "single week"
    };

    let _ = writeln!(output, "# School Indicators Report");
    let _ = writeln!(output, "Generated for {} ({}, {})", scope, period, window);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Enrollment");

    match &summary.enrollment {
        Some(enrollment) => {
            let _ = writeln!(output, "- Total students: {}", enrollment.total_students);
            let _ = writeln!(
                output,
                "- Boys: {} / Girls: {}",
                enrollment.gender_distribution.boys, enrollment.gender_distribution.girls
            );
        }
        None => {
            let _ = writeln!(output, "No enrollment data for this period.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Student Attendance");

    match &summary.student_attendance {
        Some(attendance) => {
            let _ = writeln!(
                output,
                "- {} present of {} enrolled ({:.2}%)",
                attendance.total_present, attendance.total_enrolled, attendance.attendance_rate
            );
        }
        None => {
            let _ = writeln!(output, "No student attendance data for this period.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Teacher Attendance");

    match &summary.teacher_attendance {
        Some(teachers) => {
            let _ = writeln!(output, "- Teacher records: {}", teachers.total_teachers);
            let _ = writeln!(output, "- Attendance rate: {:.2}%", teachers.attendance_rate);
            let _ = writeln!(
                output,
                "- Exercise completion rate: {:.2}%",
                teachers.exercise_completion_rate
            );
        }
        None => {
            let _ = writeln!(output, "No teacher attendance data for this period.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Available Periods");

    if catalog.is_empty() {
        let _ = writeln!(output, "No reporting periods recorded.");
    } else {
        for year in catalog.years() {
            for term in &year.terms {
                let weeks: Vec<String> = term.weeks.iter().map(i32::to_string).collect();
                let _ = writeln!(
                    output,
                    "- {} term {}: weeks {}",
                    year.year,
                    term.term,
                    weeks.join(", ")
                );
            }
        }
    }

    output
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    scope: String,
    year: &'a str,
    term: &'a str,
    week: Option<i32>,
    metric: &'static str,
    value: String,
}

/// One line per metric so the file opens cleanly as a spreadsheet. Metrics
/// without data are written with an empty value.
pub fn write_summary_csv(
    path: &Path,
    scope: &Scope,
    period: &ReportingPeriod,
    summary: &ScopeSummary,
) -> anyhow::Result<usize> {
    let mut metrics: Vec<(&'static str, Option<String>)> = Vec::new();

    let enrollment = summary.enrollment.as_ref();
    metrics.push(("total_students", enrollment.map(|e| e.total_students.to_string())));
    metrics.push((
        "boys",
        enrollment.map(|e| e.gender_distribution.boys.to_string()),
    ));
    metrics.push((
        "girls",
        enrollment.map(|e| e.gender_distribution.girls.to_string()),
    ));

    let attendance = summary.student_attendance.as_ref();
    metrics.push(("total_enrolled", attendance.map(|a| a.total_enrolled.to_string())));
    metrics.push(("total_present", attendance.map(|a| a.total_present.to_string())));
    metrics.push((
        "student_attendance_rate",
        attendance.map(|a| format!("{:.2}", a.attendance_rate)),
    ));

    let teachers = summary.teacher_attendance.as_ref();
    metrics.push(("total_teachers", teachers.map(|t| t.total_teachers.to_string())));
    metrics.push((
        "teacher_attendance_rate",
        teachers.map(|t| format!("{:.2}", t.attendance_rate)),
    ));
    metrics.push((
        "exercise_completion_rate",
        teachers.map(|t| format!("{:.2}", t.exercise_completion_rate)),
    ));

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    for (metric, value) in &metrics {
        writer.serialize(ExportRow {
            scope: scope.to_string(),
            year: &period.year,
            term: &period.term,
            week: period.week,
            metric: *metric,
            value: value.clone().unwrap_or_default(),
        })?;
    }

    writer.flush()?;
    Ok(metrics.len())
}
