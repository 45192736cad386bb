use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Weekly enrollment counts for one school.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct EnrollmentRow {
    pub school_id: String,
    pub circuit_id: String,
    pub district_id: String,
    pub region_id: String,
    pub year: String,
    pub term: String,
    pub week: i32,
    pub normal_boys_total: Option<i64>,
    pub normal_girls_total: Option<i64>,
    pub special_boys_total: Option<i64>,
    pub special_girls_total: Option<i64>,
    pub total_population: Option<i64>,
}

/// Weekly attendance for one school. The four population fields hold
/// present counts, `total_population` holds the enrolled denominator.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct AttendanceRow {
    pub school_id: String,
    pub circuit_id: String,
    pub district_id: String,
    pub region_id: String,
    pub year: String,
    pub term: String,
    pub week: i32,
    pub normal_boys_total: Option<i64>,
    pub normal_girls_total: Option<i64>,
    pub special_boys_total: Option<i64>,
    pub special_girls_total: Option<i64>,
    pub total_population: Option<i64>,
}

/// One teacher's record for one week.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct TeacherAttendanceRow {
    pub teacher_id: String,
    pub school_id: String,
    pub circuit_id: String,
    pub district_id: String,
    pub region_id: String,
    pub year: String,
    pub term: String,
    pub week: i32,
    pub school_session_days: Option<i64>,
    pub days_present: Option<i64>,
    pub days_punctual: Option<i64>,
    pub days_absent: Option<i64>,
    pub excises_given: Option<i64>,
    pub excises_marked: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderDistribution {
    pub boys: i64,
    pub girls: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentSummary {
    pub total_students: i64,
    pub gender_distribution: GenderDistribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub total_enrolled: i64,
    pub total_present: i64,
    pub attendance_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAttendanceSummary {
    pub total_teachers: usize,
    pub attendance_rate: f64,
    pub exercise_completion_rate: f64,
}

/// A distinct (year, term, week) combination with data behind it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, FromRow)]
pub struct PeriodTriple {
    pub year: String,
    pub term: String,
    pub week: i32,
}

impl PeriodTriple {
    pub fn new(year: impl Into<String>, term: impl Into<String>, week: i32) -> Self {
        Self {
            year: year.into(),
            term: term.into(),
            week,
        }
    }
}

/// Year and term are always required; a missing week means "latest" or
/// "all weeks" depending on whether the caller aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingPeriod {
    pub year: String,
    pub term: String,
    pub week: Option<i32>,
}

impl std::fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} term {}", self.year, self.term)?;
        if let Some(week) = self.week {
            write!(f, " week {week}")?;
        }
        Ok(())
    }
}

/// Everything a dashboard shows for one scope and period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSummary {
    pub enrollment: Option<EnrollmentSummary>,
    pub student_attendance: Option<AttendanceSummary>,
    pub teacher_attendance: Option<TeacherAttendanceSummary>,
}
