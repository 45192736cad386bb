use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use serde::Deserialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info, warn};

use crate::models::{
    AttendanceRow, EnrollmentRow, PeriodTriple, ReportingPeriod, TeacherAttendanceRow,
};
use crate::scope::{Scope, ScopeFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricKind {
    Enrollment,
    Attendance,
    TeacherAttendance,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [
        MetricKind::Enrollment,
        MetricKind::Attendance,
        MetricKind::TeacherAttendance,
    ];

    fn table(self) -> &'static str {
        match self {
            MetricKind::Enrollment => "school_indicators.enrollment",
            MetricKind::Attendance => "school_indicators.student_attendance",
            MetricKind::TeacherAttendance => "school_indicators.teacher_attendance",
        }
    }

    fn columns(self) -> &'static str {
        match self {
            MetricKind::Enrollment | MetricKind::Attendance => {
                "school_id, circuit_id, district_id, region_id, year, term, week, \
                 normal_boys_total, normal_girls_total, special_boys_total, \
                 special_girls_total, total_population"
            }
            MetricKind::TeacherAttendance => {
                "teacher_id, school_id, circuit_id, district_id, region_id, year, term, week, \
                 school_session_days, days_present, days_punctual, days_absent, \
                 excises_given, excises_marked"
            }
        }
    }
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Rows for one (year, term), optionally narrowed to one hierarchy column,
/// newest week first. Week selection happens in memory afterwards.
pub fn rows_query(kind: MetricKind, filter: Option<&ScopeFilter>) -> String {
    let mut query = format!(
        "SELECT {} FROM {} WHERE year = $1 AND term = $2",
        kind.columns(),
        kind.table()
    );

    if let Some(filter) = filter {
        query.push_str(&format!(" AND {} = $3", filter.column.as_str()));
    }

    query.push_str(" ORDER BY week DESC, school_id");
    query
}

/// Distinct (year, term, week) triples across every metric table, newest first.
pub fn period_triples_query(filter: Option<&ScopeFilter>) -> String {
    let branches: Vec<String> = MetricKind::ALL
        .iter()
        .map(|kind| {
            let mut branch = format!("SELECT year, term, week FROM {}", kind.table());
            if let Some(filter) = filter {
                branch.push_str(&format!(" WHERE {} = $1", filter.column.as_str()));
            }
            branch
        })
        .collect();

    format!(
        "{} ORDER BY year DESC, term DESC, week DESC",
        branches.join(" UNION ")
    )
}

async fn fetch_rows<R>(
    pool: &PgPool,
    kind: MetricKind,
    scope: &Scope,
    period: &ReportingPeriod,
) -> anyhow::Result<Vec<R>>
where
    R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let filter = scope.filter();
    let sql = rows_query(kind, filter.as_ref());
    let mut query = sqlx::query_as::<_, R>(&sql)
        .bind(&period.year)
        .bind(&period.term);

    if let Some(filter) = &filter {
        query = query.bind(&filter.value);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .with_context(|| format!("failed to fetch {kind:?} rows for {scope}"))?;
    debug!(?kind, %scope, %period, count = rows.len(), "fetched metric rows");
    Ok(rows)
}

pub async fn fetch_enrollment(
    pool: &PgPool,
    scope: &Scope,
    period: &ReportingPeriod,
) -> anyhow::Result<Vec<EnrollmentRow>> {
    fetch_rows(pool, MetricKind::Enrollment, scope, period).await
}

pub async fn fetch_attendance(
    pool: &PgPool,
    scope: &Scope,
    period: &ReportingPeriod,
) -> anyhow::Result<Vec<AttendanceRow>> {
    fetch_rows(pool, MetricKind::Attendance, scope, period).await
}

pub async fn fetch_teacher_attendance(
    pool: &PgPool,
    scope: &Scope,
    period: &ReportingPeriod,
) -> anyhow::Result<Vec<TeacherAttendanceRow>> {
    fetch_rows(pool, MetricKind::TeacherAttendance, scope, period).await
}

pub async fn fetch_period_triples(
    pool: &PgPool,
    scope: &Scope,
) -> anyhow::Result<Vec<PeriodTriple>> {
    let filter = scope.filter();
    let sql = period_triples_query(filter.as_ref());
    let mut query = sqlx::query_as::<_, PeriodTriple>(&sql);

    if let Some(filter) = &filter {
        query = query.bind(&filter.value);
    }

    query
        .fetch_all(pool)
        .await
        .with_context(|| format!("failed to fetch reporting periods for {scope}"))
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let schools = vec![
        ("GS-001", "Asokwa M/A Basic", "C-ASK", "D-KMA", "R-ASH"),
        ("GS-002", "Bantama Presby Primary", "C-BAN", "D-KMA", "R-ASH"),
        ("GS-003", "Suame SDA Basic", "C-BAN", "D-KMA", "R-ASH"),
        ("GS-004", "Osu Salem JHS", "C-OSU", "D-AMA", "R-GAR"),
    ];

    for (school_id, name, circuit_id, district_id, region_id) in &schools {
        sqlx::query(
            r#"
            INSERT INTO school_indicators.schools
            (school_id, name, circuit_id, district_id, region_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (school_id) DO UPDATE
            SET name = EXCLUDED.name, circuit_id = EXCLUDED.circuit_id,
                district_id = EXCLUDED.district_id, region_id = EXCLUDED.region_id
            "#,
        )
        .bind(*school_id)
        .bind(*name)
        .bind(*circuit_id)
        .bind(*district_id)
        .bind(*region_id)
        .execute(pool)
        .await?;
    }

    let year = "2024/2025";
    let term = "1";

    for (offset, (school_id, ..)) in schools.iter().enumerate() {
        let base = 60 + 15 * offset as i64;

        for week in 1..=3i32 {
            let enrolled = PopulationCsvRow {
                school_id: school_id.to_string(),
                year: year.to_string(),
                term: term.to_string(),
                week,
                normal_boys_total: Some(base / 2),
                normal_girls_total: Some(base / 2 + 2),
                special_boys_total: Some(1),
                special_girls_total: Some(offset as i64 % 2),
                total_population: Some(base + 3 + offset as i64 % 2),
            };
            let total = enrolled.total_population;
            upsert_population(pool, MetricKind::Enrollment, &enrolled).await?;

            let absent = i64::from(week) + offset as i64;
            let present = PopulationCsvRow {
                normal_boys_total: enrolled.normal_boys_total.map(|count| count - absent),
                normal_girls_total: enrolled.normal_girls_total.map(|count| count - 1),
                total_population: total,
                ..enrolled
            };
            upsert_population(pool, MetricKind::Attendance, &present).await?;

            for teacher in 1..=2 {
                let row = TeacherCsvRow {
                    teacher_id: format!("{school_id}-T{teacher}"),
                    school_id: school_id.to_string(),
                    year: year.to_string(),
                    term: term.to_string(),
                    week,
                    school_session_days: Some(5),
                    days_present: Some(5 - i64::from(teacher == 2 && week == 2)),
                    days_punctual: Some(4),
                    days_absent: Some(i64::from(teacher == 2 && week == 2)),
                    excises_given: Some(6 + i64::from(teacher)),
                    excises_marked: Some(5 + i64::from(teacher) - i64::from(week == 3)),
                };
                upsert_teacher(pool, &row).await?;
            }
        }
    }

    info!(schools = schools.len(), "seeded reporting data");
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
struct PopulationCsvRow {
    school_id: String,
    year: String,
    term: String,
    week: i32,
    normal_boys_total: Option<i64>,
    normal_girls_total: Option<i64>,
    special_boys_total: Option<i64>,
    special_girls_total: Option<i64>,
    total_population: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct TeacherCsvRow {
    teacher_id: String,
    school_id: String,
    year: String,
    term: String,
    week: i32,
    school_session_days: Option<i64>,
    days_present: Option<i64>,
    days_punctual: Option<i64>,
    days_absent: Option<i64>,
    excises_given: Option<i64>,
    excises_marked: Option<i64>,
}

// Hierarchy ids are copied from the schools table so every row carries them.
fn population_upsert_sql(kind: MetricKind) -> String {
    format!(
        r#"
        INSERT INTO {}
        (school_id, circuit_id, district_id, region_id, year, term, week,
         normal_boys_total, normal_girls_total, special_boys_total,
         special_girls_total, total_population)
        SELECT s.school_id, s.circuit_id, s.district_id, s.region_id,
               $2, $3, $4, $5, $6, $7, $8, $9
        FROM school_indicators.schools s
        WHERE s.school_id = $1
        ON CONFLICT (school_id, year, term, week) DO UPDATE
        SET circuit_id = EXCLUDED.circuit_id,
            district_id = EXCLUDED.district_id,
            region_id = EXCLUDED.region_id,
            normal_boys_total = EXCLUDED.normal_boys_total,
            normal_girls_total = EXCLUDED.normal_girls_total,
            special_boys_total = EXCLUDED.special_boys_total,
            special_girls_total = EXCLUDED.special_girls_total,
            total_population = EXCLUDED.total_population
        "#,
        kind.table()
    )
}

async fn upsert_population(
    pool: &PgPool,
    kind: MetricKind,
    row: &PopulationCsvRow,
) -> anyhow::Result<u64> {
    let sql = population_upsert_sql(kind);
    let result = sqlx::query(&sql)
        .bind(&row.school_id)
        .bind(&row.year)
        .bind(&row.term)
        .bind(row.week)
        .bind(row.normal_boys_total)
        .bind(row.normal_girls_total)
        .bind(row.special_boys_total)
        .bind(row.special_girls_total)
        .bind(row.total_population)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

async fn upsert_teacher(pool: &PgPool, row: &TeacherCsvRow) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO school_indicators.teacher_attendance
        (teacher_id, school_id, circuit_id, district_id, region_id, year, term, week,
         school_session_days, days_present, days_punctual, days_absent,
         excises_given, excises_marked)
        SELECT $1, s.school_id, s.circuit_id, s.district_id, s.region_id,
               $3, $4, $5, $6, $7, $8, $9, $10, $11
        FROM school_indicators.schools s
        WHERE s.school_id = $2
        ON CONFLICT (teacher_id, year, term, week) DO UPDATE
        SET school_id = EXCLUDED.school_id,
            circuit_id = EXCLUDED.circuit_id,
            district_id = EXCLUDED.district_id,
            region_id = EXCLUDED.region_id,
            school_session_days = EXCLUDED.school_session_days,
            days_present = EXCLUDED.days_present,
            days_punctual = EXCLUDED.days_punctual,
            days_absent = EXCLUDED.days_absent,
            excises_given = EXCLUDED.excises_given,
            excises_marked = EXCLUDED.excises_marked
        "#,
    )
    .bind(&row.teacher_id)
    .bind(&row.school_id)
    .bind(&row.year)
    .bind(&row.term)
    .bind(row.week)
    .bind(row.school_session_days)
    .bind(row.days_present)
    .bind(row.days_punctual)
    .bind(row.days_absent)
    .bind(row.excises_given)
    .bind(row.excises_marked)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Loads weekly rows from a CSV file. Empty cells become NULL. Rows naming an
/// unknown school are skipped with a warning. Returns the number of rows
/// inserted or updated.
pub async fn import_csv(
    pool: &PgPool,
    kind: MetricKind,
    csv_path: &Path,
) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut written = 0usize;

    match kind {
        MetricKind::Enrollment | MetricKind::Attendance => {
            for (line, result) in reader.deserialize::<PopulationCsvRow>().enumerate() {
                let row = result.with_context(|| format!("invalid CSV record {}", line + 1))?;
                if upsert_population(pool, kind, &row).await? > 0 {
                    written += 1;
                } else {
                    warn!(school_id = %row.school_id, "skipping row for unknown school");
                }
            }
        }
        MetricKind::TeacherAttendance => {
            for (line, result) in reader.deserialize::<TeacherCsvRow>().enumerate() {
                let row = result.with_context(|| format!("invalid CSV record {}", line + 1))?;
                if upsert_teacher(pool, &row).await? > 0 {
                    written += 1;
                } else {
                    warn!(
                        school_id = %row.school_id,
                        teacher_id = %row.teacher_id,
                        "skipping row for unknown school"
                    );
                }
            }
        }
    }

    info!(?kind, written, path = %csv_path.display(), "imported CSV");
    Ok(written)
}
