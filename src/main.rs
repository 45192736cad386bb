use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

mod aggregate;
mod config;
mod db;
mod logging;
mod models;
mod period;
mod report;
mod scope;

use crate::models::{ReportingPeriod, ScopeSummary};
use crate::period::{build_period_catalog, PeriodSelection, RowSemantics};
use crate::scope::{Scope, ScopeCandidates};

#[derive(Parser)]
#[command(name = "school-indicators")]
#[command(
    about = "Enrollment and attendance reporting across the school hierarchy",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// When several are given the narrowest wins: school, circuit, district, region.
#[derive(Args, Debug, Clone)]
struct ScopeArgs {
    #[arg(long)]
    school: Option<String>,
    #[arg(long)]
    circuit: Option<String>,
    #[arg(long)]
    district: Option<String>,
    #[arg(long)]
    region: Option<String>,
}

impl ScopeArgs {
    fn resolve(&self) -> Scope {
        Scope::resolve(&ScopeCandidates {
            school_id: self.school.clone(),
            circuit_id: self.circuit.clone(),
            district_id: self.district.clone(),
            region_id: self.region.clone(),
        })
    }
}

#[derive(Args, Debug, Clone)]
struct PeriodArgs {
    /// Academic year label, e.g. 2024/2025
    #[arg(long)]
    year: String,
    #[arg(long)]
    term: String,
    #[arg(long)]
    week: Option<i32>,
    /// Combine every week of the term instead of a single week
    #[arg(long)]
    aggregate: bool,
    /// Treat weekly rows as running totals when combining weeks
    #[arg(long)]
    cumulative: bool,
}

impl PeriodArgs {
    fn period(&self) -> ReportingPeriod {
        ReportingPeriod {
            year: self.year.clone(),
            term: self.term.clone(),
            week: self.week,
        }
    }

    fn selection(&self) -> PeriodSelection {
        PeriodSelection {
            aggregate: self.aggregate,
            week_number: self.week,
            semantics: if self.cumulative {
                RowSemantics::Cumulative
            } else {
                RowSemantics::Snapshot
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small sample hierarchy with three weeks of data
    Seed,
    /// Import weekly rows from a CSV file
    Import {
        #[arg(long, value_enum)]
        kind: db::MetricKind,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print enrollment and attendance summaries for a scope and period
    Summary {
        #[command(flatten)]
        scope: ScopeArgs,
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long)]
        json: bool,
    },
    /// List the years, terms and weeks that have data
    Periods {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Sort years and terms newest first instead of trusting query order
        #[arg(long)]
        recent_first: bool,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export the summary as a spreadsheet-friendly CSV
    Export {
        #[command(flatten)]
        scope: ScopeArgs,
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long, default_value = "summary.csv")]
        out: PathBuf,
    },
}

async fn load_summary(
    pool: &PgPool,
    scope: &Scope,
    period: &PeriodArgs,
) -> anyhow::Result<ScopeSummary> {
    let reporting_period = period.period();
    let (enrollment, attendance, teachers) = tokio::try_join!(
        db::fetch_enrollment(pool, scope, &reporting_period),
        db::fetch_attendance(pool, scope, &reporting_period),
        db::fetch_teacher_attendance(pool, scope, &reporting_period),
    )?;

    Ok(aggregate::summarize(
        &enrollment,
        &attendance,
        &teachers,
        &period.selection(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::Config::from_env()?;
    logging::init_logging(config.is_production());

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { kind, csv } => {
            let written = db::import_csv(&pool, kind, &csv).await?;
            println!("Imported {written} rows from {}.", csv.display());
        }
        Commands::Summary {
            scope,
            period,
            json,
        } => {
            let scope = scope.resolve();
            let summary = load_summary(&pool, &scope, &period).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            println!("Summary for {} ({}):", scope, period.period());
            match summary.enrollment {
                Some(e) => println!(
                    "- Enrollment: {} students ({} boys, {} girls)",
                    e.total_students, e.gender_distribution.boys, e.gender_distribution.girls
                ),
                None => println!("- Enrollment: no data"),
            }
            match summary.student_attendance {
                Some(a) => println!(
                    "- Student attendance: {} of {} present ({:.2}%)",
                    a.total_present, a.total_enrolled, a.attendance_rate
                ),
                None => println!("- Student attendance: no data"),
            }
            match summary.teacher_attendance {
                Some(t) => println!(
                    "- Teacher attendance: {:.2}% across {} records, exercises marked {:.2}%",
                    t.attendance_rate, t.total_teachers, t.exercise_completion_rate
                ),
                None => println!("- Teacher attendance: no data"),
            }
        }
        Commands::Periods {
            scope,
            recent_first,
            json,
        } => {
            let scope = scope.resolve();
            let triples = db::fetch_period_triples(&pool, &scope).await?;
            let mut catalog = build_period_catalog(&triples);
            if recent_first {
                catalog = catalog.sorted_recent_first();
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
                return Ok(());
            }

            if catalog.is_empty() {
                println!("No reporting periods found for {scope}.");
                return Ok(());
            }

            println!("Reporting periods for {scope}:");
            for year in catalog.years() {
                for term in &year.terms {
                    println!("- {} term {}: weeks {:?}", year.year, term.term, term.weeks);
                }
            }
            if let Some(latest) = catalog.latest() {
                println!(
                    "Latest: {} term {} week {}",
                    latest.year, latest.term, latest.week
                );
            }
        }
        Commands::Report { scope, period, out } => {
            let scope = scope.resolve();
            let summary = load_summary(&pool, &scope, &period).await?;
            let triples = db::fetch_period_triples(&pool, &scope).await?;
            let catalog = build_period_catalog(&triples);
            if catalog.weeks(&period.year, &period.term).is_none() {
                warn!(
                    %scope,
                    year = %period.year,
                    term = %period.term,
                    "no data recorded for requested term"
                );
            }
            let report = report::build_report(
                &scope,
                &period.period(),
                period.aggregate,
                &summary,
                &catalog,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(%scope, path = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
        Commands::Export { scope, period, out } => {
            let scope = scope.resolve();
            let summary = load_summary(&pool, &scope, &period).await?;
            let rows = report::write_summary_csv(&out, &scope, &period.period(), &summary)?;
            println!("Exported {rows} metrics to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn scope_flags_resolve_by_precedence() {
        let cli = Cli::try_parse_from([
            "school-indicators",
            "summary",
            "--district",
            "D-KMA",
            "--circuit",
            "C-BAN",
            "--year",
            "2024/2025",
            "--term",
            "1",
            "--aggregate",
            "--cumulative",
        ])
        .expect("parse");

        let Commands::Summary { scope, period, .. } = cli.command else {
            panic!("expected summary command");
        };
        assert_eq!(scope.resolve(), Scope::Circuit("C-BAN".to_string()));
        let selection = period.selection();
        assert!(selection.aggregate);
        assert_eq!(selection.week_number, None);
        assert_eq!(selection.semantics, RowSemantics::Cumulative);
    }
}
