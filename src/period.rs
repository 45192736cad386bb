use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::models::{AttendanceRow, EnrollmentRow, PeriodTriple, TeacherAttendanceRow};

/// Rows that belong to a reporting week and to one tracked entity.
pub trait PeriodRow: Clone {
    fn week(&self) -> i32;
    /// The school for population rows, the teacher for teacher rows.
    fn entity_key(&self) -> &str;
}

impl PeriodRow for EnrollmentRow {
    fn week(&self) -> i32 {
        self.week
    }

    fn entity_key(&self) -> &str {
        &self.school_id
    }
}

impl PeriodRow for AttendanceRow {
    fn week(&self) -> i32 {
        self.week
    }

    fn entity_key(&self) -> &str {
        &self.school_id
    }
}

impl PeriodRow for TeacherAttendanceRow {
    fn week(&self) -> i32 {
        self.week
    }

    fn entity_key(&self) -> &str {
        &self.teacher_id
    }
}

/// How weekly rows relate to each other within a term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowSemantics {
    /// Each row counts only its own week; aggregating sums every row.
    #[default]
    Snapshot,
    /// Each row is a running total to date; aggregating keeps the latest
    /// row per entity.
    Cumulative,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodSelection {
    pub aggregate: bool,
    pub week_number: Option<i32>,
    pub semantics: RowSemantics,
}

/// Chooses which rows of a single (year, term) feed the aggregators.
///
/// Without `aggregate`, a requested week keeps the rows for that week and a
/// missing week keeps the rows of the most recent week present. With
/// `aggregate`, every row is kept for snapshot data, and only each entity's
/// latest row for cumulative data.
pub fn select_period_rows<R: PeriodRow>(rows: &[R], selection: &PeriodSelection) -> Vec<R> {
    if selection.aggregate {
        return match selection.semantics {
            RowSemantics::Snapshot => rows.to_vec(),
            RowSemantics::Cumulative => latest_per_entity(rows),
        };
    }

    let Some(week) = selection
        .week_number
        .or_else(|| rows.iter().map(|row| row.week()).max())
    else {
        return Vec::new();
    };

    rows.iter().filter(|row| row.week() == week).cloned().collect()
}

fn latest_per_entity<R: PeriodRow>(rows: &[R]) -> Vec<R> {
    let mut latest: HashMap<&str, usize> = HashMap::new();
    for (index, row) in rows.iter().enumerate() {
        latest
            .entry(row.entity_key())
            .and_modify(|current| {
                if row.week() > rows[*current].week() {
                    *current = index;
                }
            })
            .or_insert(index);
    }

    let mut keep: Vec<usize> = latest.into_values().collect();
    keep.sort_unstable();
    keep.into_iter().map(|index| rows[index].clone()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermWeeks {
    pub term: String,
    pub weeks: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearTerms {
    pub year: String,
    pub terms: Vec<TermWeeks>,
}

/// Year → term → weeks, in the order years and terms were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodCatalog {
    years: Vec<YearTerms>,
}

impl PeriodCatalog {
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn years(&self) -> impl Iterator<Item = &YearTerms> {
        self.years.iter()
    }

    pub fn terms(&self, year: &str) -> Option<&[TermWeeks]> {
        self.years
            .iter()
            .find(|entry| entry.year == year)
            .map(|entry| entry.terms.as_slice())
    }

    pub fn weeks(&self, year: &str, term: &str) -> Option<&[i32]> {
        self.terms(year)?
            .iter()
            .find(|entry| entry.term == term)
            .map(|entry| entry.weeks.as_slice())
    }

    /// First year, its first term, and that term's highest week.
    pub fn latest(&self) -> Option<PeriodTriple> {
        let year = self.years.first()?;
        let term = year.terms.first()?;
        let week = term.weeks.last()?;
        Some(PeriodTriple::new(year.year.clone(), term.term.clone(), *week))
    }

    /// Copy ordered newest first regardless of how the triples arrived:
    /// years descending as text, terms descending by number.
    pub fn sorted_recent_first(&self) -> PeriodCatalog {
        let mut years = self.years.clone();
        years.sort_by(|a, b| b.year.cmp(&a.year));
        for year in &mut years {
            year.terms
                .sort_by(|a, b| term_order(&b.term).cmp(&term_order(&a.term)));
        }
        PeriodCatalog { years }
    }
}

// Numeric terms sort by value; anything else sorts after them by text.
fn term_order(term: &str) -> (u8, i64, &str) {
    match term.trim().parse::<i64>() {
        Ok(value) => (1, value, term),
        Err(_) => (0, 0, term),
    }
}

impl Serialize for PeriodCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.years.len()))?;
        for year in &self.years {
            map.serialize_entry(&year.year, &TermMap(&year.terms))?;
        }
        map.end()
    }
}

struct TermMap<'a>(&'a [TermWeeks]);

impl Serialize for TermMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for term in self.0 {
            map.serialize_entry(&term.term, &term.weeks)?;
        }
        map.end()
    }
}

/// Groups flat (year, term, week) triples into a [`PeriodCatalog`].
///
/// Years and terms keep first-seen order, so callers that want newest first
/// should pass triples sorted descending (or call
/// [`PeriodCatalog::sorted_recent_first`]). Weeks are deduplicated and sorted
/// ascending within each term.
pub fn build_period_catalog(triples: &[PeriodTriple]) -> PeriodCatalog {
    let mut years: Vec<YearTerms> = Vec::new();

    for triple in triples {
        let year_index = match years.iter().position(|entry| entry.year == triple.year) {
            Some(index) => index,
            None => {
                years.push(YearTerms {
                    year: triple.year.clone(),
                    terms: Vec::new(),
                });
                years.len() - 1
            }
        };
        let terms = &mut years[year_index].terms;

        let term_index = match terms.iter().position(|entry| entry.term == triple.term) {
            Some(index) => index,
            None => {
                terms.push(TermWeeks {
                    term: triple.term.clone(),
                    weeks: Vec::new(),
                });
                terms.len() - 1
            }
        };
        terms[term_index].weeks.push(triple.week);
    }

    for year in &mut years {
        for term in &mut year.terms {
            term.weeks.sort_unstable();
            term.weeks.dedup();
        }
    }

    PeriodCatalog { years }
}
