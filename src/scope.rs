use std::fmt;

use tracing::debug;

/// Hierarchy identifiers as they arrive from a request. Any subset may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeCandidates {
    pub school_id: Option<String>,
    pub circuit_id: Option<String>,
    pub district_id: Option<String>,
    pub region_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeColumn {
    School,
    Circuit,
    District,
    Region,
}

impl ScopeColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeColumn::School => "school_id",
            ScopeColumn::Circuit => "circuit_id",
            ScopeColumn::District => "district_id",
            ScopeColumn::Region => "region_id",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFilter {
    pub column: ScopeColumn,
    pub value: String,
}

/// Picks the single filter a query should apply.
///
/// Precedence is school, circuit, district, region. The first identifier that
/// is set and non-blank wins and the rest are ignored, so a request carrying
/// both a circuit and a district is treated as circuit-scoped. Returns `None`
/// when nothing is set, meaning the whole dataset.
pub fn resolve_scope(candidates: &ScopeCandidates) -> Option<ScopeFilter> {
    let ordered = [
        (ScopeColumn::School, candidates.school_id.as_deref()),
        (ScopeColumn::Circuit, candidates.circuit_id.as_deref()),
        (ScopeColumn::District, candidates.district_id.as_deref()),
        (ScopeColumn::Region, candidates.region_id.as_deref()),
    ];

    let mut present = ordered
        .into_iter()
        .filter_map(|(column, value)| present_value(value).map(|value| (column, value)));

    let (column, value) = present.next()?;
    let ignored: Vec<&'static str> = present.map(|(column, _)| column.as_str()).collect();
    if !ignored.is_empty() {
        debug!(
            applied = column.as_str(),
            ?ignored,
            "multiple scope identifiers supplied, broader filters dropped"
        );
    }

    Some(ScopeFilter {
        column,
        value: value.to_string(),
    })
}

fn present_value(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// A scope that can only ever name one level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    School(String),
    Circuit(String),
    District(String),
    Region(String),
    #[default]
    Unscoped,
}

impl Scope {
    pub fn resolve(candidates: &ScopeCandidates) -> Self {
        resolve_scope(candidates).map(Scope::from).unwrap_or_default()
    }

    pub fn filter(&self) -> Option<ScopeFilter> {
        let (column, value) = match self {
            Scope::School(id) => (ScopeColumn::School, id),
            Scope::Circuit(id) => (ScopeColumn::Circuit, id),
            Scope::District(id) => (ScopeColumn::District, id),
            Scope::Region(id) => (ScopeColumn::Region, id),
            Scope::Unscoped => return None,
        };
        Some(ScopeFilter {
            column,
            value: value.clone(),
        })
    }
}

impl From<ScopeFilter> for Scope {
    fn from(filter: ScopeFilter) -> Self {
        match filter.column {
            ScopeColumn::School => Scope::School(filter.value),
            ScopeColumn::Circuit => Scope::Circuit(filter.value),
            ScopeColumn::District => Scope::District(filter.value),
            ScopeColumn::Region => Scope::Region(filter.value),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::School(id) => write!(f, "school {id}"),
            Scope::Circuit(id) => write!(f, "circuit {id}"),
            Scope::District(id) => write!(f, "district {id}"),
            Scope::Region(id) => write!(f, "region {id}"),
            Scope::Unscoped => write!(f, "all schools"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(
        school: Option<&str>,
        circuit: Option<&str>,
        district: Option<&str>,
        region: Option<&str>,
    ) -> ScopeCandidates {
        ScopeCandidates {
            school_id: school.map(String::from),
            circuit_id: circuit.map(String::from),
            district_id: district.map(String::from),
            region_id: region.map(String::from),
        }
    }

    #[test]
    fn school_wins_over_district() {
        let resolved = resolve_scope(&candidates(Some("5"), None, Some("9"), None));
        assert_eq!(
            resolved,
            Some(ScopeFilter {
                column: ScopeColumn::School,
                value: "5".to_string(),
            })
        );
    }

    #[test]
    fn circuit_wins_over_district_and_region() {
        let resolved = resolve_scope(&candidates(None, Some("C-3"), Some("D-1"), Some("R-1")))
            .expect("circuit scope");
        assert_eq!(resolved.column, ScopeColumn::Circuit);
        assert_eq!(resolved.value, "C-3");
    }

    #[test]
    fn blank_identifiers_are_skipped() {
        let resolved = resolve_scope(&candidates(Some(""), Some("  "), None, Some("R-2")))
            .expect("region scope");
        assert_eq!(resolved.column, ScopeColumn::Region);
        assert_eq!(resolved.value, "R-2");
    }

    #[test]
    fn nothing_set_means_unscoped() {
        assert_eq!(resolve_scope(&ScopeCandidates::default()), None);
        assert_eq!(Scope::resolve(&ScopeCandidates::default()), Scope::Unscoped);
        assert_eq!(Scope::Unscoped.filter(), None);
    }

    #[test]
    fn values_are_trimmed() {
        let scope = Scope::resolve(&candidates(None, None, Some(" D-7 "), None));
        assert_eq!(scope, Scope::District("D-7".to_string()));
        assert_eq!(scope.to_string(), "district D-7");
    }

    #[test]
    fn scope_filter_names_the_column() {
        let filter = Scope::Circuit("C-1".to_string()).filter().expect("filter");
        assert_eq!(filter.column.as_str(), "circuit_id");
        assert_eq!(filter.value, "C-1");
    }
}
