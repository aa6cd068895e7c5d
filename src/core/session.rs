use crate::core::expansion::{dedup_rows, TermExpander};
use crate::domain::model::{ExpandedRow, RejectedTerm, Term};
use crate::utils::error::{OnusError, Result};

/// Caller-owned working set of terms. Every accepted term has been validated
/// and covers at least one municipality; each successful mutation bumps the
/// version so callers can tell when derived tables are stale.
#[derive(Debug, Clone, Default)]
pub struct TermSet {
    terms: Vec<Term>,
    version: u64,
}

impl TermSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Adds a term after checking it against the reference geography.
    /// On rejection the set is left untouched.
    pub fn add(&mut self, term: Term, expander: &TermExpander<'_>) -> Result<u64> {
        let term = term.normalized();
        expander.expand(&term)?;
        tracing::debug!("Term {} added to the working set", term.label());
        self.terms.push(term);
        self.version += 1;
        Ok(self.version)
    }

    pub fn remove(&mut self, index: usize) -> Result<Term> {
        if index >= self.terms.len() {
            return Err(OnusError::validation(format!(
                "No term at position {} (the set has {} terms)",
                index,
                self.terms.len()
            )));
        }
        let removed = self.terms.remove(index);
        self.version += 1;
        Ok(removed)
    }

    /// Replaces the whole set, as an import does. Terms that fail validation
    /// or coverage are reported and left out; the rest are kept in order.
    pub fn replace_all(&mut self, terms: Vec<Term>, expander: &TermExpander<'_>) -> Vec<RejectedTerm> {
        let mut accepted = Vec::with_capacity(terms.len());
        let mut rejected = Vec::new();

        for (index, term) in terms.into_iter().map(Term::normalized).enumerate() {
            match expander.expand(&term) {
                Ok(_) => accepted.push(term),
                Err(e) => rejected.push(RejectedTerm {
                    index,
                    term: term.label(),
                    reason: e.user_friendly_message(),
                }),
            }
        }

        tracing::info!(
            "Working set replaced: {} terms accepted, {} rejected",
            accepted.len(),
            rejected.len()
        );
        self.terms = accepted;
        self.version += 1;
        rejected
    }

    /// Terms of a base year and/or state, the view shown next to a calculation.
    pub fn filtered(&self, base_year: Option<u16>, state: Option<&str>) -> Vec<&Term> {
        self.terms
            .iter()
            .filter(|t| base_year.is_none_or(|year| t.base_year == year))
            .filter(|t| state.is_none_or(|s| t.state == s))
            .collect()
    }

    /// Municipality table for the whole set, deduplicated.
    pub fn expanded_rows(&self, expander: &TermExpander<'_>) -> Vec<ExpandedRow> {
        let rows = self
            .terms
            .iter()
            .filter_map(|term| match expander.expand(term) {
                Ok(rows) => Some(rows),
                Err(e) => {
                    tracing::warn!("Term {} no longer expands: {}", term.label(), e);
                    None
                }
            })
            .flatten()
            .collect();
        dedup_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reference::ReferenceData;
    use crate::domain::model::{AreaMembership, Entity, PopulationRecord, TermType};

    fn reference() -> ReferenceData {
        let memberships = vec![
            AreaMembership {
                state: "SC".to_string(),
                service_area: "Toda UF".to_string(),
                municipality_code: "42".to_string(),
                municipality_name: "Blumenau".to_string(),
            },
            AreaMembership {
                state: "SC".to_string(),
                service_area: "Toda UF".to_string(),
                municipality_code: "43".to_string(),
                municipality_name: "Joinville".to_string(),
            },
        ];
        let population = vec![PopulationRecord {
            base_year: 2022,
            state: "SC".to_string(),
            municipality_code: "42".to_string(),
            population: 360_000,
        }];
        ReferenceData::new(memberships, population)
    }

    fn term(number: &str) -> Term {
        Term {
            base_year: 2022,
            entity: Entity::Claro,
            term_number: number.to_string(),
            term_year: 2019,
            state: "SC".to_string(),
            service_area: "Toda UF".to_string(),
            exclusion_areas: vec![],
            exclusion_municipalities: vec![],
            freq_initial: 1710.0,
            freq_final: 1725.0,
            term_type: TermType::Onus,
        }
    }

    #[test]
    fn test_add_and_remove_bump_version() {
        let data = reference();
        let expander = TermExpander::new(&data);
        let mut set = TermSet::new();

        assert_eq!(set.add(term("1"), &expander).unwrap(), 1);
        assert_eq!(set.add(term("2"), &expander).unwrap(), 2);
        assert_eq!(set.remove(0).unwrap().term_number, "1");
        assert_eq!(set.version(), 3);
        assert!(set.remove(5).is_err());
        assert_eq!(set.version(), 3);
    }

    #[test]
    fn test_rejected_add_leaves_set_unchanged() {
        let data = reference();
        let expander = TermExpander::new(&data);
        let mut set = TermSet::new();
        let mut uncovered = term("9");
        uncovered.exclusion_municipalities = vec!["Blumenau".to_string(), "Joinville".to_string()];

        let err = set.add(uncovered, &expander).unwrap_err();
        assert!(matches!(err, OnusError::EmptyCoverageError { .. }));
        assert!(set.is_empty());
        assert_eq!(set.version(), 0);
    }

    #[test]
    fn test_replace_all_keeps_valid_terms() {
        let data = reference();
        let expander = TermExpander::new(&data);
        let mut set = TermSet::new();
        let mut inverted = term("3");
        inverted.freq_final = 1700.0;

        let rejected = set.replace_all(vec![term("1"), inverted, term("2")], &expander);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].index, 1);
        assert_eq!(set.len(), 2);
        assert_eq!(set.expanded_rows(&expander).len(), 4);
    }

    #[test]
    fn test_filtered_view() {
        let data = reference();
        let expander = TermExpander::new(&data);
        let mut set = TermSet::new();
        set.add(term("1"), &expander).unwrap();

        assert_eq!(set.filtered(Some(2022), Some("SC")).len(), 1);
        assert_eq!(set.filtered(None, Some("PR")).len(), 0);
        assert_eq!(set.filtered(Some(2021), None).len(), 0);
    }

    #[test]
    fn test_added_terms_are_trimmed_and_match_requests() {
        use crate::core::apportionment::OnusCalculator;
        use crate::domain::model::CalculationRequest;

        let data = reference();
        let expander = TermExpander::new(&data);
        let mut set = TermSet::new();
        let mut padded = term(" 001 ");
        padded.state = " SC".to_string();
        padded.exclusion_municipalities = vec![" Joinville ".to_string(), "  ".to_string()];
        set.add(padded, &expander).unwrap();

        let stored = &set.terms()[0];
        assert_eq!(stored.term_number, "001");
        assert_eq!(stored.state, "SC");
        assert_eq!(stored.exclusion_municipalities, vec!["Joinville".to_string()]);

        let request = CalculationRequest {
            base_year: Some(2022),
            entity: Some(Entity::Claro),
            state: Some("SC".to_string()),
            term_number: Some("001".to_string()),
            term_year: Some(2019),
            rol: 1_000_000.0,
        };
        let result = OnusCalculator::new()
            .calculate_request(&request, &set.expanded_rows(&expander))
            .unwrap();
        assert_eq!(result.factors.len(), 1);
        assert_eq!(result.factors[0].municipality_name, "Blumenau");
    }
}
