//! Joins each term with the municipalities it legally covers.

use crate::core::area::AreaResolver;
use crate::core::reference::ReferenceData;
use crate::domain::exclusion_list;
use crate::domain::model::{ExpandedRow, RejectedTerm, Term};
use crate::utils::error::{OnusError, Result};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct ExpansionReport {
    pub rows: Vec<ExpandedRow>,
    pub rejected: Vec<RejectedTerm>,
}

pub struct TermExpander<'a> {
    resolver: AreaResolver<'a>,
}

impl<'a> TermExpander<'a> {
    pub fn new(data: &'a ReferenceData) -> Self {
        Self {
            resolver: AreaResolver::new(data),
        }
    }

    pub fn resolver(&self) -> &AreaResolver<'a> {
        &self.resolver
    }

    /// One row per municipality the term covers after area exclusions and then
    /// municipality exclusions, both evaluated for the term's own year and state.
    pub fn expand(&self, term: &Term) -> Result<Vec<ExpandedRow>> {
        term.validate()?;

        let covered = self
            .resolver
            .resolve_area(term.base_year, &term.state, &term.service_area)?;
        let covered = self.resolver.apply_area_exclusions(
            covered,
            &term.exclusion_areas,
            term.base_year,
            &term.state,
        );
        let covered = self
            .resolver
            .apply_municipality_exclusions(covered, &term.exclusion_municipalities);

        if covered.is_empty() {
            return Err(OnusError::EmptyCoverageError { term: term.label() });
        }

        let exclusion_areas = exclusion_list::join(&term.exclusion_areas);
        let exclusion_municipalities = exclusion_list::join(&term.exclusion_municipalities);
        let central_frequency = term.central_frequency();
        let bandwidth = term.bandwidth();

        Ok(covered
            .into_iter()
            .map(|municipality| ExpandedRow {
                base_year: term.base_year,
                entity: term.entity,
                term_number: term.term_number.clone(),
                term_year: term.term_year,
                state: term.state.clone(),
                service_area: term.service_area.clone(),
                exclusion_areas: exclusion_areas.clone(),
                exclusion_municipalities: exclusion_municipalities.clone(),
                freq_initial: term.freq_initial,
                freq_final: term.freq_final,
                central_frequency,
                bandwidth,
                term_type: term.term_type,
                municipality_code: municipality.code,
                municipality_name: municipality.name,
                population: municipality.population,
            })
            .collect())
    }

    /// Expands every term, collecting per-term rejections instead of stopping,
    /// then drops rows that are identical in every column.
    pub fn expand_all(&self, terms: &[Term]) -> ExpansionReport {
        let mut report = ExpansionReport::default();

        for (index, term) in terms.iter().enumerate() {
            match self.expand(term) {
                Ok(rows) => {
                    tracing::debug!("Term {} covers {} municipalities", term.label(), rows.len());
                    report.rows.extend(rows);
                }
                Err(e) => {
                    tracing::warn!("⚠️ Term {} rejected: {}", term.label(), e);
                    report.rejected.push(RejectedTerm {
                        index,
                        term: term.label(),
                        reason: e.user_friendly_message(),
                    });
                }
            }
        }

        report.rows = dedup_rows(report.rows);
        report
    }
}

/// Keeps the first occurrence of every distinct row, preserving order.
pub fn dedup_rows(rows: Vec<ExpandedRow>) -> Vec<ExpandedRow> {
    let mut keep = Vec::with_capacity(rows.len());
    {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            keep.push(seen.insert(row.identity()));
        }
    }
    rows.into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect()
}
