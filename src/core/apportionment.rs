//! Distribution of the 2% ROL fee across the municipalities covered by a term,
//! weighted by population share and by the term's share of the operator's
//! spectrum in each municipality.

use crate::domain::model::{
    CalculationRequest, Entity, ExpandedRow, FactorRow, OnusResult, SummaryStatistics, ONUS_RATE,
};
use crate::utils::error::{OnusError, Result};
use std::collections::{HashMap, HashSet};

/// Identifies the term whose fee is being apportioned.
#[derive(Debug, Clone, Copy)]
pub struct TargetTerm<'a> {
    pub base_year: u16,
    pub entity: Entity,
    pub state: &'a str,
    pub term_number: &'a str,
    pub term_year: u16,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OnusCalculator;

impl OnusCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Presence checks run first, in selection order, then the ROL check.
    pub fn validate_inputs(&self, request: &CalculationRequest) -> Result<()> {
        self.selection(request).map(|_| ())
    }

    /// Validates the request and apportions its fee over `rows`.
    pub fn calculate_request(
        &self,
        request: &CalculationRequest,
        rows: &[ExpandedRow],
    ) -> Result<OnusResult> {
        let target = self.selection(request)?;
        Ok(self.calculate(&target, request.rol, rows))
    }

    fn selection<'r>(&self, request: &'r CalculationRequest) -> Result<TargetTerm<'r>> {
        let base_year = request
            .base_year
            .ok_or_else(|| OnusError::validation("Base year not selected"))?;
        let entity = request
            .entity
            .ok_or_else(|| OnusError::validation("Entity not selected"))?;
        let state = non_blank(&request.state)
            .ok_or_else(|| OnusError::validation("State not selected"))?;
        let term_number = non_blank(&request.term_number)
            .ok_or_else(|| OnusError::validation("Term not selected"))?;
        let term_year = request
            .term_year
            .ok_or_else(|| OnusError::validation("Term year not selected"))?;
        if !(request.rol > 0.0) {
            return Err(OnusError::validation("ROL must be greater than zero"));
        }

        Ok(TargetTerm {
            base_year,
            entity,
            state,
            term_number,
            term_year,
        })
    }

    /// Never fails: a term absent from `rows` yields an empty table and zero fee.
    pub fn calculate(&self, target: &TargetTerm<'_>, rol: f64, rows: &[ExpandedRow]) -> OnusResult {
        let year_rows = distinct_rows_for_year(rows, target.base_year);
        let population_total = population_total(&year_rows);

        let target_rows: Vec<&ExpandedRow> = year_rows
            .iter()
            .copied()
            .filter(|row| {
                row.entity == target.entity
                    && row.state == target.state
                    && row.term_number == target.term_number
                    && row.term_year == target.term_year
            })
            .collect();

        if target_rows.is_empty() {
            tracing::info!(
                "Term {}/{} of {} not found in {} for {}, nothing to apportion",
                target.term_number,
                target.term_year,
                target.entity,
                target.state,
                target.base_year
            );
            return OnusResult::empty(population_total);
        }

        // Every other license the operator holds in the state, regardless of year.
        let mut other_ratios: HashMap<&str, DistinctSum> = HashMap::new();
        for row in year_rows.iter().filter(|row| {
            row.entity == target.entity
                && row.state == target.state
                && row.term_number != target.term_number
        }) {
            other_ratios
                .entry(row.municipality_code.as_str())
                .or_default()
                .add(row.bandwidth_to_frequency_ratio());
        }

        let mut municipalities: Vec<&str> = Vec::new();
        let mut target_by_code: HashMap<&str, Vec<&ExpandedRow>> = HashMap::new();
        for &row in &target_rows {
            let code = row.municipality_code.as_str();
            let entry = target_by_code.entry(code).or_default();
            if entry.is_empty() {
                municipalities.push(code);
            }
            entry.push(row);
        }

        let mut factors = Vec::with_capacity(municipalities.len());
        let mut total_onus = 0.0;

        for code in municipalities {
            let rows_here = &target_by_code[code];
            let first = rows_here[0];

            let population = first.population.unwrap_or(0);
            let population_factor = if population_total > 0 {
                population as f64 / population_total as f64
            } else {
                0.0
            };

            let mut numerator = DistinctSum::default();
            for row in rows_here {
                numerator.add(row.bandwidth_to_frequency_ratio());
            }
            let numerator = numerator.total();
            let denominator = numerator + other_ratios.get(code).map(DistinctSum::total).unwrap_or(0.0);
            let frequency_factor = if denominator > 0.0 {
                numerator / denominator
            } else {
                0.0
            };

            let municipality_onus = frequency_factor * population_factor * ONUS_RATE * rol;
            total_onus += municipality_onus;

            factors.push(FactorRow {
                municipality_code: code.to_string(),
                municipality_name: first.municipality_name.clone(),
                frequency_factor,
                population_factor,
                municipality_onus,
            });
        }

        tracing::debug!(
            "Term {}/{}: {} municipalities, total ônus {:.2}",
            target.term_number,
            target.term_year,
            factors.len(),
            total_onus
        );

        OnusResult {
            total_onus,
            factors,
            population_total,
        }
    }

    pub fn summary_statistics(&self, result: &OnusResult) -> Option<SummaryStatistics> {
        let first = result.factors.first()?;
        let mut max_onus = first.municipality_onus;
        let mut min_onus = first.municipality_onus;
        let mut total_onus = 0.0;
        for row in &result.factors {
            max_onus = max_onus.max(row.municipality_onus);
            min_onus = min_onus.min(row.municipality_onus);
            total_onus += row.municipality_onus;
        }
        let total_municipalities = result.factors.len();

        Some(SummaryStatistics {
            total_municipalities,
            max_onus,
            min_onus,
            avg_onus: total_onus / total_municipalities as f64,
            total_onus,
        })
    }
}

pub fn format_currency(value: f64) -> String {
    format!("R$ {:.2}", value)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Rows of `year` with exact duplicates removed.
fn distinct_rows_for_year(rows: &[ExpandedRow], year: u16) -> Vec<&ExpandedRow> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| row.base_year == year)
        .filter(|row| seen.insert(row.identity()))
        .collect()
}

/// A municipality covered by several terms counts its population once.
fn population_total(rows: &[&ExpandedRow]) -> u64 {
    let mut seen = HashSet::new();
    let mut total = 0u64;
    for row in rows {
        if row.population.is_none() && seen.insert((row.municipality_code.as_str(), None)) {
            tracing::warn!(
                "No population for municipality {} ({}) in {}, counted as zero",
                row.municipality_name,
                row.municipality_code,
                row.base_year
            );
            continue;
        }
        if let Some(population) = row.population {
            if seen.insert((row.municipality_code.as_str(), Some(population))) {
                total += population;
            }
        }
    }
    total
}

/// Sum over distinct values; each frequency allocation counts once.
#[derive(Debug, Default)]
struct DistinctSum {
    seen: HashSet<u64>,
    total: f64,
}

impl DistinctSum {
    fn add(&mut self, value: f64) {
        if self.seen.insert(value.to_bits()) {
            self.total += value;
        }
    }

    fn total(&self) -> f64 {
        self.total
    }
}
