//! Service area resolution and geographic exclusions.

use crate::core::reference::ReferenceData;
use crate::domain::model::{ResolvedMunicipality, WHOLE_STATE_AREA};
use crate::utils::error::{OnusError, Result};
use std::collections::{BTreeSet, HashSet};

pub struct AreaResolver<'a> {
    data: &'a ReferenceData,
}

impl<'a> AreaResolver<'a> {
    pub fn new(data: &'a ReferenceData) -> Self {
        Self { data }
    }

    /// Municipalities of `service_area` in `state`, in table order, with the
    /// population of `year` attached.
    pub fn resolve_area(
        &self,
        year: u16,
        state: &str,
        service_area: &str,
    ) -> Result<Vec<ResolvedMunicipality>> {
        let municipalities: Vec<ResolvedMunicipality> = self
            .data
            .memberships()
            .iter()
            .filter(|m| m.state == state && m.service_area == service_area)
            .map(|m| self.data.resolved(year, m))
            .collect();

        if municipalities.is_empty() {
            return Err(OnusError::EmptyResultError {
                year,
                state: state.to_string(),
                area: service_area.to_string(),
            });
        }
        Ok(municipalities)
    }

    /// Areas that can be excluded from `main_area`: every other area of the
    /// state (besides the whole-state area) whose municipalities form a strict,
    /// non-empty subset of the main area. First-seen table order.
    pub fn eligible_exclusion_areas(&self, year: u16, state: &str, main_area: &str) -> Vec<String> {
        let main_codes = self.area_codes(state, main_area);
        if main_codes.is_empty() {
            tracing::debug!("Service area '{}' not found in {} ({})", main_area, state, year);
            return Vec::new();
        }

        self.data
            .service_areas_for_state(state)
            .into_iter()
            .filter(|area| area != main_area && area != WHOLE_STATE_AREA)
            .filter(|area| {
                let codes = self.area_codes(state, area);
                !codes.is_empty() && codes.len() < main_codes.len() && codes.is_subset(&main_codes)
            })
            .collect()
    }

    /// Drops every municipality that belongs to any of `exclusion_areas`.
    pub fn apply_area_exclusions(
        &self,
        rows: Vec<ResolvedMunicipality>,
        exclusion_areas: &[String],
        year: u16,
        state: &str,
    ) -> Vec<ResolvedMunicipality> {
        if exclusion_areas.is_empty() {
            return rows;
        }

        let known = self.data.service_areas_for_state(state);
        for area in exclusion_areas.iter().filter(|a| !known.contains(a)) {
            tracing::warn!("Exclusion area '{}' does not exist in {} ({})", area, state, year);
        }

        let excluded: HashSet<&str> = self
            .data
            .memberships()
            .iter()
            .filter(|m| m.state == state && exclusion_areas.contains(&m.service_area))
            .map(|m| m.municipality_code.as_str())
            .collect();

        rows.into_iter()
            .filter(|row| !excluded.contains(row.code.as_str()))
            .collect()
    }

    /// Drops the municipalities named in `exclusion_municipalities`, matching
    /// names against the rows and removing by code.
    pub fn apply_municipality_exclusions(
        &self,
        rows: Vec<ResolvedMunicipality>,
        exclusion_municipalities: &[String],
    ) -> Vec<ResolvedMunicipality> {
        if exclusion_municipalities.is_empty() {
            return rows;
        }

        let excluded: HashSet<String> = rows
            .iter()
            .filter(|row| exclusion_municipalities.contains(&row.name))
            .map(|row| row.code.clone())
            .collect();

        if excluded.len() < exclusion_municipalities.len() {
            tracing::debug!(
                "{} of {} excluded municipalities matched the remaining area",
                excluded.len(),
                exclusion_municipalities.len()
            );
        }

        rows.into_iter()
            .filter(|row| !excluded.contains(&row.code))
            .collect()
    }

    /// Sorted municipality names still covered after removing exclusion areas;
    /// the choices offered when picking municipalities to exclude.
    pub fn municipalities_after_area_exclusions(
        &self,
        year: u16,
        state: &str,
        service_area: &str,
        exclusion_areas: &[String],
    ) -> Result<Vec<String>> {
        let rows = self.resolve_area(year, state, service_area)?;
        let names: BTreeSet<String> = self
            .apply_area_exclusions(rows, exclusion_areas, year, state)
            .into_iter()
            .map(|row| row.name)
            .collect();
        Ok(names.into_iter().collect())
    }

    fn area_codes(&self, state: &str, area: &str) -> HashSet<&'a str> {
        self.data
            .memberships()
            .iter()
            .filter(|m| m.state == state && m.service_area == area)
            .map(|m| m.municipality_code.as_str())
            .collect()
    }
}
