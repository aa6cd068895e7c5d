//! Static reference tables: municipality membership per service area and
//! municipality population per base year. Loaded once, read-only afterwards.

use crate::core::tabular::{locate_columns, parse_whole_number, parse_year, Row};
use crate::domain::model::{AreaMembership, PopulationRecord, ResolvedMunicipality};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Read;
use std::path::Path;

pub const AREA_TABLE: &str = "area membership table";
pub const POPULATION_TABLE: &str = "population table";

const AREA_COLUMNS: [&str; 4] = ["UF", "AreaPrestacao", "codMun", "Municipio"];
const POPULATION_COLUMNS: [&str; 4] = ["AnoBase", "UF", "codMun", "popMun"];

type PopulationKey = (u16, String, String);

#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    memberships: Vec<AreaMembership>,
    population: HashMap<PopulationKey, u64>,
    years: BTreeSet<u16>,
    states_by_year: HashMap<u16, BTreeSet<String>>,
}

impl ReferenceData {
    /// Builds the store from already parsed rows. Membership rows repeating a
    /// (state, area, code) tuple are dropped; the first population value of a
    /// (year, state, code) key wins.
    pub fn new(memberships: Vec<AreaMembership>, population: Vec<PopulationRecord>) -> Self {
        let mut seen = HashSet::new();
        let memberships: Vec<AreaMembership> = memberships
            .into_iter()
            .filter(|m| {
                seen.insert((
                    m.state.clone(),
                    m.service_area.clone(),
                    m.municipality_code.clone(),
                ))
            })
            .collect();

        let mut data = Self {
            memberships,
            ..Self::default()
        };

        for record in population {
            data.years.insert(record.base_year);
            data.states_by_year
                .entry(record.base_year)
                .or_default()
                .insert(record.state.clone());

            let key = (record.base_year, record.state, record.municipality_code);
            if data.population.contains_key(&key) {
                tracing::warn!(
                    "Duplicate population for {} {} in {}, keeping the first value",
                    key.2,
                    key.1,
                    key.0
                );
                continue;
            }
            data.population.insert(key, record.population);
        }

        tracing::debug!(
            "Reference data ready: {} memberships, {} population records, years {:?}",
            data.memberships.len(),
            data.population.len(),
            data.years
        );
        data
    }

    pub fn from_readers<A: Read, P: Read>(area: A, population: P) -> Result<Self> {
        let memberships = read_memberships(area)?;
        let population = read_population(population)?;
        Ok(Self::new(memberships, population))
    }

    pub fn from_paths<A: AsRef<Path>, P: AsRef<Path>>(area: A, population: P) -> Result<Self> {
        let area = std::fs::File::open(area)?;
        let population = std::fs::File::open(population)?;
        Self::from_readers(area, population)
    }

    /// Loads both tables through a storage backend.
    pub async fn load<S: Storage>(storage: &S, area_path: &str, population_path: &str) -> Result<Self> {
        tracing::info!("📥 Loading reference tables: {} and {}", area_path, population_path);
        let area = storage.read_file(area_path).await?;
        let population = storage.read_file(population_path).await?;
        Self::from_readers(area.as_slice(), population.as_slice())
    }

    pub fn memberships(&self) -> &[AreaMembership] {
        &self.memberships
    }

    /// Sorted distinct base years of the population table.
    pub fn year_range(&self) -> Vec<u16> {
        self.years.iter().copied().collect()
    }

    /// Sorted states with population data for `year`.
    pub fn states_for_year(&self, year: u16) -> Vec<String> {
        self.states_by_year
            .get(&year)
            .map(|states| states.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Service areas of a state in first-seen table order.
    pub fn service_areas_for_state(&self, state: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.memberships
            .iter()
            .filter(|m| m.state == state)
            .filter(|m| seen.insert(m.service_area.as_str()))
            .map(|m| m.service_area.clone())
            .collect()
    }

    pub fn population(&self, year: u16, state: &str, code: &str) -> Option<u64> {
        self.population
            .get(&(year, state.to_string(), code.to_string()))
            .copied()
    }

    /// Membership rows of `state`, each with its population for `year`
    /// (left join: the population is `None` when the table lacks it).
    pub fn area_population(
        &self,
        year: u16,
        state: &str,
    ) -> impl Iterator<Item = (&AreaMembership, Option<u64>)> + '_ {
        let state = state.to_string();
        self.memberships
            .iter()
            .filter(move |m| m.state == state)
            .map(move |m| (m, self.population(year, &m.state, &m.municipality_code)))
    }

    pub(crate) fn resolved(&self, year: u16, membership: &AreaMembership) -> ResolvedMunicipality {
        ResolvedMunicipality {
            code: membership.municipality_code.clone(),
            name: membership.municipality_name.clone(),
            population: self.population(year, &membership.state, &membership.municipality_code),
        }
    }
}

fn read_memberships<R: Read>(source: R) -> Result<Vec<AreaMembership>> {
    let mut reader = csv::Reader::from_reader(source);
    let headers = reader.headers()?.clone();
    let columns = locate_columns(AREA_TABLE, &headers, &AREA_COLUMNS)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = Row {
            table: AREA_TABLE,
            number: index + 2,
            record: &record,
        };
        let municipality_code = row.text(columns[2]);
        if municipality_code.is_empty() {
            return Err(row.error("codMun", municipality_code, "municipality code is empty"));
        }
        rows.push(AreaMembership {
            state: row.text(columns[0]).to_string(),
            service_area: row.text(columns[1]).to_string(),
            municipality_code: municipality_code.to_string(),
            municipality_name: row.text(columns[3]).to_string(),
        });
    }
    Ok(rows)
}

fn read_population<R: Read>(source: R) -> Result<Vec<PopulationRecord>> {
    let mut reader = csv::Reader::from_reader(source);
    let headers = reader.headers()?.clone();
    let columns = locate_columns(POPULATION_TABLE, &headers, &POPULATION_COLUMNS)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = Row {
            table: POPULATION_TABLE,
            number: index + 2,
            record: &record,
        };
        rows.push(PopulationRecord {
            base_year: parse_year(&row, columns[0], "AnoBase")?,
            state: row.text(columns[1]).to_string(),
            municipality_code: row.text(columns[2]).to_string(),
            population: parse_whole_number(&row, columns[3], "popMun")?,
        });
    }
    Ok(rows)
}
