use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed regulatory rate applied to the ROL: 2% of net operating revenue.
pub const ONUS_RATE: f64 = 0.02;

/// Service area that spans the whole state; never offered as an exclusion.
pub const WHOLE_STATE_AREA: &str = "Toda UF";

/// Licensed operators accepted in a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entity {
    #[serde(rename = "ALGAR")]
    Algar,
    #[serde(rename = "BRISANET")]
    Brisanet,
    #[serde(rename = "CLARO")]
    Claro,
    #[serde(rename = "CLOUD2U")]
    Cloud2u,
    #[serde(rename = "COPEL")]
    Copel,
    #[serde(rename = "COZANI")]
    Cozani,
    #[serde(rename = "GARLIAVA")]
    Garliava,
    #[serde(rename = "LIGGA TELECOM")]
    LiggaTelecom,
    #[serde(rename = "LIGUE")]
    Ligue,
    #[serde(rename = "NEXTEL")]
    Nextel,
    #[serde(rename = "OI")]
    Oi,
    #[serde(rename = "OPTIONS")]
    Options,
    #[serde(rename = "SERCOMTEL")]
    Sercomtel,
    #[serde(rename = "TELEFONICA")]
    Telefonica,
    #[serde(rename = "TIM")]
    Tim,
    #[serde(rename = "TPA")]
    Tpa,
    #[serde(rename = "VIVO")]
    Vivo,
    #[serde(rename = "WINITY")]
    Winity,
}

impl Entity {
    pub const ALL: [Entity; 18] = [
        Entity::Algar,
        Entity::Brisanet,
        Entity::Claro,
        Entity::Cloud2u,
        Entity::Copel,
        Entity::Cozani,
        Entity::Garliava,
        Entity::LiggaTelecom,
        Entity::Ligue,
        Entity::Nextel,
        Entity::Oi,
        Entity::Options,
        Entity::Sercomtel,
        Entity::Telefonica,
        Entity::Tim,
        Entity::Tpa,
        Entity::Vivo,
        Entity::Winity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Algar => "ALGAR",
            Entity::Brisanet => "BRISANET",
            Entity::Claro => "CLARO",
            Entity::Cloud2u => "CLOUD2U",
            Entity::Copel => "COPEL",
            Entity::Cozani => "COZANI",
            Entity::Garliava => "GARLIAVA",
            Entity::LiggaTelecom => "LIGGA TELECOM",
            Entity::Ligue => "LIGUE",
            Entity::Nextel => "NEXTEL",
            Entity::Oi => "OI",
            Entity::Options => "OPTIONS",
            Entity::Sercomtel => "SERCOMTEL",
            Entity::Telefonica => "TELEFONICA",
            Entity::Tim => "TIM",
            Entity::Tpa => "TPA",
            Entity::Vivo => "VIVO",
            Entity::Winity => "WINITY",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Entity::ALL
            .iter()
            .copied()
            .find(|entity| entity.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown entity '{}'", wanted))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermType {
    #[serde(rename = "ONUS")]
    Onus,
    #[serde(rename = "DEMAIS")]
    Demais,
}

impl TermType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermType::Onus => "ONUS",
            TermType::Demais => "DEMAIS",
        }
    }
}

impl fmt::Display for TermType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TermType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ONUS" => Ok(TermType::Onus),
            "DEMAIS" => Ok(TermType::Demais),
            other => Err(format!("unknown term type '{}'", other)),
        }
    }
}

/// One row of the municipality / service area membership table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaMembership {
    pub state: String,
    pub service_area: String,
    pub municipality_code: String,
    pub municipality_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationRecord {
    pub base_year: u16,
    pub state: String,
    pub municipality_code: String,
    pub population: u64,
}

/// A municipality of a resolved service area with its population for the
/// requested base year attached. `population` is `None` when the population
/// table has no value for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMunicipality {
    pub code: String,
    pub name: String,
    pub population: Option<u64>,
}

/// A license clause as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub base_year: u16,
    pub entity: Entity,
    pub term_number: String,
    pub term_year: u16,
    pub state: String,
    pub service_area: String,
    pub exclusion_areas: Vec<String>,
    pub exclusion_municipalities: Vec<String>,
    pub freq_initial: f64,
    pub freq_final: f64,
    pub term_type: TermType,
}

impl Term {
    pub fn central_frequency(&self) -> f64 {
        self.freq_final - (self.freq_final - self.freq_initial) / 2.0
    }

    pub fn bandwidth(&self) -> f64 {
        self.freq_final - self.freq_initial
    }

    /// `number/year`, the label users know a term by.
    pub fn label(&self) -> String {
        format!("{}/{}", self.term_number, self.term_year)
    }

    /// Copy with surrounding whitespace removed from the identifying text
    /// fields and blank exclusion items dropped, matching what an import yields.
    pub fn normalized(mut self) -> Self {
        fn trim_list(items: Vec<String>) -> Vec<String> {
            items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        }

        self.term_number = self.term_number.trim().to_string();
        self.state = self.state.trim().to_string();
        self.service_area = self.service_area.trim().to_string();
        self.exclusion_areas = trim_list(self.exclusion_areas);
        self.exclusion_municipalities = trim_list(self.exclusion_municipalities);
        self
    }

    /// Entry gate. A term that fails here never reaches expansion.
    pub fn validate(&self) -> crate::utils::error::Result<()> {
        use crate::utils::error::OnusError;

        if self.term_number.trim().is_empty() {
            return Err(OnusError::validation("Term number cannot be empty"));
        }
        if self.state.trim().is_empty() {
            return Err(OnusError::validation("State cannot be empty"));
        }
        if self.service_area.trim().is_empty() {
            return Err(OnusError::validation("Service area cannot be empty"));
        }
        if !self.freq_initial.is_finite() || !self.freq_final.is_finite() {
            return Err(OnusError::validation("Frequencies must be finite numbers"));
        }
        if self.freq_initial < 0.0 {
            return Err(OnusError::validation(
                "Initial frequency cannot be negative",
            ));
        }
        if self.freq_final <= self.freq_initial {
            return Err(OnusError::validation(
                "Final frequency must be greater than initial frequency",
            ));
        }
        Ok(())
    }
}

/// A term joined with one municipality it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedRow {
    pub base_year: u16,
    pub entity: Entity,
    pub term_number: String,
    pub term_year: u16,
    pub state: String,
    pub service_area: String,
    pub exclusion_areas: String,
    pub exclusion_municipalities: String,
    pub freq_initial: f64,
    pub freq_final: f64,
    pub central_frequency: f64,
    pub bandwidth: f64,
    pub term_type: TermType,
    pub municipality_code: String,
    pub municipality_name: String,
    pub population: Option<u64>,
}

impl ExpandedRow {
    pub fn bandwidth_to_frequency_ratio(&self) -> f64 {
        self.bandwidth / self.central_frequency
    }

    /// Hashable identity covering every column; floats compare by bit pattern.
    pub(crate) fn identity(&self) -> RowIdentity<'_> {
        RowIdentity {
            base_year: self.base_year,
            entity: self.entity,
            term_number: &self.term_number,
            term_year: self.term_year,
            state: &self.state,
            service_area: &self.service_area,
            exclusion_areas: &self.exclusion_areas,
            exclusion_municipalities: &self.exclusion_municipalities,
            frequencies: [
                self.freq_initial.to_bits(),
                self.freq_final.to_bits(),
                self.central_frequency.to_bits(),
                self.bandwidth.to_bits(),
            ],
            term_type: self.term_type,
            municipality_code: &self.municipality_code,
            municipality_name: &self.municipality_name,
            population: self.population,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) struct RowIdentity<'a> {
    base_year: u16,
    entity: Entity,
    term_number: &'a str,
    term_year: u16,
    state: &'a str,
    service_area: &'a str,
    exclusion_areas: &'a str,
    exclusion_municipalities: &'a str,
    frequencies: [u64; 4],
    term_type: TermType,
    municipality_code: &'a str,
    municipality_name: &'a str,
    population: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRow {
    pub municipality_code: String,
    pub municipality_name: String,
    pub frequency_factor: f64,
    pub population_factor: f64,
    pub municipality_onus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnusResult {
    pub total_onus: f64,
    pub factors: Vec<FactorRow>,
    pub population_total: u64,
}

impl OnusResult {
    pub fn empty(population_total: u64) -> Self {
        Self {
            total_onus: 0.0,
            factors: Vec::new(),
            population_total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn average_onus_per_municipality(&self) -> Option<f64> {
        if self.factors.is_empty() {
            None
        } else {
            Some(self.total_onus / self.factors.len() as f64)
        }
    }

    pub fn onus_per_capita(&self) -> Option<f64> {
        if self.population_total == 0 {
            None
        } else {
            Some(self.total_onus / self.population_total as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub total_municipalities: usize,
    pub max_onus: f64,
    pub min_onus: f64,
    pub avg_onus: f64,
    pub total_onus: f64,
}

/// Selection for one apportionment run. Fields left unset are reported by
/// input validation in a fixed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub base_year: Option<u16>,
    pub entity: Option<Entity>,
    pub state: Option<String>,
    pub term_number: Option<String>,
    pub term_year: Option<u16>,
    pub rol: f64,
}

impl CalculationRequest {
    pub fn label(&self) -> String {
        format!(
            "{}/{}",
            self.term_number.as_deref().unwrap_or("?"),
            self.term_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "?".to_string())
        )
    }
}

/// A term turned away at the boundary, with its position in the input.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedTerm {
    pub index: usize,
    pub term: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalculationOutcome {
    Computed {
        request: CalculationRequest,
        result: OnusResult,
        summary: Option<SummaryStatistics>,
    },
    Invalid {
        request: CalculationRequest,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub expanded_rows: Vec<ExpandedRow>,
    pub rejected_terms: Vec<RejectedTerm>,
    pub outcomes: Vec<CalculationOutcome>,
}
