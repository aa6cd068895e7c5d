use crate::core::ConfigProvider;
use crate::domain::model::{CalculationRequest, Entity};
use crate::utils::error::{OnusError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_output_formats, validate_path,
    validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub run: RunConfig,
    pub reference: ReferenceConfig,
    pub terms: TermsConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "calculation")]
    pub calculations: Vec<CalculationConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    pub area_file: String,
    pub population_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermsConfig {
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}

/// One `[[calculation]]` entry. Selections may be left out; they are
/// reported per calculation instead of failing the whole file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationConfig {
    pub base_year: Option<u16>,
    pub entity: Option<Entity>,
    pub state: Option<String>,
    pub term_number: Option<String>,
    pub term_year: Option<u16>,
    #[serde(default)]
    pub rol: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

impl From<&CalculationConfig> for CalculationRequest {
    fn from(c: &CalculationConfig) -> Self {
        CalculationRequest {
            base_year: c.base_year,
            entity: c.entity,
            state: c.state.clone(),
            term_number: c.term_number.clone(),
            term_year: c.term_year,
            rol: c.rol,
        }
    }
}

impl TomlConfig {
    /// Loads a configuration file, substituting `${VAR}` references first.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OnusError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| OnusError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| OnusError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("run.name", &self.run.name)?;
        validate_path("reference.area_file", &self.reference.area_file)?;
        validate_path("reference.population_file", &self.reference.population_file)?;
        validate_path("terms.file", &self.terms.file)?;
        validate_path("output.path", &self.output.path)?;
        validate_file_extensions(
            "input files",
            &[
                &self.reference.area_file,
                &self.reference.population_file,
                &self.terms.file,
            ],
            &["csv"],
        )?;
        validate_output_formats("output.formats", &self.output.formats)?;

        if let Some(compression) = self.output.compression.as_ref().filter(|c| c.enabled) {
            validate_file_extensions("output.compression.filename", &[&compression.filename], &["zip"])?;
        }

        if self.calculations.is_empty() {
            return Err(OnusError::MissingConfigError {
                field: "calculation".to_string(),
            });
        }
        for (index, calculation) in self.calculations.iter().enumerate() {
            if let Some(year) = calculation.base_year {
                validate_range(&format!("calculation[{}].base_year", index), year, 1900, 2100)?;
            }
            if let Some(year) = calculation.term_year {
                validate_range(&format!("calculation[{}].term_year", index), year, 1900, 2100)?;
            }
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn area_file(&self) -> &str {
        &self.reference.area_file
    }

    fn population_file(&self) -> &str {
        &self.reference.population_file
    }

    fn terms_file(&self) -> &str {
        &self.terms.file
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn archive_name(&self) -> Option<&str> {
        self.output
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.as_str())
    }

    fn calculations(&self) -> Vec<CalculationRequest> {
        self.calculations.iter().map(CalculationRequest::from).collect()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[run]
name = "pr-2020"

[reference]
area_file = "data/df_Mun_UF_Area.csv"
population_file = "data/pop_2014_2024.csv"

[terms]
file = "termos.csv"

[output]
path = "./output"
formats = ["csv", "json"]

[output.compression]
enabled = true
filename = "onus.zip"

[[calculation]]
base_year = 2020
entity = "VIVO"
state = "PR"
term_number = "001"
term_year = 2012
rol = 1000000.0

[[calculation]]
base_year = 2020
entity = "LIGGA TELECOM"
state = "PR"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.run.name, "pr-2020");
        assert_eq!(config.archive_name(), Some("onus.zip"));
        assert!(config.validate().is_ok());

        let requests = config.calculations();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].entity, Some(Entity::Vivo));
        assert_eq!(requests[1].entity, Some(Entity::LiggaTelecom));
        assert_eq!(requests[1].term_number, None);
        assert_eq!(requests[1].rol, 0.0);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("ONUS_TEST_TERMS_FILE", "termos_2020.csv");

        let content = BASIC.replace("\"termos.csv\"", "\"${ONUS_TEST_TERMS_FILE}\"");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.terms.file, "termos_2020.csv");

        std::env::remove_var("ONUS_TEST_TERMS_FILE");
    }

    #[test]
    fn test_config_validation() {
        let content = BASIC.replace("termos.csv", "termos.xlsx");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());

        let mut config = TomlConfig::from_toml_str(BASIC).unwrap();
        config.calculations.clear();
        assert!(matches!(
            config.validate().unwrap_err(),
            OnusError::MissingConfigError { .. }
        ));
    }

    #[test]
    fn test_unknown_entity_is_a_config_error() {
        let content = BASIC.replace("\"VIVO\"", "\"ACME\"");
        assert!(matches!(
            TomlConfig::from_toml_str(&content).unwrap_err(),
            OnusError::ConfigError { .. }
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.run.name, "pr-2020");
    }
}
