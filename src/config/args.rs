use crate::core::ConfigProvider;
use crate::domain::model::{CalculationRequest, Entity};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_file_extensions, validate_output_formats, validate_path, validate_range, Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "onus")]
#[command(about = "Apportions the spectrum license ônus of a term across its municipalities")]
pub struct CliConfig {
    #[arg(long, default_value = "data/df_Mun_UF_Area.csv")]
    pub area_file: String,

    #[arg(long, default_value = "data/pop_2014_2024.csv")]
    pub population_file: String,

    #[arg(long, default_value = "termos.csv")]
    pub terms_file: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_delimiter = ',', default_value = "csv,json")]
    pub formats: Vec<String>,

    #[arg(long, help = "Bundle every output into this ZIP file")]
    pub archive: Option<String>,

    #[arg(long, help = "Population base year")]
    pub base_year: Option<u16>,

    #[arg(long, help = "Operator, e.g. VIVO or \"LIGGA TELECOM\"")]
    pub entity: Option<Entity>,

    #[arg(long, help = "State code (UF)")]
    pub state: Option<String>,

    #[arg(long)]
    pub term_number: Option<String>,

    #[arg(long)]
    pub term_year: Option<u16>,

    #[arg(long, default_value = "0", help = "Net operating revenue (ROL) of the state")]
    pub rol: f64,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log memory usage and timing per phase")]
    pub monitor: bool,
}

impl ConfigProvider for CliConfig {
    fn area_file(&self) -> &str {
        &self.area_file
    }

    fn population_file(&self) -> &str {
        &self.population_file
    }

    fn terms_file(&self) -> &str {
        &self.terms_file
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.formats
    }

    fn archive_name(&self) -> Option<&str> {
        self.archive.as_deref()
    }

    fn calculations(&self) -> Vec<CalculationRequest> {
        vec![CalculationRequest {
            base_year: self.base_year,
            entity: self.entity,
            state: self.state.clone(),
            term_number: self.term_number.clone(),
            term_year: self.term_year,
            rol: self.rol,
        }]
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("area_file", &self.area_file)?;
        validate_path("population_file", &self.population_file)?;
        validate_path("terms_file", &self.terms_file)?;
        validate_path("output_path", &self.output_path)?;
        validate_file_extensions(
            "input files",
            &[&self.area_file, &self.population_file, &self.terms_file],
            &["csv"],
        )?;
        validate_output_formats("formats", &self.formats)?;
        if let Some(archive) = &self.archive {
            validate_file_extensions("archive", &[archive.as_str()], &["zip"])?;
        }
        if let Some(year) = self.base_year {
            validate_range("base_year", year, 1900, 2100)?;
        }
        if let Some(year) = self.term_year {
            validate_range("term_year", year, 1900, 2100)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_build_one_request() {
        let config = CliConfig::parse_from([
            "onus",
            "--base-year",
            "2020",
            "--entity",
            "LIGGA TELECOM",
            "--state",
            "PR",
            "--term-number",
            "001",
            "--term-year",
            "2012",
            "--rol",
            "1000000",
        ]);
        assert!(config.validate().is_ok());
        let requests = config.calculations();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].entity, Some(Entity::LiggaTelecom));
        assert_eq!(requests[0].rol, 1_000_000.0);
        assert_eq!(config.output_formats(), ["csv", "json"]);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let config = CliConfig::parse_from(["onus", "--formats", "csv,xml"]);
        assert!(config.validate().is_err());
    }
}
