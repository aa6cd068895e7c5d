//! CSV renderings of the derived tables.

use crate::core::terms_csv::TERM_COLUMNS;
use crate::domain::model::{ExpandedRow, FactorRow};
use crate::utils::error::Result;

pub const FACTOR_COLUMNS: [&str; 5] = ["codMun", "Municipio", "fatorFreq", "fatorPop", "onusMunicipio"];

pub fn expanded_rows_to_csv(rows: &[ExpandedRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = TERM_COLUMNS.to_vec();
    header.extend(["codMun", "Municipio", "popMun"]);
    writer.write_record(&header)?;

    for row in rows {
        writer.write_record([
            row.base_year.to_string(),
            row.entity.to_string(),
            row.term_number.clone(),
            row.term_year.to_string(),
            row.state.clone(),
            row.service_area.clone(),
            row.exclusion_areas.clone(),
            row.exclusion_municipalities.clone(),
            row.freq_initial.to_string(),
            row.freq_final.to_string(),
            row.central_frequency.to_string(),
            row.bandwidth.to_string(),
            row.term_type.to_string(),
            row.municipality_code.clone(),
            row.municipality_name.clone(),
            row.population.map(|p| p.to_string()).unwrap_or_default(),
        ])?;
    }

    into_string(writer)
}

/// Factor table with the display precision used on screen: 4 decimals for the
/// frequency factor, 6 for the population factor, cents for the fee.
pub fn factors_to_csv(factors: &[FactorRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(FACTOR_COLUMNS)?;
    for factor in factors {
        writer.write_record([
            factor.municipality_code.clone(),
            factor.municipality_name.clone(),
            format!("{:.4}", factor.frequency_factor),
            format!("{:.6}", factor.population_factor),
            format!("{:.2}", factor.municipality_onus),
        ])?;
    }
    into_string(writer)
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_csv_precision() {
        let csv = factors_to_csv(&[FactorRow {
            municipality_code: "4106902".to_string(),
            municipality_name: "Curitiba".to_string(),
            frequency_factor: 2.0 / 3.0,
            population_factor: 1.0 / 3.0,
            municipality_onus: 6666.666666,
        }])
        .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "codMun,Municipio,fatorFreq,fatorPop,onusMunicipio");
        assert_eq!(lines[1], "4106902,Curitiba,0.6667,0.333333,6666.67");
    }

    #[test]
    fn test_expanded_csv_has_municipality_columns() {
        let csv = expanded_rows_to_csv(&[]).unwrap();
        assert!(csv.trim_end().ends_with("Tipo,codMun,Municipio,popMun"));
    }
}
