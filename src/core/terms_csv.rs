//! Term import/export in the 13-column tabular layout.

use crate::core::tabular::{locate_columns, parse_decimal, parse_year, Row};
use crate::domain::exclusion_list;
use crate::domain::model::{Entity, Term, TermType};
use crate::utils::error::Result;
use std::io::{Read, Write};

pub const TERMS_TABLE: &str = "terms file";

pub const TERM_COLUMNS: [&str; 13] = [
    "AnoBase",
    "Entidade",
    "NumTermo",
    "AnoTermo",
    "UF",
    "AreaPrestacao",
    "AreaExclusao",
    "MunicipioExclusao",
    "FrequenciaInicial",
    "FrequenciaFinal",
    "FrequenciaCentral",
    "Banda",
    "Tipo",
];

const DERIVED_TOLERANCE: f64 = 1e-6;

/// Reads terms; every numeric field is parsed explicitly and a malformed row
/// fails the import with its row number.
pub fn read_terms<R: Read>(source: R) -> Result<Vec<Term>> {
    let mut reader = csv::Reader::from_reader(source);
    let headers = reader.headers()?.clone();
    let c = locate_columns(TERMS_TABLE, &headers, &TERM_COLUMNS)?;

    let mut terms = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let row = Row {
            table: TERMS_TABLE,
            number: index + 2,
            record: &record,
        };

        let entity_text = row.text(c[1]);
        let entity: Entity = entity_text
            .parse()
            .map_err(|reason: String| row.error("Entidade", entity_text, reason))?;
        let type_text = row.text(c[12]);
        let term_type: TermType = type_text
            .parse()
            .map_err(|reason: String| row.error("Tipo", type_text, reason))?;

        let term = Term {
            base_year: parse_year(&row, c[0], "AnoBase")?,
            entity,
            term_number: row.text(c[2]).to_string(),
            term_year: parse_year(&row, c[3], "AnoTermo")?,
            state: row.text(c[4]).to_string(),
            service_area: row.text(c[5]).to_string(),
            exclusion_areas: exclusion_list::split(row.text(c[6])),
            exclusion_municipalities: exclusion_list::split(row.text(c[7])),
            freq_initial: parse_decimal(&row, c[8], "FrequenciaInicial")?,
            freq_final: parse_decimal(&row, c[9], "FrequenciaFinal")?,
            term_type,
        };

        let central = parse_decimal(&row, c[10], "FrequenciaCentral")?;
        if (central - term.central_frequency()).abs() > DERIVED_TOLERANCE {
            return Err(row.error(
                "FrequenciaCentral",
                row.text(c[10]),
                format!("expected {} from the initial and final frequencies", term.central_frequency()),
            ));
        }
        let bandwidth = parse_decimal(&row, c[11], "Banda")?;
        if (bandwidth - term.bandwidth()).abs() > DERIVED_TOLERANCE {
            return Err(row.error(
                "Banda",
                row.text(c[11]),
                format!("expected {} from the initial and final frequencies", term.bandwidth()),
            ));
        }

        terms.push(term);
    }

    tracing::debug!("Read {} terms", terms.len());
    Ok(terms)
}

pub fn write_terms<W: Write>(sink: W, terms: &[Term]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(TERM_COLUMNS)?;
    for term in terms {
        writer.write_record([
            term.base_year.to_string(),
            term.entity.to_string(),
            term.term_number.clone(),
            term.term_year.to_string(),
            term.state.clone(),
            term.service_area.clone(),
            exclusion_list::join(&term.exclusion_areas),
            exclusion_list::join(&term.exclusion_municipalities),
            term.freq_initial.to_string(),
            term.freq_final.to_string(),
            term.central_frequency().to_string(),
            term.bandwidth().to_string(),
            term.term_type.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn terms_to_csv(terms: &[Term]) -> Result<String> {
    let mut buffer = Vec::new();
    write_terms(&mut buffer, terms)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::OnusError;

    const HEADER: &str = "AnoBase,Entidade,NumTermo,AnoTermo,UF,AreaPrestacao,AreaExclusao,MunicipioExclusao,FrequenciaInicial,FrequenciaFinal,FrequenciaCentral,Banda,Tipo";

    #[test]
    fn test_read_terms_parses_lists_and_enums() {
        let csv = format!(
            "{HEADER}\n2020,VIVO,001/2012,2012,PR,Toda UF,Norte; Capital,Foz do Iguaçu,3400,3420,3410,20,ONUS\n"
        );
        let terms = read_terms(csv.as_bytes()).unwrap();
        assert_eq!(terms.len(), 1);
        let t = &terms[0];
        assert_eq!(t.entity, Entity::Vivo);
        assert_eq!(t.term_number, "001/2012");
        assert_eq!(t.exclusion_areas, vec!["Norte", "Capital"]);
        assert_eq!(t.exclusion_municipalities, vec!["Foz do Iguaçu"]);
        assert_eq!(t.term_type, TermType::Onus);
    }

    #[test]
    fn test_columns_may_come_in_any_order() {
        let csv = "Tipo,Banda,FrequenciaCentral,FrequenciaFinal,FrequenciaInicial,MunicipioExclusao,AreaExclusao,AreaPrestacao,UF,AnoTermo,NumTermo,Entidade,AnoBase,Obs\n\
DEMAIS,10,2505,2510,2500,,,Toda UF,SC,2015,77,LIGGA TELECOM,2021,ignored\n";
        let terms = read_terms(csv.as_bytes()).unwrap();
        assert_eq!(terms[0].entity, Entity::LiggaTelecom);
        assert!(terms[0].exclusion_areas.is_empty());
        assert_eq!(terms[0].base_year, 2021);
    }

    #[test]
    fn test_missing_columns_are_listed() {
        let err = read_terms("AnoBase,Entidade\n2020,VIVO\n".as_bytes()).unwrap_err();
        match err {
            OnusError::SchemaError { missing, .. } => {
                assert_eq!(missing.len(), 11);
                assert_eq!(missing[0], "NumTermo");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_inconsistent_derived_columns_fail() {
        let csv = format!("{HEADER}\n2020,VIVO,1,2012,PR,Toda UF,,,3400,3420,3410,25,ONUS\n");
        let err = read_terms(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, OnusError::ParseError { ref column, row: 2, .. } if column == "Banda"));
    }

    #[test]
    fn test_unknown_entity_fails() {
        let csv = format!("{HEADER}\n2020,ACME,1,2012,PR,Toda UF,,,3400,3420,3410,20,ONUS\n");
        assert!(matches!(
            read_terms(csv.as_bytes()).unwrap_err(),
            OnusError::ParseError { .. }
        ));
    }

    #[test]
    fn test_export_then_import_keeps_exclusions() {
        let term = Term {
            base_year: 2020,
            entity: Entity::Tim,
            term_number: "12".to_string(),
            term_year: 2010,
            state: "RS".to_string(),
            service_area: "Toda UF".to_string(),
            exclusion_areas: vec!["Serra, Norte".to_string(), "Litoral".to_string()],
            exclusion_municipalities: vec!["Pelotas".to_string()],
            freq_initial: 1932.5,
            freq_final: 1947.5,
            term_type: TermType::Demais,
        };
        let csv = terms_to_csv(std::slice::from_ref(&term)).unwrap();
        assert!(csv.contains("Serra, Norte; Litoral"));
        assert_eq!(read_terms(csv.as_bytes()).unwrap(), vec![term]);
    }
}
