use crate::utils::error::{OnusError, Result};

/// Header positions of the required columns, in the order requested.
/// Fails with a schema error that lists every missing column at once.
pub(crate) fn locate_columns(
    table: &str,
    headers: &csv::StringRecord,
    required: &[&str],
) -> Result<Vec<usize>> {
    let mut positions = Vec::with_capacity(required.len());
    let mut missing = Vec::new();

    for column in required {
        match headers.iter().position(|h| h.trim() == *column) {
            Some(index) => positions.push(index),
            None => missing.push(column.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(positions)
    } else {
        Err(OnusError::SchemaError {
            table: table.to_string(),
            missing,
        })
    }
}

/// Cursor over one CSV record that knows its table name and row number so
/// parse failures carry enough context to be fixed by hand.
pub(crate) struct Row<'a> {
    pub table: &'a str,
    pub number: usize,
    pub record: &'a csv::StringRecord,
}

impl<'a> Row<'a> {
    pub fn text(&self, index: usize) -> &'a str {
        self.record.get(index).unwrap_or("").trim()
    }

    pub fn error(&self, column: &str, value: &str, reason: impl Into<String>) -> OnusError {
        OnusError::ParseError {
            table: self.table.to_string(),
            row: self.number,
            column: column.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parses a number that pandas may have written as `123` or `123.0`.
pub(crate) fn parse_whole_number(row: &Row<'_>, index: usize, column: &str) -> Result<u64> {
    let raw = row.text(index);
    if let Ok(value) = raw.parse::<u64>() {
        return Ok(value);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 => Ok(value as u64),
        _ => Err(row.error(column, raw, "expected a non-negative whole number")),
    }
}

pub(crate) fn parse_year(row: &Row<'_>, index: usize, column: &str) -> Result<u16> {
    let value = parse_whole_number(row, index, column)?;
    u16::try_from(value).map_err(|_| row.error(column, row.text(index), "year out of range"))
}

pub(crate) fn parse_decimal(row: &Row<'_>, index: usize, column: &str) -> Result<f64> {
    let raw = row.text(index);
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(row.error(column, raw, "expected a finite number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_columns_reports_all_missing() {
        let headers = csv::StringRecord::from(vec!["UF", "codMun"]);
        let err = locate_columns("area", &headers, &["UF", "AreaPrestacao", "codMun", "Municipio"])
            .unwrap_err();
        match err {
            OnusError::SchemaError { table, missing } => {
                assert_eq!(table, "area");
                assert_eq!(missing, vec!["AreaPrestacao", "Municipio"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_locate_columns_is_order_insensitive() {
        let headers = csv::StringRecord::from(vec!["codMun", "extra", "UF"]);
        let positions = locate_columns("area", &headers, &["UF", "codMun"]).unwrap();
        assert_eq!(positions, vec![2, 0]);
    }

    #[test]
    fn test_whole_number_accepts_pandas_float_text() {
        let record = csv::StringRecord::from(vec!["1500.0", "12a"]);
        let row = Row {
            table: "population",
            number: 2,
            record: &record,
        };
        assert_eq!(parse_whole_number(&row, 0, "popMun").unwrap(), 1500);
        let err = parse_whole_number(&row, 1, "popMun").unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_decimal_rejects_text_and_non_finite_values() {
        let record = csv::StringRecord::from(vec![" 3410.5 ", "inf", "abc"]);
        let row = Row {
            table: "terms file",
            number: 4,
            record: &record,
        };
        assert_eq!(parse_decimal(&row, 0, "FrequenciaCentral").unwrap(), 3410.5);
        assert!(matches!(
            parse_decimal(&row, 1, "FrequenciaCentral").unwrap_err(),
            OnusError::ParseError { row: 4, .. }
        ));
        assert!(parse_decimal(&row, 2, "FrequenciaCentral").is_err());
    }
}
