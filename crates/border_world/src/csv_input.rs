//! F280/AQIM CSV ingestion (spec §6) via the `csv` crate (already part of the
//! teacher's dependency stack). `strict_input` controls whether a malformed
//! row aborts the whole read (spec §7: data error, fatal for that row) or is
//! skipped with a diagnostic and the read continues.

use std::path::Path;

use border_core::{Consignment, ConfigError, Diagnostic, DiagnosticKind};
use chrono::NaiveDate;

use crate::generator::{from_aqim_record, from_f280_record, AqimRecord, AqimUnit, F280Record};

/// Result of reading an input CSV: successfully translated consignments plus
/// diagnostics for any row that was skipped rather than aborting the read.
#[derive(Debug, Default)]
pub struct CsvLoadOutcome {
    pub consignments: Vec<Consignment>,
    pub diagnostics: Vec<Diagnostic>,
}

fn header_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

fn field<'a>(record: &'a csv::StringRecord, index: Option<usize>) -> Option<&'a str> {
    index.and_then(|i| record.get(i))
}

fn row_error(row_number: usize, message: impl Into<String>) -> ConfigError {
    ConfigError::data(format!("csv/row_{row_number}"), message.into())
}

fn skipped_row(row_number: usize, message: String) -> Diagnostic {
    Diagnostic::new(DiagnosticKind::RowRejected, format!("row {row_number} skipped: {message}"))
}

/// Reads an F280-format CSV: `QUANTITY, PATHWAY, REPORT_DT, COMMODITY,
/// ORIGIN_NM, LOCATION`, with case-insensitive `PATHWAY` column matching.
pub fn read_f280_csv(path: &Path, items_per_box: u32, strict_input: bool) -> Result<CsvLoadOutcome, ConfigError> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|e| ConfigError::data(path.display().to_string(), e.to_string()))?;
    let headers = reader.headers().map_err(|e| ConfigError::data(path.display().to_string(), e.to_string()))?.clone();

    let quantity_idx = header_index(&headers, "QUANTITY");
    let pathway_idx = header_index(&headers, "PATHWAY");
    let date_idx = header_index(&headers, "REPORT_DT");
    let commodity_idx = header_index(&headers, "COMMODITY");
    let origin_idx = header_index(&headers, "ORIGIN_NM");
    let location_idx = header_index(&headers, "LOCATION");

    let mut outcome = CsvLoadOutcome::default();
    for (row_number, result) in reader.records().enumerate() {
        let raw = result.map_err(|e| row_error(row_number, e.to_string()))?;
        let parsed = (|| -> Result<F280Record, String> {
            let quantity: u32 = field(&raw, quantity_idx)
                .ok_or("missing QUANTITY")?
                .parse()
                .map_err(|_| "QUANTITY is not an integer".to_string())?;
            let pathway = field(&raw, pathway_idx).ok_or("missing PATHWAY")?.to_string();
            let report_date = NaiveDate::parse_from_str(field(&raw, date_idx).ok_or("missing REPORT_DT")?, "%Y-%m-%d")
                .map_err(|_| "REPORT_DT is not a valid ISO-8601 date".to_string())?;
            let commodity = field(&raw, commodity_idx).ok_or("missing COMMODITY")?.to_string();
            let origin = field(&raw, origin_idx).ok_or("missing ORIGIN_NM")?.to_string();
            let location = field(&raw, location_idx).ok_or("missing LOCATION")?.to_string();
            Ok(F280Record { quantity, pathway, report_date, commodity, origin, location })
        })();

        match parsed {
            Ok(record) => outcome.consignments.push(from_f280_record(&record, items_per_box)),
            Err(message) if strict_input => return Err(row_error(row_number, message)),
            Err(message) => outcome.diagnostics.push(skipped_row(row_number, message)),
        }
    }
    Ok(outcome)
}

fn parse_aqim_unit(raw: &str) -> Result<AqimUnit, String> {
    match raw.to_ascii_lowercase().as_str() {
        "items" => Ok(AqimUnit::Items),
        "boxes" => Ok(AqimUnit::Boxes),
        other => Err(format!("UNIT must be 'items' or 'boxes', got '{other}'")),
    }
}

/// Reads an AQIM-format CSV: `UNIT, QUANTITY, CARGO_FORM, CALENDAR_YR,
/// COMMODITY_LIST, ORIGIN, LOCATION`.
pub fn read_aqim_csv(path: &Path, items_per_box: u32, strict_input: bool) -> Result<CsvLoadOutcome, ConfigError> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|e| ConfigError::data(path.display().to_string(), e.to_string()))?;
    let headers = reader.headers().map_err(|e| ConfigError::data(path.display().to_string(), e.to_string()))?.clone();

    let unit_idx = header_index(&headers, "UNIT");
    let quantity_idx = header_index(&headers, "QUANTITY");
    let cargo_form_idx = header_index(&headers, "CARGO_FORM");
    let year_idx = header_index(&headers, "CALENDAR_YR");
    let commodity_list_idx = header_index(&headers, "COMMODITY_LIST");
    let origin_idx = header_index(&headers, "ORIGIN");
    let location_idx = header_index(&headers, "LOCATION");

    let mut outcome = CsvLoadOutcome::default();
    for (row_number, result) in reader.records().enumerate() {
        let raw = result.map_err(|e| row_error(row_number, e.to_string()))?;
        let parsed = (|| -> Result<AqimRecord, String> {
            let unit = parse_aqim_unit(field(&raw, unit_idx).ok_or("missing UNIT")?)?;
            let quantity: u32 = field(&raw, quantity_idx)
                .ok_or("missing QUANTITY")?
                .parse()
                .map_err(|_| "QUANTITY is not an integer".to_string())?;
            let cargo_form = field(&raw, cargo_form_idx).ok_or("missing CARGO_FORM")?.to_string();
            let calendar_year: i32 = field(&raw, year_idx)
                .ok_or("missing CALENDAR_YR")?
                .parse()
                .map_err(|_| "CALENDAR_YR is not a 4-digit year".to_string())?;
            let commodities: Vec<String> = field(&raw, commodity_list_idx)
                .ok_or("missing COMMODITY_LIST")?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if commodities.is_empty() {
                return Err("COMMODITY_LIST has no entries".to_string());
            }
            let origin = field(&raw, origin_idx).ok_or("missing ORIGIN")?.to_string();
            let location = field(&raw, location_idx).ok_or("missing LOCATION")?.to_string();
            Ok(AqimRecord { unit, quantity, cargo_form, calendar_year, commodities, origin, location })
        })();

        match parsed {
            Ok(record) => outcome.consignments.push(from_aqim_record(&record, items_per_box)),
            Err(message) if strict_input => return Err(row_error(row_number, message)),
            Err(message) => outcome.diagnostics.push(skipped_row(row_number, message)),
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_f280_csv_with_case_insensitive_pathway_header() {
        let file = write_csv(
            "QUANTITY,Pathway,REPORT_DT,COMMODITY,ORIGIN_NM,LOCATION\n\
             50,Maritime,2024-03-01,apples,mexico,laredo\n",
        );
        let outcome = read_f280_csv(file.path(), 10, true).unwrap();
        assert_eq!(outcome.consignments.len(), 1);
        assert_eq!(outcome.consignments[0].boxes, 5);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn malformed_row_aborts_when_strict() {
        let file = write_csv(
            "QUANTITY,PATHWAY,REPORT_DT,COMMODITY,ORIGIN_NM,LOCATION\n\
             not_a_number,Maritime,2024-03-01,apples,mexico,laredo\n",
        );
        assert!(read_f280_csv(file.path(), 10, true).is_err());
    }

    #[test]
    fn malformed_row_is_skipped_when_not_strict() {
        let file = write_csv(
            "QUANTITY,PATHWAY,REPORT_DT,COMMODITY,ORIGIN_NM,LOCATION\n\
             not_a_number,Maritime,2024-03-01,apples,mexico,laredo\n\
             50,Maritime,2024-03-01,pears,peru,miami\n",
        );
        let outcome = read_f280_csv(file.path(), 10, false).unwrap();
        assert_eq!(outcome.consignments.len(), 1);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::RowRejected);
    }

    #[test]
    fn reads_aqim_csv_with_items_unit() {
        let file = write_csv(
            "UNIT,QUANTITY,CARGO_FORM,CALENDAR_YR,COMMODITY_LIST,ORIGIN,LOCATION\n\
             items,95,palletized,2023,citrus,peru,long_beach\n",
        );
        let outcome = read_aqim_csv(file.path(), 20, true).unwrap();
        assert_eq!(outcome.consignments.len(), 1);
        assert_eq!(outcome.consignments[0].boxes, 5); // ceil(95/20)
        assert_eq!(outcome.consignments[0].commodity, "citrus");
    }

    #[test]
    fn aqim_invalid_unit_is_a_data_error() {
        let file = write_csv(
            "UNIT,QUANTITY,CARGO_FORM,CALENDAR_YR,COMMODITY_LIST,ORIGIN,LOCATION\n\
             pallets,95,palletized,2023,citrus,peru,long_beach\n",
        );
        assert!(read_aqim_csv(file.path(), 20, true).is_err());
    }
}
