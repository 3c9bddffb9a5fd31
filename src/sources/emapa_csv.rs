//! Reference addresses exported as CSV by the e-mapa local map systems.

use csv::ReaderBuilder;
use regex::Regex;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

use super::{open_reader, ParsedBatch};
use crate::error::{Result, SkipReason};
use crate::models::{Address, Point};

static POSTCODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})-?(\d{3})$").expect("valid postcode regex"));

#[derive(Debug, Deserialize)]
struct EmapaRow {
    #[serde(rename = "Nazwa miejscowości")]
    city: Option<String>,
    #[serde(rename = "SIMC")]
    simc: Option<String>,
    #[serde(rename = "Nazwa ulicy")]
    street: Option<String>,
    #[serde(rename = "Numer")]
    housenumber: Option<String>,
    #[serde(rename = "AdresCSIOZ")]
    postcode: Option<String>,
    #[serde(rename = "szerokosc_geograficzna")]
    lat: Option<String>,
    #[serde(rename = "dlugosc_geograficzna")]
    lon: Option<String>,
}

/// Parse a `;`-delimited e-mapa CSV file (optionally gzipped).
///
/// `source` is the local map system the file came from and ends up in
/// `source:addr`.
pub fn parse_emapa_csv_file(path: &Path, source: &str) -> Result<ParsedBatch<Address>> {
    info!("Parsing e-mapa CSV file: {}", path.display());
    parse_emapa_csv(open_reader(path)?, source)
}

pub fn parse_emapa_csv<R: Read>(reader: R, source: &str) -> Result<ParsedBatch<Address>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader);

    let mut batch = ParsedBatch::new();
    for (line, result) in csv_reader.deserialize::<EmapaRow>().enumerate() {
        let parsed = result
            .map_err(|e| SkipReason::Malformed(e.to_string()))
            .and_then(|row| row_to_address(row, source));
        batch.push(parsed, &format_args!("row {}", line + 1));
    }

    info!(
        "Parsed {} e-mapa addresses ({} rows skipped)",
        batch.records.len(),
        batch.skipped
    );
    Ok(batch)
}

fn row_to_address(row: EmapaRow, source: &str) -> std::result::Result<Address, SkipReason> {
    let city = required(row.city, "Nazwa miejscowości")?;
    let simc = required(row.simc, "SIMC")?;
    let housenumber = required(row.housenumber, "Numer")?;
    let lat = parse_coordinate(row.lat, "szerokosc_geograficzna")?;
    let lon = parse_coordinate(row.lon, "dlugosc_geograficzna")?;

    let mut addr = Address::new(city, row.street.as_deref(), housenumber, Point::new(lat, lon))
        .with_simc(simc)
        .with_source(source);

    // AdresCSIOZ may hold several codes separated by `|`
    if let Some(postcode) = row
        .postcode
        .as_deref()
        .and_then(|raw| raw.split('|').next())
        .and_then(format_postcode)
    {
        addr = addr.with_postcode(postcode);
    }

    Ok(addr)
}

fn required(value: Option<String>, field: &'static str) -> std::result::Result<String, SkipReason> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(SkipReason::MissingField(field))
}

fn parse_coordinate(
    value: Option<String>,
    field: &'static str,
) -> std::result::Result<f64, SkipReason> {
    let raw = required(value, field)?;
    raw.replace(',', ".")
        .parse()
        .map_err(|_| SkipReason::InvalidCoordinate(raw))
}

/// Format a postcode as `NN-NNN`; other non-empty values are kept as given
pub fn format_postcode(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match POSTCODE_REGEX.captures(raw) {
        Some(caps) => Some(format!("{}-{}", &caps[1], &caps[2])),
        None => Some(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Nazwa miejscowości;SIMC;Nazwa ulicy;Numer;AdresCSIOZ;szerokosc_geograficzna;dlugosc_geograficzna\n";
    const SOURCE: &str = "gminatest.e-mapa.net";

    fn parse(body: &str) -> ParsedBatch<Address> {
        let csv = format!("{}{}", HEADER, body);
        parse_emapa_csv(csv.as_bytes(), SOURCE).unwrap()
    }

    #[test]
    fn test_parse_full_row() {
        let batch = parse("Wola ;0918123; Polna ;12A;00950|00951;52.25;21.01\n");
        assert_eq!(batch.skipped, 0);

        let addr = &batch.records[0];
        assert_eq!(addr.city, "Wola");
        assert_eq!(addr.city_simc.as_deref(), Some("0918123"));
        assert_eq!(addr.street(), Some("Polna"));
        assert_eq!(addr.housenumber, "12A");
        assert_eq!(addr.postcode.as_deref(), Some("00-950"));
        assert_eq!(addr.point, Point::new(52.25, 21.01));
        assert_eq!(addr.source.as_deref(), Some(SOURCE));
        assert!(addr.osm.is_none());
    }

    #[test]
    fn test_empty_street_is_absent() {
        let batch = parse("Zalesie;0918124;;7;05-123;52.0;21.0\n");
        assert_eq!(batch.records[0].street(), None);
    }

    #[test]
    fn test_defective_rows_skipped() {
        let batch = parse(
            "Wola;0918123;Polna;1;00950;52.0;21.0\n\
             Wola;;Polna;2;00950;52.0;21.0\n\
             Wola;0918123;Polna;3;00950;abc;21.0\n\
             Wola;0918123;Polna;;00950;52.0;21.0\n\
             Wola;0918123;Polna;5;00950;52.0;21.0\n",
        );
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped, 3);
        assert_eq!(batch.records[1].housenumber, "5");
    }

    #[test]
    fn test_missing_column_skips_rows() {
        let csv = "Nazwa miejscowości;Numer\nWola;1\n";
        let batch = parse_emapa_csv(csv.as_bytes(), SOURCE).unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_format_postcode() {
        assert_eq!(format_postcode("00950").as_deref(), Some("00-950"));
        assert_eq!(format_postcode(" 00-950 ").as_deref(), Some("00-950"));
        assert_eq!(format_postcode("").as_deref(), None);
        assert_eq!(format_postcode("n/a").as_deref(), Some("n/a"));
    }
}
