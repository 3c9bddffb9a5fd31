//! Commune (gmina) lookup in the TERYT TERC register from
//! https://eteryt.stat.gov.pl/

use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{ReconcileError, Result};

const TERC_COLUMNS: [&str; 4] = ["WOJ", "POW", "GMI", "RODZ"];
const NAME_COLUMN: &str = "NAZWA";

pub fn find_commune_name_in_file(path: &Path, teryt_terc: &str) -> Result<String> {
    find_commune_name(File::open(path)?, teryt_terc)
}

/// Name of the commune identified by a 7-character TERC id
/// (voivodeship, county, commune and commune type codes concatenated).
pub fn find_commune_name<R: Read>(reader: R, teryt_terc: &str) -> Result<String> {
    if teryt_terc.len() != 7 || !teryt_terc.chars().all(|c| c.is_ascii_digit()) {
        return Err(ReconcileError::TerytNotFound(teryt_terc.to_string()));
    }

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let terc_idx = TERC_COLUMNS
        .iter()
        .map(|name| column_index(&headers, name))
        .collect::<Result<Vec<_>>>()?;
    let name_idx = column_index(&headers, NAME_COLUMN)?;

    for result in csv_reader.records() {
        let record = result?;
        let terc: String = terc_idx
            .iter()
            .map(|&idx| record.get(idx).unwrap_or("").trim())
            .collect();

        if terc == teryt_terc {
            if let Some(name) = record.get(name_idx) {
                return Ok(name.trim().to_string());
            }
        }
    }

    Err(ReconcileError::TerytNotFound(teryt_terc.to_string()))
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        .ok_or_else(|| ReconcileError::ColumnNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TERC: &str = "\u{feff}WOJ;POW;GMI;RODZ;NAZWA;NAZWA_DOD;STAN_NA
14;;;;MAZOWIECKIE;województwo;2024-01-01
14;65;;;Warszawa;miasto stołeczne, na prawach powiatu;2024-01-01
14;65;01;1;Warszawa;gmina miejska, miasto stołeczne;2024-01-01
14;32;05;2;Stare Babice;gmina wiejska;2024-01-01
";

    #[test]
    fn test_find_commune() {
        assert_eq!(
            find_commune_name(TERC.as_bytes(), "1432052").unwrap(),
            "Stare Babice"
        );
        assert_eq!(
            find_commune_name(TERC.as_bytes(), "1465011").unwrap(),
            "Warszawa"
        );
    }

    #[test]
    fn test_unknown_terc() {
        let err = find_commune_name(TERC.as_bytes(), "9999999").unwrap_err();
        assert!(matches!(err, ReconcileError::TerytNotFound(t) if t == "9999999"));
    }

    #[test]
    fn test_county_is_not_commune() {
        assert!(find_commune_name(TERC.as_bytes(), "1465").is_err());
    }
}
