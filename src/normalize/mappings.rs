//! Community street names mapping table.
//!
//! Uses the CSV file maintained by gugik2osm:
//! https://github.com/openstreetmap-polska/gugik2osm/blob/main/processing/sql/data/street_names_mappings.csv

use csv::{ReaderBuilder, StringRecord};
use hashbrown::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use super::StreetLookup;
use crate::error::{ReconcileError, Result, SkipReason};

const SIMC_COLUMN: &str = "teryt_simc_code";
const ORIGIN_COLUMN: &str = "teryt_street_name";
const CANONICAL_COLUMN: &str = "osm_street_name";

/// SIMC code -> lower-cased origin street name -> OSM street name.
///
/// Built once per run and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct StreetNameMappings {
    by_simc: HashMap<String, HashMap<String, String>>,
    skipped_rows: usize,
}

struct Columns {
    simc: usize,
    origin: usize,
    canonical: usize,
}

impl StreetNameMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading street names mappings from {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Read the table from CSV. Rows with missing or empty fields are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b',')
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let columns = Columns {
            simc: column_index(&headers, SIMC_COLUMN)?,
            origin: column_index(&headers, ORIGIN_COLUMN)?,
            canonical: column_index(&headers, CANONICAL_COLUMN)?,
        };

        let mut mappings = Self::new();
        for (line, result) in csv_reader.records().enumerate() {
            let parsed = match &result {
                Ok(record) => parse_row(record, &columns),
                Err(e) => Err(SkipReason::Malformed(e.to_string())),
            };

            match parsed {
                Ok((simc, origin, canonical)) => mappings.insert(simc, origin, canonical),
                Err(reason) => {
                    debug!("Skipping mapping row {}: {}", line + 1, reason);
                    mappings.skipped_rows += 1;
                }
            }
        }

        info!(
            "Loaded {} street name mappings for {} localities ({} rows skipped)",
            mappings.len(),
            mappings.by_simc.len(),
            mappings.skipped_rows
        );
        Ok(mappings)
    }

    /// Add a mapping; the origin name is stored lower-cased
    pub fn insert(&mut self, simc: &str, origin: &str, canonical: &str) {
        self.by_simc
            .entry(simc.to_string())
            .or_default()
            .insert(origin.to_lowercase(), canonical.to_string());
    }

    pub fn contains_simc(&self, simc: &str) -> bool {
        self.by_simc.contains_key(simc)
    }

    /// Total number of origin names across all localities
    pub fn len(&self) -> usize {
        self.by_simc.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_simc.is_empty()
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

impl StreetLookup for StreetNameMappings {
    fn lookup(&self, simc: Option<&str>, street: &str) -> Option<&str> {
        self.by_simc
            .get(simc?)?
            .get(&street.to_lowercase())
            .map(String::as_str)
    }

    fn has_partition(&self, simc: Option<&str>) -> bool {
        simc.map_or(false, |s| self.contains_simc(s))
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| ReconcileError::ColumnNotFound(name.to_string()))
}

fn parse_row<'r>(
    record: &'r StringRecord,
    columns: &Columns,
) -> std::result::Result<(&'r str, &'r str, &'r str), SkipReason> {
    let field = |idx: usize, name: &'static str| {
        record
            .get(idx)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(SkipReason::MissingField(name))
    };

    Ok((
        field(columns.simc, SIMC_COLUMN)?,
        field(columns.origin, ORIGIN_COLUMN)?,
        field(columns.canonical, CANONICAL_COLUMN)?,
    ))
}
