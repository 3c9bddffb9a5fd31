//! Reference addresses served as GML by the e-mapa WFS endpoint
//! (`wfs:member/ms:punkty_adresowe` features).

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

use super::ParsedBatch;
use crate::error::{Result, SkipReason};
use crate::models::{Address, Point};

const FEATURE_ELEMENT: &[u8] = b"punkty_adresowe";
const CITY: &str = "NAZWA_MIEJSCOWOSCI";
const POSTCODE: &str = "KOD_POCZTOWY";
const HOUSENUMBER: &str = "NUMER_PORZADKOWY";
const SIMC: &str = "ID_MIEJSCOWOSCI";
const STREET: &str = "NAZWA_ULICY";
const POSITION: &str = "pos";

const FIELDS: [&str; 6] = [CITY, POSTCODE, HOUSENUMBER, SIMC, STREET, POSITION];

pub fn parse_emapa_gml_file(path: &Path, source: &str) -> Result<ParsedBatch<Address>> {
    info!("Parsing e-mapa GML file: {}", path.display());
    let file = File::open(path)?;
    parse_emapa_gml(BufReader::new(file), source)
}

/// Parse every address feature in a WFS GML document
pub fn parse_emapa_gml<R: BufRead>(reader: R, source: &str) -> Result<ParsedBatch<Address>> {
    let mut reader = Reader::from_reader(reader);
    reader.trim_text(true);

    let mut batch = ParsedBatch::new();
    let mut buf = Vec::new();

    let mut feature: Option<HashMap<&'static str, String>> = None;
    let mut current_field: Option<&'static str> = None;
    let mut feature_count = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let name = e.local_name();
                if name.as_ref() == FEATURE_ELEMENT {
                    feature = Some(HashMap::new());
                } else if feature.is_some() {
                    current_field = FIELDS.iter().copied().find(|f| f.as_bytes() == name.as_ref());
                }
            }
            Event::Text(e) => {
                if let (Some(fields), Some(field)) = (feature.as_mut(), current_field) {
                    let text = e.unescape()?;
                    fields.entry(field).or_default().push_str(&text);
                }
            }
            Event::End(ref e) => {
                if e.local_name().as_ref() == FEATURE_ELEMENT {
                    if let Some(fields) = feature.take() {
                        feature_count += 1;
                        batch.push(
                            feature_to_address(&fields, source),
                            &format_args!("GML feature {}", feature_count),
                        );
                    }
                }
                current_field = None;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    info!(
        "Parsed {} e-mapa addresses ({} features skipped)",
        batch.records.len(),
        batch.skipped
    );
    Ok(batch)
}

fn feature_to_address(
    fields: &HashMap<&'static str, String>,
    source: &str,
) -> std::result::Result<Address, SkipReason> {
    let required = |field: &'static str| {
        fields
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or(SkipReason::MissingField(field))
    };

    let city = required(CITY)?;
    let housenumber = required(HOUSENUMBER)?;
    let simc = required(SIMC)?;
    let point = parse_position(required(POSITION)?)?;

    let mut addr = Address::new(
        city,
        fields.get(STREET).map(String::as_str),
        housenumber,
        point,
    )
    .with_simc(simc)
    .with_source(source);

    if let Ok(postcode) = required(POSTCODE) {
        addr = addr.with_postcode(postcode);
    }

    Ok(addr)
}

/// `gml:pos` holds "lat lon"
fn parse_position(raw: &str) -> std::result::Result<Point, SkipReason> {
    let coords: Vec<f64> = raw
        .split_whitespace()
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| SkipReason::InvalidCoordinate(raw.to_string()))?;

    match coords.as_slice() {
        [lat, lon] => Ok(Point::new(*lat, *lon)),
        _ => Err(SkipReason::InvalidCoordinate(raw.to_string())),
    }
}
