//! Address record shared by the reference and map datasets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::osm::{OsmObject, Tags};
use crate::config::MatchConfig;
use crate::matching::identity_key;

/// Geographic point (lat/lon)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Common shape the matching engine works against.
///
/// Implemented by [`Address`]; anything exposing city, street and
/// housenumber can be diffed and checked for duplicates.
pub trait Addressed {
    fn city(&self) -> &str;

    fn street(&self) -> Option<&str>;

    fn housenumber(&self) -> &str;

    /// Raw source tags, when the record came from the map dataset
    fn osm_tags(&self) -> Option<&Tags> {
        None
    }

    fn identity_key(&self, config: &MatchConfig) -> String {
        identity_key(self.city(), self.street(), self.housenumber(), config)
    }
}

/// One postal address observation.
///
/// `osm` is set only for addresses read from the map dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub point: Point,

    /// Locality (SIMC) code used to partition street name lookups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_simc: Option<String>,

    /// City or place name
    pub city: String,

    /// Never `Some("")`; see [`Address::set_street`]
    #[serde(skip_serializing_if = "Option::is_none")]
    street: Option<String>,

    pub housenumber: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,

    /// Provenance, e.g. the local map system the record was downloaded from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub osm: Option<OsmObject>,
}

impl Address {
    /// Create an address with the fields every source provides
    pub fn new(
        city: impl Into<String>,
        street: Option<&str>,
        housenumber: impl Into<String>,
        point: Point,
    ) -> Self {
        Self {
            point,
            city_simc: None,
            city: city.into(),
            street: clean_street(street),
            housenumber: housenumber.into(),
            postcode: None,
            source: None,
            osm: None,
        }
    }

    pub fn with_simc(mut self, simc: impl Into<String>) -> Self {
        self.city_simc = Some(simc.into());
        self
    }

    pub fn with_postcode(mut self, postcode: impl Into<String>) -> Self {
        self.postcode = Some(postcode.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_osm(mut self, osm: OsmObject) -> Self {
        self.osm = Some(osm);
        self
    }

    pub fn street(&self) -> Option<&str> {
        self.street.as_deref()
    }

    /// Replace the street name. Blank names are stored as absent.
    pub fn set_street(&mut self, street: Option<&str>) {
        self.street = clean_street(street);
    }

    /// Short-form OSM id (`n123`) for map-dataset addresses
    pub fn osm_short_id(&self) -> Option<String> {
        self.osm.as_ref().map(OsmObject::short_id)
    }

    /// OSM address tags describing this record.
    ///
    /// Addresses without a street are tagged with `addr:place` instead of
    /// `addr:city`.
    pub fn to_osm_tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();

        match &self.street {
            Some(street) => {
                tags.insert("addr:city".to_string(), self.city.clone());
                tags.insert("addr:street".to_string(), street.clone());
            }
            None => {
                tags.insert("addr:place".to_string(), self.city.clone());
            }
        }

        if let Some(simc) = &self.city_simc {
            tags.insert("addr:city:simc".to_string(), simc.clone());
        }
        tags.insert("addr:housenumber".to_string(), self.housenumber.clone());
        if let Some(postcode) = &self.postcode {
            tags.insert("addr:postcode".to_string(), postcode.clone());
        }
        if let Some(source) = &self.source {
            tags.insert("source:addr".to_string(), source.clone());
        }

        tags
    }
}

impl Addressed for Address {
    fn city(&self) -> &str {
        &self.city
    }

    fn street(&self) -> Option<&str> {
        self.street.as_deref()
    }

    fn housenumber(&self) -> &str {
        &self.housenumber
    }

    fn osm_tags(&self) -> Option<&Tags> {
        self.osm.as_ref().map(|o| &o.tags)
    }
}

fn clean_street(street: Option<&str>) -> Option<String> {
    street
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OsmType;

    fn point() -> Point {
        Point::new(52.1, 21.0)
    }

    #[test]
    fn test_blank_street_is_absent() {
        let addr = Address::new("Wola", Some("   "), "1", point());
        assert_eq!(addr.street(), None);

        let mut addr = Address::new("Wola", Some(" Polna "), "1", point());
        assert_eq!(addr.street(), Some("Polna"));

        addr.set_street(Some(""));
        assert_eq!(addr.street(), None);
    }

    #[test]
    fn test_osm_tags_with_street() {
        let addr = Address::new("Warszawa", Some("Polna"), "12A", point())
            .with_simc("0918123")
            .with_postcode("00-950")
            .with_source("gminawarszawa.e-mapa.net");

        let tags = addr.to_osm_tags();
        assert_eq!(tags.get("addr:city").map(String::as_str), Some("Warszawa"));
        assert_eq!(tags.get("addr:street").map(String::as_str), Some("Polna"));
        assert_eq!(tags.get("addr:place"), None);
        assert_eq!(
            tags.get("addr:city:simc").map(String::as_str),
            Some("0918123")
        );
        assert_eq!(tags.get("addr:housenumber").map(String::as_str), Some("12A"));
        assert_eq!(tags.get("addr:postcode").map(String::as_str), Some("00-950"));
        assert_eq!(
            tags.get("source:addr").map(String::as_str),
            Some("gminawarszawa.e-mapa.net")
        );
    }

    #[test]
    fn test_osm_tags_place_only() {
        let addr = Address::new("Zalesie", None, "7", point());

        let tags = addr.to_osm_tags();
        assert_eq!(tags.get("addr:place").map(String::as_str), Some("Zalesie"));
        assert_eq!(tags.get("addr:city"), None);
        assert_eq!(tags.get("addr:street"), None);
        assert_eq!(tags.get("source:addr"), None);
    }

    #[test]
    fn test_osm_short_id() {
        let plain = Address::new("Wola", None, "1", point());
        assert_eq!(plain.osm_short_id(), None);

        let osm = plain.with_osm(OsmObject::new(OsmType::Node, 123, Tags::new()));
        assert_eq!(osm.osm_short_id().as_deref(), Some("n123"));
    }
}
