//! Overpass API download and element parsing.

use geo::{Centroid, Coord, LineString, MultiPoint, Polygon};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use super::ParsedBatch;
use crate::config::OverpassConfig;
use crate::error::{ReconcileError, Result, SkipReason};
use crate::models::{Address, OsmObject, OsmType, Point, Tags};

/// Placeholder replaced with the commune TERC id in query templates
pub const TERC_PLACEHOLDER: &str = "<teryt_terc>";

pub const ADDRESS_QUERY: &str = r#"[out:json][timeout:250];
area["teryt:terc"="<teryt_terc>"]["boundary"="administrative"]->.searchArea;
nwr["addr:housenumber"](area.searchArea);
out center;"#;

pub const STREET_QUERY: &str = r#"[out:json][timeout:250];
area["teryt:terc"="<teryt_terc>"]["boundary"="administrative"]->.searchArea;
way["highway"]["name"](area.searchArea);
out tags;"#;

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassElement {
    #[serde(rename = "type")]
    pub element_type: String,
    pub id: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Present for ways/relations queried with `out center`
    pub center: Option<LatLon>,
    /// Present for ways queried with `out geom`
    pub geometry: Option<Vec<LatLon>>,
    pub tags: Option<Tags>,
}

impl OverpassElement {
    /// Elements without tags are geometry helpers, not map objects
    pub fn is_tagged(&self) -> bool {
        self.tags.is_some()
    }

    /// Matching point: node position, or the centre of a way/relation
    pub fn point(&self, osm_type: OsmType) -> Option<Point> {
        if osm_type == OsmType::Node {
            return Some(Point::new(self.lat?, self.lon?));
        }

        if let Some(center) = self.center {
            return Some(Point::new(center.lat, center.lon));
        }

        self.geometry.as_deref().and_then(geometry_centroid)
    }
}

/// Centroid of a way geometry; closed rings are treated as areas
fn geometry_centroid(geometry: &[LatLon]) -> Option<Point> {
    let coords: Vec<Coord<f64>> = geometry
        .iter()
        .map(|p| Coord { x: p.lon, y: p.lat })
        .collect();

    let centroid = match coords.len() {
        0 => None,
        1 | 2 | 3 => MultiPoint::from(coords).centroid(),
        _ if coords.first() == coords.last() => {
            Polygon::new(LineString::new(coords), vec![]).centroid()
        }
        _ => LineString::new(coords).centroid(),
    }?;

    Some(Point::new(centroid.y(), centroid.x()))
}

/// Substitute the commune id into a query template
pub fn render_query(template: &str, teryt_terc: &str) -> String {
    template.trim().replace(TERC_PLACEHOLDER, teryt_terc)
}

pub fn load_query(path: &Path, teryt_terc: &str) -> Result<String> {
    let template = std::fs::read_to_string(path)?;
    info!(
        "Loaded Overpass query from file: {}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("?")
    );
    Ok(render_query(&template, teryt_terc))
}

/// Convert a tagged Overpass element into a map-dataset address.
///
/// `addr:place` stands in for `addr:city` on place-only addresses.
pub fn element_to_address(element: &OverpassElement) -> std::result::Result<Address, SkipReason> {
    let osm_type = OsmType::from_overpass(&element.element_type)
        .ok_or_else(|| SkipReason::UnknownObjectType(element.element_type.clone()))?;
    let tags = element.tags.as_ref().ok_or(SkipReason::NoTags)?;
    let point = element.point(osm_type).ok_or(SkipReason::NoGeometry)?;

    address_from_tags(osm_type, element.id, tags, point)
}

/// Build an address from the `addr:*` tags of any OSM object
pub fn address_from_tags(
    osm_type: OsmType,
    osm_id: i64,
    tags: &Tags,
    point: Point,
) -> std::result::Result<Address, SkipReason> {
    let housenumber = tags
        .get("addr:housenumber")
        .ok_or(SkipReason::MissingField("addr:housenumber"))?;
    let city = tags
        .get("addr:city")
        .or_else(|| tags.get("addr:place"))
        .map(String::as_str)
        .unwrap_or("");

    let mut addr = Address::new(
        city,
        tags.get("addr:street").map(String::as_str),
        housenumber.as_str(),
        point,
    );
    addr.city_simc = tags.get("addr:city:simc").cloned();
    addr.postcode = tags.get("addr:postcode").cloned();
    addr.source = tags.get("source:addr").cloned();

    Ok(addr.with_osm(OsmObject::new(osm_type, osm_id, tags.clone())))
}

/// Parse all tagged address elements of a response
pub fn parse_addresses(response: &OverpassResponse) -> ParsedBatch<Address> {
    let mut batch = ParsedBatch::new();
    for element in response.elements.iter().filter(|e| e.is_tagged()) {
        batch.push(
            element_to_address(element),
            &format_args!("{} {}", element.element_type, element.id),
        );
    }

    info!(
        "Parsed {} OSM addresses ({} elements skipped)",
        batch.records.len(),
        batch.skipped
    );
    batch
}

/// Tags of street elements, for the alternative names table
pub fn street_tags(response: &OverpassResponse) -> impl Iterator<Item = &Tags> {
    response.elements.iter().filter_map(|e| e.tags.as_ref())
}

/// Overpass API client with retry on failure
pub struct OverpassClient {
    client: Client,
    url: String,
    retries: u32,
    retry_pause: Duration,
}

impl OverpassClient {
    pub fn new(config: &OverpassConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("addr-reconcile/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            retries: config.retries.max(1),
            retry_pause: config.retry_pause(),
        })
    }

    /// Run a query, retrying on bad status codes and transport or JSON errors
    pub async fn fetch(&self, query: &str) -> Result<OverpassResponse> {
        let url = Url::parse_with_params(&self.url, &[("data", query)])?;

        for attempt in 1..=self.retries {
            debug!("Overpass request attempt {}/{}", attempt, self.retries);

            match self.client.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<OverpassResponse>().await {
                        Ok(data) => {
                            info!("Downloaded {} Overpass elements", data.elements.len());
                            return Ok(data);
                        }
                        Err(e) => error!("Error with downloading/parsing data: {}", e),
                    }
                }
                Ok(response) => warn!("Incorrect status code: {}", response.status()),
                Err(e) => error!("Error with downloading/parsing data: {}", e),
            }

            if attempt < self.retries {
                tokio::time::sleep(self.retry_pause).await;
            }
        }

        Err(ReconcileError::DownloadFailed {
            url: self.url.clone(),
            attempts: self.retries,
        })
    }

    /// Download map-dataset addresses for a commune
    pub async fn fetch_addresses(&self, query: &str) -> Result<ParsedBatch<Address>> {
        info!("Downloading Overpass address data...");
        let response = self.fetch(query).await?;
        Ok(parse_addresses(&response))
    }

    /// Download street objects for a commune
    pub async fn fetch_streets(&self, query: &str) -> Result<OverpassResponse> {
        info!("Downloading Overpass street data...");
        self.fetch(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "version": 0.6,
        "elements": [
            {"type": "node", "id": 1, "lat": 52.1, "lon": 21.1,
             "tags": {"addr:city": "Wola", "addr:street": "Polna", "addr:housenumber": "1",
                      "addr:postcode": "05-123", "addr:city:simc": "0918123", "source:addr": "gugik.gov.pl"}},
            {"type": "way", "id": 2, "center": {"lat": 52.2, "lon": 21.2},
             "tags": {"addr:place": "Zalesie", "addr:housenumber": "7", "building": "house"}},
            {"type": "relation", "id": 3, "center": {"lat": 52.3, "lon": 21.3},
             "tags": {"addr:city": "Wola", "addr:street": "Lipowa", "addr:housenumber": "3", "type": "multipolygon"}},
            {"type": "node", "id": 4, "lat": 52.4, "lon": 21.4},
            {"type": "node", "id": 5, "lat": 52.5, "lon": 21.5, "tags": {"shop": "bakery"}}
        ]
    }"#;

    fn response() -> OverpassResponse {
        serde_json::from_str(RESPONSE).unwrap()
    }

    #[test]
    fn test_parse_addresses() {
        let batch = parse_addresses(&response());
        assert_eq!(batch.records.len(), 3);
        assert_eq!(batch.skipped, 1);

        let node = &batch.records[0];
        assert_eq!(node.city, "Wola");
        assert_eq!(node.street(), Some("Polna"));
        assert_eq!(node.city_simc.as_deref(), Some("0918123"));
        assert_eq!(node.postcode.as_deref(), Some("05-123"));
        assert_eq!(node.source.as_deref(), Some("gugik.gov.pl"));
        assert_eq!(node.point, Point::new(52.1, 21.1));
        assert_eq!(node.osm_short_id().as_deref(), Some("n1"));

        let way = &batch.records[1];
        assert_eq!(way.city, "Zalesie");
        assert_eq!(way.street(), None);
        assert_eq!(way.point, Point::new(52.2, 21.2));
        assert_eq!(way.osm.as_ref().unwrap().tags.get("building").unwrap(), "house");

        assert_eq!(batch.records[2].osm_short_id().as_deref(), Some("r3"));
    }

    #[test]
    fn test_way_geometry_centroid() {
        let element: OverpassElement = serde_json::from_str(
            r#"{"type": "way", "id": 9,
                "geometry": [{"lat": 0.0, "lon": 0.0}, {"lat": 0.0, "lon": 2.0},
                             {"lat": 2.0, "lon": 2.0}, {"lat": 2.0, "lon": 0.0},
                             {"lat": 0.0, "lon": 0.0}],
                "tags": {"addr:housenumber": "1"}}"#,
        )
        .unwrap();

        let point = element.point(OsmType::Way).unwrap();
        assert!((point.lat - 1.0).abs() < 1e-9);
        assert!((point.lon - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unresolvable_point() {
        let element: OverpassElement =
            serde_json::from_str(r#"{"type": "way", "id": 9, "tags": {"addr:housenumber": "1"}}"#)
                .unwrap();
        assert_eq!(element_to_address(&element), Err(SkipReason::NoGeometry));
    }

    #[test]
    fn test_render_query() {
        let query = render_query(ADDRESS_QUERY, "1432052");
        assert!(query.contains(r#"["teryt:terc"="1432052"]"#));
        assert!(!query.contains(TERC_PLACEHOLDER));
    }

    #[test]
    fn test_street_tags() {
        let response: OverpassResponse = serde_json::from_str(
            r#"{"elements": [
                {"type": "way", "id": 1, "tags": {"highway": "residential", "name": "Polna"}},
                {"type": "node", "id": 2, "lat": 1.0, "lon": 1.0}
            ]}"#,
        )
        .unwrap();
        assert_eq!(street_tags(&response).count(), 1);
    }
}
