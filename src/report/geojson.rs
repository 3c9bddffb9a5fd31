//! GeoJSON output with OSM address tags as feature properties.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::models::Address;

#[derive(Debug, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub geo_type: &'static str,
    pub features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub geo_type: &'static str,
    pub geometry: PointGeometry,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub geo_type: &'static str,
    pub coordinates: [f64; 2], // [lon, lat]
}

impl From<&Address> for Feature {
    fn from(addr: &Address) -> Self {
        Self {
            geo_type: "Feature",
            geometry: PointGeometry {
                geo_type: "Point",
                coordinates: [addr.point.lon, addr.point.lat],
            },
            properties: addr.to_osm_tags(),
        }
    }
}

pub fn addresses_to_geojson<'a, I>(addresses: I) -> FeatureCollection
where
    I: IntoIterator<Item = &'a Address>,
{
    FeatureCollection {
        geo_type: "FeatureCollection",
        features: addresses.into_iter().map(Feature::from).collect(),
    }
}

pub fn write_geojson<'a, I>(path: &Path, addresses: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Address>,
{
    let collection = addresses_to_geojson(addresses);
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &collection)?;

    info!(
        "Saved {} features to {}",
        collection.features.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point;

    #[test]
    fn test_feature_collection_shape() {
        let addresses = vec![
            Address::new("Wola", Some("Polna"), "1", Point::new(52.25, 21.01))
                .with_simc("0918123")
                .with_postcode("05-123"),
            Address::new("Zalesie", None, "7", Point::new(52.1, 21.2)),
        ];

        let value = serde_json::to_value(addresses_to_geojson(&addresses)).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"].as_array().unwrap().len(), 2);

        let first = &value["features"][0];
        assert_eq!(first["type"], "Feature");
        assert_eq!(first["geometry"]["type"], "Point");
        assert_eq!(first["geometry"]["coordinates"][0], 21.01);
        assert_eq!(first["geometry"]["coordinates"][1], 52.25);
        assert_eq!(first["properties"]["addr:city"], "Wola");
        assert_eq!(first["properties"]["addr:city:simc"], "0918123");

        let second = &value["features"][1];
        assert_eq!(second["properties"]["addr:place"], "Zalesie");
        assert!(second["properties"].get("addr:city").is_none());
    }

    #[test]
    fn test_write_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.geojson");
        let addresses = vec![Address::new("Wola", Some("Polna"), "1", Point::new(52.0, 21.0))];

        write_geojson(&path, &addresses).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["features"][0]["properties"]["addr:street"], "Polna");
    }
}
