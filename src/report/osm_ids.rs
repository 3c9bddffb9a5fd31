use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::models::Address;

/// Comma-separated short ids (`n123,w45,r6`) of map-dataset addresses,
/// ready to paste into an editor's object loader
pub fn short_id_list<'a, I>(addresses: I) -> String
where
    I: IntoIterator<Item = &'a Address>,
{
    addresses
        .into_iter()
        .filter_map(Address::osm_short_id)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn write_id_list<'a, I>(path: &Path, addresses: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Address>,
{
    let list = short_id_list(addresses);
    fs::write(path, &list)?;
    info!("Saved object list to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OsmObject, OsmType, Point, Tags};

    fn osm(osm_type: OsmType, id: i64) -> Address {
        Address::new("Wola", Some("Polna"), "1", Point::new(0.0, 0.0))
            .with_osm(OsmObject::new(osm_type, id, Tags::new()))
    }

    #[test]
    fn test_short_id_list() {
        let addresses = vec![
            osm(OsmType::Node, 123),
            osm(OsmType::Way, 45),
            Address::new("Wola", None, "2", Point::new(0.0, 0.0)),
            osm(OsmType::Relation, 6),
        ];
        assert_eq!(short_id_list(&addresses), "n123,w45,r6");
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(short_id_list(&Vec::<Address>::new()), "");
    }
}
