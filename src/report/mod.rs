//! Output produced from matching results.

pub mod geojson;
pub mod osm_ids;
pub mod stats;

pub use geojson::{addresses_to_geojson, write_geojson, FeatureCollection};
pub use osm_ids::{short_id_list, write_id_list};
pub use stats::{
    addr_tags_distribution, format_distribution, format_ratio, osm_type_distribution, percent,
};
