//! Map-dataset extension attached to addresses parsed from OSM objects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All tags of a source object, ordered by key.
pub type Tags = BTreeMap<String, String>;

/// Type of OSM object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

impl OsmType {
    /// Parse the `type` field of an Overpass element
    pub fn from_overpass(value: &str) -> Option<Self> {
        match value {
            "node" => Some(OsmType::Node),
            "way" => Some(OsmType::Way),
            "relation" => Some(OsmType::Relation),
            _ => None,
        }
    }

    /// One-letter prefix used by editors for object lists ("n123,w45")
    pub fn short_prefix(&self) -> char {
        match self {
            OsmType::Node => 'n',
            OsmType::Way => 'w',
            OsmType::Relation => 'r',
        }
    }
}

impl std::fmt::Display for OsmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsmType::Node => write!(f, "node"),
            OsmType::Way => write!(f, "way"),
            OsmType::Relation => write!(f, "relation"),
        }
    }
}

/// Identity and raw tags of the OSM object an address was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsmObject {
    pub osm_id: i64,
    pub osm_type: OsmType,
    pub tags: Tags,
}

impl OsmObject {
    pub fn new(osm_type: OsmType, osm_id: i64, tags: Tags) -> Self {
        Self {
            osm_id,
            osm_type,
            tags,
        }
    }

    /// Short-form identifier, e.g. `n123` or `w45`
    pub fn short_id(&self) -> String {
        format!("{}{}", self.osm_type.short_prefix(), self.osm_id)
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }
}
