use hashbrown::HashMap;
use tracing::{debug, info};

use super::StreetLookup;
use crate::models::Tags;

/// Street tags holding alternative spellings of the `name` tag.
pub const ALT_NAME_KEYS: [&str; 4] = ["alt_name", "official_name", "short_name", "loc_name"];

/// Lower-cased alternative street name -> `name` of the same street.
///
/// For a street tagged `name=Lastname`, `official_name=Prefix Firstname
/// Lastname` the table holds `"prefix firstname lastname" -> "Lastname"`.
/// Not partitioned by locality.
#[derive(Debug, Clone, Default)]
pub struct AltStreetNames {
    names: HashMap<String, String>,
}

impl AltStreetNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from street objects' tags. Streets without a `name`
    /// are skipped.
    pub fn from_street_tags<'a, I>(streets: I) -> Self
    where
        I: IntoIterator<Item = &'a Tags>,
    {
        let mut table = Self::new();
        let mut unnamed = 0usize;

        for tags in streets {
            let Some(name) = tags.get("name").filter(|n| !n.trim().is_empty()) else {
                unnamed += 1;
                continue;
            };

            for key in ALT_NAME_KEYS {
                if let Some(alt) = tags.get(key).filter(|v| !v.trim().is_empty()) {
                    table.insert(alt, name);
                }
            }
        }

        if unnamed > 0 {
            debug!("Skipped {} street objects without name", unnamed);
        }
        info!("Collected {} alternative street names", table.len());
        table
    }

    pub fn insert(&mut self, alt_name: &str, name: &str) {
        self.names
            .insert(alt_name.trim().to_lowercase(), name.trim().to_string());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl StreetLookup for AltStreetNames {
    fn lookup(&self, _simc: Option<&str>, street: &str) -> Option<&str> {
        self.names.get(&street.to_lowercase()).map(String::as_str)
    }

    fn has_partition(&self, _simc: Option<&str>) -> bool {
        true
    }
}
