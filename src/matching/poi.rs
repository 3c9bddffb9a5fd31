use crate::models::Tags;

/// Keys marking an object as a point of interest.
///
/// Subjective list based on https://wiki.openstreetmap.org/wiki/Map_features
pub const POI_KEYS: [&str; 9] = [
    "amenity",
    "craft",
    "emergency",
    "healthcare",
    "leisure",
    "man_made",
    "office",
    "shop",
    "tourism",
];

pub fn is_poi(tags: &Tags) -> bool {
    POI_KEYS.iter().any(|key| tags.contains_key(*key))
}

/// A POI without a `building` tag is a separate feature sharing the address,
/// not a duplicate of it.
pub fn is_excluded_poi(tags: &Tags) -> bool {
    is_poi(tags) && !tags.contains_key("building")
}
