//! Tag and object type distributions of map-dataset addresses.

use std::collections::BTreeMap;

use crate::models::{Address, OsmType};

/// How many addresses carry each `addr:*` / `source:addr` key, most common first
pub fn addr_tags_distribution(addresses: &[Address]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tags in addresses.iter().filter_map(|a| a.osm.as_ref().map(|o| &o.tags)) {
        for key in tags.keys() {
            if key.starts_with("addr:") || key == "source:addr" {
                *counts.entry(key.as_str()).or_default() += 1;
            }
        }
    }

    most_common(counts.into_iter().map(|(k, v)| (k.to_string(), v)))
}

/// How many addresses come from nodes, ways and relations, most common first
pub fn osm_type_distribution(addresses: &[Address]) -> Vec<(OsmType, usize)> {
    let mut counts: BTreeMap<OsmType, usize> = BTreeMap::new();
    for osm in addresses.iter().filter_map(|a| a.osm.as_ref()) {
        *counts.entry(osm.osm_type).or_default() += 1;
    }

    most_common(counts.into_iter())
}

fn most_common<K: Ord>(counts: impl Iterator<Item = (K, usize)>) -> Vec<(K, usize)> {
    let mut sorted: Vec<_> = counts.collect();
    // stable: ties keep key order
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    sorted
}

pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// `part/total (pct%)`
pub fn format_ratio(part: usize, total: usize) -> String {
    format!("{}/{} ({:.2}%)", part, total, percent(part, total))
}

/// One `key: count (pct%)` line per entry
pub fn format_distribution<K: std::fmt::Display>(dist: &[(K, usize)], total: usize) -> String {
    dist.iter()
        .map(|(k, v)| format!("{}: {} ({:.2}%)", k, v, percent(*v, total)))
        .collect::<Vec<_>>()
        .join("\n")
}
