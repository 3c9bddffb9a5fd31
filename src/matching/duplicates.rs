use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use tracing::debug;

use super::poi::is_excluded_poi;
use crate::config::MatchConfig;
use crate::models::Addressed;

/// Group addresses sharing an identity key and return the groups with more
/// than one member.
///
/// Groups come out in the order their first member appeared; members keep
/// their input order. With `exclude_poi` set, bare POI objects are left out
/// before grouping.
pub fn find_duplicates<'a, T: Addressed>(addresses: &'a [T], config: &MatchConfig) -> Vec<Vec<&'a T>> {
    let mut group_index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<&T>> = Vec::new();
    let mut excluded = 0usize;

    for addr in addresses {
        if config.exclude_poi && addr.osm_tags().map_or(false, is_excluded_poi) {
            excluded += 1;
            continue;
        }

        match group_index.entry(addr.identity_key(config)) {
            Entry::Occupied(entry) => groups[*entry.get()].push(addr),
            Entry::Vacant(entry) => {
                entry.insert(groups.len());
                groups.push(vec![addr]);
            }
        }
    }

    if excluded > 0 {
        debug!("Excluded {} POI objects from duplicate detection", excluded);
    }

    groups.retain(|group| group.len() > 1);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, OsmObject, OsmType, Point, Tags};

    fn osm_addr(id: i64, street: &str, housenumber: &str, extra: &[(&str, &str)]) -> Address {
        let tags: Tags = extra
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Address::new("Wola", Some(street), housenumber, Point::new(52.0, 21.0))
            .with_osm(OsmObject::new(OsmType::Node, id, tags))
    }

    fn ids(group: &[&Address]) -> Vec<i64> {
        group.iter().map(|a| a.osm.as_ref().unwrap().osm_id).collect()
    }

    #[test]
    fn test_single_group_in_input_order() {
        let addresses = vec![
            osm_addr(1, "Polna", "1", &[]),
            osm_addr(2, "Polna", "1", &[]),
            osm_addr(3, "Polna", "2", &[]),
            osm_addr(4, "Polna", "1", &[]),
        ];

        let groups = find_duplicates(&addresses, &MatchConfig::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&groups[0]), vec![1, 2, 4]);
    }

    #[test]
    fn test_groups_ordered_by_first_occurrence() {
        let addresses = vec![
            osm_addr(1, "Lipowa", "3", &[]),
            osm_addr(2, "Polna", "1", &[]),
            osm_addr(3, "Polna", "1", &[]),
            osm_addr(4, "Lipowa", "3", &[]),
        ];

        let groups = find_duplicates(&addresses, &MatchConfig::default());
        assert_eq!(groups.len(), 2);
        assert_eq!(ids(&groups[0]), vec![1, 4]);
        assert_eq!(ids(&groups[1]), vec![2, 3]);
    }

    #[test]
    fn test_no_duplicates_is_empty() {
        let addresses = vec![osm_addr(1, "Polna", "1", &[]), osm_addr(2, "Polna", "2", &[])];
        assert!(find_duplicates(&addresses, &MatchConfig::default()).is_empty());
        assert!(find_duplicates::<Address>(&[], &MatchConfig::default()).is_empty());
    }

    #[test]
    fn test_case_insensitive_housenumber_groups() {
        let addresses = vec![osm_addr(1, "Polna", "12A", &[]), osm_addr(2, "Polna", "12a", &[])];

        assert!(find_duplicates(&addresses, &MatchConfig::default()).is_empty());

        let config = MatchConfig {
            case_insensitive_housenumber: true,
            ..Default::default()
        };
        assert_eq!(find_duplicates(&addresses, &config).len(), 1);
    }

    #[test]
    fn test_bare_poi_excluded_when_enabled() {
        let addresses = vec![
            osm_addr(1, "Polna", "1", &[("building", "house")]),
            osm_addr(2, "Polna", "1", &[("shop", "bakery")]),
        ];

        let without_filter = find_duplicates(&addresses, &MatchConfig::default());
        assert_eq!(without_filter.len(), 1);

        let config = MatchConfig {
            exclude_poi: true,
            ..Default::default()
        };
        assert!(find_duplicates(&addresses, &config).is_empty());
    }

    #[test]
    fn test_poi_with_building_still_counts() {
        let addresses = vec![
            osm_addr(1, "Polna", "1", &[("building", "house")]),
            osm_addr(2, "Polna", "1", &[("shop", "bakery"), ("building", "yes")]),
        ];

        let config = MatchConfig {
            exclude_poi: true,
            ..Default::default()
        };
        let groups = find_duplicates(&addresses, &config);
        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&groups[0]), vec![1, 2]);
    }
}
