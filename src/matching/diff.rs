use hashbrown::HashSet;

use crate::config::MatchConfig;
use crate::models::Addressed;

/// Entries of `candidates` whose identity key appears nowhere in `present`,
/// in `candidates` order.
///
/// This is a set difference by key: one matching entry in `present` is enough
/// to drop a candidate, however many candidates share that key.
pub fn missing<'a, P, C>(present: &[P], candidates: &'a [C], config: &MatchConfig) -> Vec<&'a C>
where
    P: Addressed,
    C: Addressed,
{
    let keys: HashSet<String> = present.iter().map(|a| a.identity_key(config)).collect();

    candidates
        .iter()
        .filter(|c| !keys.contains(&c.identity_key(config)))
        .collect()
}

/// Missing and excess addresses between the reference and map datasets.
#[derive(Debug)]
pub struct DatasetDiff<'a, R, M> {
    /// Reference addresses absent from the map dataset
    pub missing: Vec<&'a R>,
    /// Map addresses absent from the reference dataset
    pub excess: Vec<&'a M>,
}

pub fn diff_datasets<'a, R, M>(
    reference: &'a [R],
    map: &'a [M],
    config: &MatchConfig,
) -> DatasetDiff<'a, R, M>
where
    R: Addressed,
    M: Addressed,
{
    DatasetDiff {
        missing: missing(map, reference, config),
        excess: missing(reference, map, config),
    }
}
