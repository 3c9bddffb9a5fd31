use std::collections::BTreeSet;
use tracing::info;

use super::{AltStreetNames, StreetLookup, StreetNameMappings};
use crate::models::Address;

/// Why a street was left as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSkip {
    NoStreet,
    UnknownLocality,
    NoMapping,
    AlreadyCanonical,
}

/// Result of normalizing a single address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreetOutcome {
    Replaced { from: String, to: String },
    Skipped(LookupSkip),
}

/// Distinct canonical names matched by each pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeSummary {
    pub mapping_matches: BTreeSet<String>,
    pub alt_name_matches: BTreeSet<String>,
    /// Addresses whose street actually changed, over both passes
    pub replaced: usize,
}

/// Applies the mappings table and then the alternative names table to
/// reference addresses.
///
/// The second pass sees the output of the first, so corrections can chain.
pub struct StreetNameNormalizer<'a> {
    mappings: &'a StreetNameMappings,
    alt_names: Option<&'a AltStreetNames>,
}

impl<'a> StreetNameNormalizer<'a> {
    pub fn new(mappings: &'a StreetNameMappings) -> Self {
        Self {
            mappings,
            alt_names: None,
        }
    }

    pub fn with_alt_names(mut self, alt_names: &'a AltStreetNames) -> Self {
        self.alt_names = Some(alt_names);
        self
    }

    /// Rewrite street names in place. Lookup misses are silent.
    pub fn normalize(&self, addresses: &mut [Address]) -> NormalizeSummary {
        let mut summary = NormalizeSummary::default();

        let (matched, replaced) = apply_pass(self.mappings, addresses);
        info!(
            "Matched and replaced {} streets to existing OSM street names",
            matched.len()
        );
        summary.mapping_matches = matched;
        summary.replaced += replaced;

        if let Some(alt_names) = self.alt_names {
            let (matched, replaced) = apply_pass(alt_names, addresses);
            info!(
                "Matched and replaced {} streets using OSM alternative street names",
                matched.len()
            );
            summary.alt_name_matches = matched;
            summary.replaced += replaced;
        }

        summary
    }
}

fn apply_pass<L: StreetLookup + ?Sized>(
    lookup: &L,
    addresses: &mut [Address],
) -> (BTreeSet<String>, usize) {
    let mut matched = BTreeSet::new();
    let mut replaced = 0;

    for addr in addresses.iter_mut() {
        match normalize_street(lookup, addr) {
            StreetOutcome::Replaced { to, .. } => {
                replaced += 1;
                matched.insert(to);
            }
            StreetOutcome::Skipped(LookupSkip::AlreadyCanonical) => {
                if let Some(street) = addr.street() {
                    matched.insert(street.to_string());
                }
            }
            StreetOutcome::Skipped(_) => {}
        }
    }

    (matched, replaced)
}

/// Look up one address's street and replace it with the canonical name.
pub fn normalize_street<L: StreetLookup + ?Sized>(lookup: &L, addr: &mut Address) -> StreetOutcome {
    let Some(street) = addr.street() else {
        return StreetOutcome::Skipped(LookupSkip::NoStreet);
    };

    let simc = addr.city_simc.as_deref();
    if !lookup.has_partition(simc) {
        return StreetOutcome::Skipped(LookupSkip::UnknownLocality);
    }

    let Some(canonical) = lookup.lookup(simc, street) else {
        return StreetOutcome::Skipped(LookupSkip::NoMapping);
    };

    if canonical == street {
        return StreetOutcome::Skipped(LookupSkip::AlreadyCanonical);
    }

    let outcome = StreetOutcome::Replaced {
        from: street.to_string(),
        to: canonical.to_string(),
    };
    addr.set_street(Some(canonical));
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point;

    fn reference(simc: &str, street: Option<&str>) -> Address {
        Address::new("Warszawa", street, "1", Point::new(52.2, 21.0)).with_simc(simc)
    }

    fn mappings() -> StreetNameMappings {
        let mut m = StreetNameMappings::new();
        m.insert("0001", "al marszalka", "aleja Marszałka");
        m
    }

    #[test]
    fn test_replaces_from_mappings() {
        let mappings = mappings();
        let mut addresses = vec![reference("0001", Some("Al Marszalka"))];

        let summary = StreetNameNormalizer::new(&mappings).normalize(&mut addresses);

        assert_eq!(addresses[0].street(), Some("aleja Marszałka"));
        assert_eq!(summary.replaced, 1);
        assert!(summary.mapping_matches.contains("aleja Marszałka"));
    }

    #[test]
    fn test_unknown_locality_untouched() {
        let mappings = mappings();
        let mut addr = reference("0002", Some("Al Marszalka"));

        let outcome = normalize_street(&mappings, &mut addr);
        assert_eq!(outcome, StreetOutcome::Skipped(LookupSkip::UnknownLocality));
        assert_eq!(addr.street(), Some("Al Marszalka"));
    }

    #[test]
    fn test_skip_reasons() {
        let mappings = mappings();

        let mut no_street = reference("0001", None);
        assert_eq!(
            normalize_street(&mappings, &mut no_street),
            StreetOutcome::Skipped(LookupSkip::NoStreet)
        );

        let mut no_simc = Address::new("Warszawa", Some("Al Marszalka"), "1", Point::new(0.0, 0.0));
        assert_eq!(
            normalize_street(&mappings, &mut no_simc),
            StreetOutcome::Skipped(LookupSkip::UnknownLocality)
        );

        let mut unmapped = reference("0001", Some("Polna"));
        assert_eq!(
            normalize_street(&mappings, &mut unmapped),
            StreetOutcome::Skipped(LookupSkip::NoMapping)
        );
    }

    #[test]
    fn test_second_run_is_noop() {
        let mappings = mappings();
        let normalizer = StreetNameNormalizer::new(&mappings);
        let mut addresses = vec![
            reference("0001", Some("Al Marszalka")),
            reference("0001", Some("Polna")),
        ];

        normalizer.normalize(&mut addresses);
        let after_first = addresses.clone();

        let summary = normalizer.normalize(&mut addresses);
        assert_eq!(summary.replaced, 0);
        assert_eq!(addresses, after_first);
    }

    #[test]
    fn test_alt_names_pass_chains_after_mappings() {
        let mut mappings = StreetNameMappings::new();
        mappings.insert("0001", "ks. popiełuszki", "Jerzego Popiełuszki");

        let mut alt_names = AltStreetNames::new();
        alt_names.insert("Jerzego Popiełuszki", "Księdza Jerzego Popiełuszki");
        alt_names.insert("Lipowa Stara", "Lipowa");

        let mut addresses = vec![
            reference("0001", Some("ks. Popiełuszki")),
            reference("0009", Some("lipowa stara")),
        ];

        let summary = StreetNameNormalizer::new(&mappings)
            .with_alt_names(&alt_names)
            .normalize(&mut addresses);

        assert_eq!(addresses[0].street(), Some("Księdza Jerzego Popiełuszki"));
        assert_eq!(addresses[1].street(), Some("Lipowa"));
        assert_eq!(summary.replaced, 3);
        assert_eq!(summary.mapping_matches.len(), 1);
        assert_eq!(summary.alt_name_matches.len(), 2);
    }

    #[test]
    fn test_empty_tables_change_nothing() {
        let mappings = StreetNameMappings::new();
        let mut addresses = vec![reference("0001", Some("Polna"))];

        let summary = StreetNameNormalizer::new(&mappings).normalize(&mut addresses);
        assert_eq!(summary, NormalizeSummary::default());
        assert_eq!(addresses[0].street(), Some("Polna"));
    }
}
