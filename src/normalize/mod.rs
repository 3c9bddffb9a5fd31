//! Street name normalization.
//!
//! Rewrites reference-dataset street names to the spelling used in OSM
//! before addresses are compared.

pub mod alt_names;
pub mod mappings;
pub mod normalizer;
pub mod update;

pub use alt_names::{AltStreetNames, ALT_NAME_KEYS};
pub use mappings::StreetNameMappings;
pub use normalizer::{LookupSkip, NormalizeSummary, StreetNameNormalizer, StreetOutcome};
pub use update::{GithubFile, UpdateChecker, UpdateStatus};

/// Source of canonical street names.
pub trait StreetLookup {
    /// Canonical name for `street` in locality `simc`, if one is known
    fn lookup(&self, simc: Option<&str>, street: &str) -> Option<&str>;

    /// Whether the table holds any names for locality `simc`
    fn has_partition(&self, simc: Option<&str>) -> bool;
}
