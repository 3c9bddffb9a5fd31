//! Address identity and set-based matching.
//!
//! Matching is purely by identity key; coordinates never take part.

pub mod diff;
pub mod duplicates;
pub mod key;
pub mod poi;

pub use diff::{diff_datasets, missing, DatasetDiff};
pub use duplicates::find_duplicates;
pub use key::identity_key;
pub use poi::{is_excluded_poi, is_poi, POI_KEYS};
