//! Core data models for address reconciliation.

pub mod address;
pub mod osm;

pub use address::{Address, Addressed, Point};
pub use osm::{OsmObject, OsmType, Tags};
