//! addr-reconcile - compares a government address register with OSM addresses
//!
//! This library provides the address identity and matching engine, street
//! name normalization, and the source/report collaborators used by the
//! `reconcile` binary.

pub mod config;
pub mod error;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod report;
pub mod sources;

pub use config::{Config, MatchConfig};
pub use error::{ReconcileError, Result, SkipReason};
pub use models::{Address, Addressed, OsmObject, OsmType, Point};
