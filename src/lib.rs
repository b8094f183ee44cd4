//! poi-locality - sponsored POI matching and point-to-locality lookup
//!
//! This library provides the matching engine, the locality caches and the
//! shared map types used by the `poi-locality` binary.

pub mod config;
pub mod locality;
pub mod models;
pub mod spatial;
pub mod sponsored;

pub use config::Config;
pub use locality::LocalityFinder;
pub use models::{Address, GeoPoint, MapFeature};
pub use sponsored::{SponsoredDataset, SponsoredObject};
