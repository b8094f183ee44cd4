//! Core data models shared by the matching and locality pipelines.

pub mod feature;
pub mod locality;

pub use feature::{Address, GeoPoint, GeomType, MapFeature, DEFAULT_LANG, POPULATION_KEY};
pub use locality::{LocalityClassifier, LocalityType};
