//! Spatial primitives: the projected plane and the box index built on it.

mod index;
pub mod mercator;

pub use index::{IndexedEntry, SpatialIndex};
