//! Point-to-locality resolution.
//!
//! Cities and towns are read from world-scale map data into bounded caches.
//! Each cache covers one rect and answers "which settlement is this point
//! in" by weighing distance against population.

mod cache;
mod finder;
mod memory;
mod population;
mod source;

pub use cache::{expand_rect, Cache, CacheLoader, LocalityItem};
pub use finder::LocalityFinder;
pub use memory::{InMemoryMapData, WORLD_LAST_SCALE};
pub use population::{population_by_radius, radius_by_population};
pub use source::{CellInterval, MapDataError, MapDataSource, RegionInfo, RegionKind};

use thiserror::Error;

/// Distance in metres a city may cover; also the size of temporary caches
pub const MAX_RADIUS_CITY: f64 = 30_000.0;

pub const MAX_VIEWPORT_COUNT: usize = 3;

pub const MAX_CACHE_TMP_COUNT: usize = 2;

#[derive(Debug, Error)]
pub enum LocalityError {
    #[error("viewport index {index} out of range (have {count})")]
    ViewportIndex { index: usize, count: usize },
}
