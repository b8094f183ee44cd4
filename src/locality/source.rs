//! Interface to the map data that localities are read from.

use geo::Rect;
use thiserror::Error;

use crate::models::MapFeature;

/// Header kind of a map data region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Low-detail data covering the whole planet
    World,
    Country,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionInfo {
    pub id: usize,
    pub name: String,
    pub kind: RegionKind,
    /// Most detailed scale stored in the region
    pub last_scale: u8,
}

/// Half-open range `[begin, end)` of spatially sorted cell ids
pub type CellInterval = (u64, u64);

#[derive(Debug, Error)]
pub enum MapDataError {
    #[error("unknown map region {0}")]
    UnknownRegion(usize),

    #[error("region {region}: cannot read cells {begin}..{end}: {reason}")]
    Interval {
        region: String,
        begin: u64,
        end: u64,
        reason: String,
    },

    #[error("failed to read map data: {0}")]
    Io(#[from] std::io::Error),

    #[error("map data line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Map data collaborator consumed by locality caches
pub trait MapDataSource {
    fn regions(&self) -> Vec<RegionInfo>;

    /// Cell intervals that together cover `rect` at `scale`
    fn covering_intervals(&self, rect: &Rect<f64>, scale: u8) -> Vec<CellInterval>;

    /// Visit the features of `region` stored in `interval` at `scale`
    fn for_each_feature(
        &self,
        region: &RegionInfo,
        interval: CellInterval,
        scale: u8,
        visit: &mut dyn FnMut(&MapFeature),
    ) -> Result<(), MapDataError>;
}
