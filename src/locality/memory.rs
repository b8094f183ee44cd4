//! In-memory map data bucketed into a z-order cell grid.
//!
//! A region at scale `s` splits the projected plane into `2^s x 2^s` cells.
//! Cell ids interleave the column and row bits, so a coarse cell always maps
//! to one contiguous id range at any finer scale.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use geo::{Coord, Rect};
use tracing::info;

use super::source::{CellInterval, MapDataError, MapDataSource, RegionInfo, RegionKind};
use crate::models::MapFeature;
use crate::spatial::mercator;

/// Last scale of world-level data
pub const WORLD_LAST_SCALE: u8 = 9;

const MAX_SCALE: u8 = 20;

/// Coarsen the covering when a rect would span more cells than this
const MAX_COVERING_CELLS: u64 = 4096;

struct MemoryRegion {
    info: RegionInfo,
    /// Features sorted by their cell id at `info.last_scale`
    cells: Vec<(u64, MapFeature)>,
}

#[derive(Default)]
pub struct InMemoryMapData {
    regions: Vec<MemoryRegion>,
}

impl InMemoryMapData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single world region holding `features`
    pub fn world(features: Vec<MapFeature>) -> Self {
        let mut data = Self::new();
        data.add_region("World", RegionKind::World, WORLD_LAST_SCALE, features);
        data
    }

    pub fn add_region(&mut self, name: &str, kind: RegionKind, last_scale: u8, features: Vec<MapFeature>) {
        let last_scale = last_scale.min(MAX_SCALE);
        let mut cells: Vec<(u64, MapFeature)> = features
            .into_iter()
            .map(|f| (cell_id(mercator::from_lat_lon(f.center), last_scale), f))
            .collect();
        cells.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

        self.regions.push(MemoryRegion {
            info: RegionInfo {
                id: self.regions.len(),
                name: name.to_string(),
                kind,
                last_scale,
            },
            cells,
        });
    }

    /// World region from JSON lines of [`MapFeature`]
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, MapDataError> {
        let mut features = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let feature: MapFeature = serde_json::from_str(&line)
                .map_err(|source| MapDataError::Parse { line: idx + 1, source })?;
            features.push(feature);
        }
        info!("Loaded {} world features", features.len());
        Ok(Self::world(features))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, MapDataError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn feature_count(&self) -> usize {
        self.regions.iter().map(|r| r.cells.len()).sum()
    }
}

impl MapDataSource for InMemoryMapData {
    fn regions(&self) -> Vec<RegionInfo> {
        self.regions.iter().map(|r| r.info.clone()).collect()
    }

    fn covering_intervals(&self, rect: &Rect<f64>, scale: u8) -> Vec<CellInterval> {
        let scale = scale.min(MAX_SCALE);

        let mut level = scale;
        let (min, max) = loop {
            let min = cell_xy(rect.min(), level);
            let max = cell_xy(rect.max(), level);
            let count = (max.0 - min.0 + 1) * (max.1 - min.1 + 1);
            if count <= MAX_COVERING_CELLS || level == 0 {
                break (min, max);
            }
            level -= 1;
        };

        let mut ids: Vec<u64> = (min.0..=max.0)
            .flat_map(|x| (min.1..=max.1).map(move |y| interleave(x, y)))
            .collect();
        ids.sort_unstable();

        let shift = 2 * u32::from(scale - level);
        let mut intervals: Vec<CellInterval> = Vec::new();
        for id in ids {
            let (begin, end) = (id << shift, (id + 1) << shift);
            match intervals.last_mut() {
                Some(last) if last.1 == begin => last.1 = end,
                _ => intervals.push((begin, end)),
            }
        }
        intervals
    }

    fn for_each_feature(
        &self,
        region: &RegionInfo,
        interval: CellInterval,
        scale: u8,
        visit: &mut dyn FnMut(&MapFeature),
    ) -> Result<(), MapDataError> {
        let data = self
            .regions
            .get(region.id)
            .ok_or(MapDataError::UnknownRegion(region.id))?;
        let (begin, end) = interval;

        if scale.min(MAX_SCALE) == data.info.last_scale {
            let start = data.cells.partition_point(|(id, _)| *id < begin);
            let stop = data.cells.partition_point(|(id, _)| *id < end);
            for (_, feature) in &data.cells[start..stop] {
                visit(feature);
            }
        } else {
            let scale = scale.min(MAX_SCALE);
            for (_, feature) in &data.cells {
                let id = cell_id(mercator::from_lat_lon(feature.center), scale);
                if id >= begin && id < end {
                    visit(feature);
                }
            }
        }
        Ok(())
    }
}

fn cell_xy(point: Coord<f64>, scale: u8) -> (u64, u64) {
    let n = 1u64 << scale;
    let cell = |v: f64, min: f64, max: f64| -> u64 {
        let t = ((v - min) / (max - min) * n as f64).floor();
        (t.max(0.0) as u64).min(n - 1)
    };
    (
        cell(point.x, mercator::MIN_X, mercator::MAX_X),
        cell(point.y, mercator::MIN_Y, mercator::MAX_Y),
    )
}

fn cell_id(point: Coord<f64>, scale: u8) -> u64 {
    let (x, y) = cell_xy(point, scale);
    interleave(x, y)
}

/// Morton code: bit `i` of `x` goes to bit `2i`, of `y` to `2i + 1`
fn interleave(x: u64, y: u64) -> u64 {
    let mut id = 0;
    for bit in 0..u64::from(MAX_SCALE) {
        id |= ((x >> bit) & 1) << (2 * bit);
        id |= ((y >> bit) & 1) << (2 * bit + 1);
    }
    id
}
