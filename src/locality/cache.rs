//! Locality caches and the scan that fills them.

use geo::{coord, Coord, Intersects, Rect};
use hashbrown::HashSet;
use tracing::{debug, warn};

use super::population::{population_by_radius, radius_by_population};
use super::source::{MapDataSource, RegionKind};
use crate::models::{GeoPoint, LocalityClassifier, MapFeature};
use crate::spatial::{mercator, SpatialIndex};

/// A city or town with the rect its population covers
#[derive(Debug, Clone, PartialEq)]
pub struct LocalityItem {
    pub rect: Rect<f64>,
    pub center: GeoPoint,
    pub name: String,
    pub population: u32,
    /// Source feature id
    pub id: u64,
}

/// Localities covering one rectangular region
#[derive(Default)]
pub struct Cache {
    rect: Option<Rect<f64>>,
    tree: SpatialIndex<LocalityItem>,
    loaded: HashSet<u64>,
    usage: u64,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every item and forget the covered rect. A cleared cache covers
    /// nothing, so later queries inside its old rect are not counted as uses.
    pub fn clear(&mut self) {
        self.rect = None;
        self.tree.clear();
        self.loaded.clear();
        self.usage = 0;
    }

    pub fn rect(&self) -> Option<Rect<f64>> {
        self.rect
    }

    /// Number of queries this cache has served since the last rebuild
    pub fn usage(&self) -> u64 {
        self.usage
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn covers(&self, point: Coord<f64>) -> bool {
        self.rect.is_some_and(|r| r.intersects(&point))
    }

    pub fn is_loaded(&self, id: u64) -> bool {
        self.loaded.contains(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &LocalityItem> {
        self.tree.iter().map(|e| &e.value)
    }

    /// Insert unless the source feature is already present
    fn insert(&mut self, item: LocalityItem) -> bool {
        if !self.loaded.insert(item.id) {
            return false;
        }
        self.tree.insert(item.rect, item);
        true
    }

    /// Name of the locality best describing `point`.
    ///
    /// Among localities whose rect contains the point, the one with the
    /// smallest `population_by_radius(distance) / population` wins. Points
    /// outside the cache never count as a use.
    pub fn get_locality(&mut self, point: Coord<f64>) -> Option<String> {
        if !self.covers(point) {
            return None;
        }
        self.usage += 1;

        let target = mercator::to_lat_lon(point);
        self.tree
            .query_point(point)
            .map(|entry| {
                let item = &entry.value;
                let distance = mercator::distance_on_earth(item.center, target);
                (population_by_radius(distance) / f64::from(item.population), item)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)))
            .map(|(_, item)| item.name.clone())
    }
}

/// Expand `rect` by `metres` around its corners, clamped to the plane
pub fn expand_rect(rect: Rect<f64>, metres: f64) -> Rect<f64> {
    let left_top = mercator::rect_by_center_and_size_in_meters(
        coord! { x: rect.min().x, y: rect.max().y },
        metres,
    );
    let right_bottom = mercator::rect_by_center_and_size_in_meters(
        coord! { x: rect.max().x, y: rect.min().y },
        metres,
    );

    Rect::new(
        coord! {
            x: mercator::clamp_x(left_top.min().x),
            y: mercator::clamp_y(right_bottom.min().y),
        },
        coord! {
            x: mercator::clamp_x(right_bottom.max().x),
            y: mercator::clamp_y(left_top.max().y),
        },
    )
}

/// Fills caches from world map data
pub struct CacheLoader<'a, S: ?Sized> {
    source: &'a S,
    classifier: &'a LocalityClassifier,
    lang: &'a str,
    max_city_radius: f64,
}

impl<'a, S: MapDataSource + ?Sized> CacheLoader<'a, S> {
    pub fn new(source: &'a S, classifier: &'a LocalityClassifier, lang: &'a str, max_city_radius: f64) -> Self {
        Self {
            source,
            classifier,
            lang,
            max_city_radius,
        }
    }

    /// Rebuild `cache` with the cities and towns that may cover `rect`.
    ///
    /// Non-world regions and unreadable intervals are skipped; the cache
    /// keeps whatever was loaded. Returns the number of items.
    pub fn recreate_cache(&self, cache: &mut Cache, rect: Rect<f64>) -> usize {
        cache.clear();
        let area = expand_rect(rect, self.max_city_radius);

        for region in self.source.regions() {
            if region.kind != RegionKind::World {
                debug!("Skipping non-world region {}", region.name);
                continue;
            }

            let scale = region.last_scale;
            for interval in self.source.covering_intervals(&area, scale) {
                let result = self.source.for_each_feature(&region, interval, scale, &mut |feature| {
                    self.load_feature(cache, feature, &area);
                });
                if let Err(err) = result {
                    warn!("Skipping map data: {}", err);
                }
            }
        }

        cache.rect = Some(rect);
        debug!("Locality cache rebuilt with {} items", cache.len());
        cache.len()
    }

    fn load_feature(&self, cache: &mut Cache, feature: &MapFeature, area: &Rect<f64>) {
        if !feature.is_point() {
            return;
        }
        if !self
            .classifier
            .classify(feature)
            .is_some_and(|kind| kind.is_city_or_town())
        {
            return;
        }
        if cache.is_loaded(feature.id) {
            return;
        }

        let population = feature.population();
        if population == 0 {
            return;
        }

        let radius = radius_by_population(population);
        let rect = mercator::metres_to_xy(feature.center, radius, radius);
        if !rect.intersects(area) {
            return;
        }

        let Some(name) = feature.get_name(self.lang).or_else(|| feature.default_name()) else {
            return;
        };

        cache.insert(LocalityItem {
            rect,
            center: feature.center,
            name: name.to_string(),
            population,
            id: feature.id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locality::source::{CellInterval, MapDataError, RegionInfo};
    use crate::locality::MAX_RADIUS_CITY;
    use crate::models::POPULATION_KEY;

    const M_PER_DEG: f64 = 111_195.0;

    fn place(id: u64, kind: &str, lat: f64, lon: f64, population: u32, name: &str) -> MapFeature {
        let mut feature = MapFeature::point(id, GeoPoint::new(lat, lon));
        feature.add_category("place", kind);
        feature.set_metadata(POPULATION_KEY, population.to_string());
        if !name.is_empty() {
            feature.add_name("default", name);
        }
        feature
    }

    /// Hands every feature out for every interval; intervals overlap
    struct FakeSource {
        regions: Vec<RegionInfo>,
        features: Vec<MapFeature>,
        failing: Option<CellInterval>,
    }

    impl FakeSource {
        fn world(features: Vec<MapFeature>) -> Self {
            Self {
                regions: vec![RegionInfo {
                    id: 0,
                    name: "World".to_string(),
                    kind: RegionKind::World,
                    last_scale: 9,
                }],
                features,
                failing: None,
            }
        }
    }

    impl MapDataSource for FakeSource {
        fn regions(&self) -> Vec<RegionInfo> {
            self.regions.clone()
        }

        fn covering_intervals(&self, _rect: &Rect<f64>, _scale: u8) -> Vec<CellInterval> {
            vec![(0, 10), (5, 15), (10, 20)]
        }

        fn for_each_feature(
            &self,
            region: &RegionInfo,
            interval: CellInterval,
            _scale: u8,
            visit: &mut dyn FnMut(&MapFeature),
        ) -> Result<(), MapDataError> {
            if self.failing == Some(interval) {
                return Err(MapDataError::Interval {
                    region: region.name.clone(),
                    begin: interval.0,
                    end: interval.1,
                    reason: "truncated".to_string(),
                });
            }
            for feature in &self.features {
                visit(feature);
            }
            Ok(())
        }
    }

    fn around(lat: f64, lon: f64) -> Rect<f64> {
        let center = mercator::from_lat_lon(GeoPoint::new(lat, lon));
        mercator::rect_by_center_and_size_in_meters(center, 5_000.0)
    }

    fn rebuild(source: &FakeSource, rect: Rect<f64>) -> Cache {
        let classifier = LocalityClassifier::default();
        let loader = CacheLoader::new(source, &classifier, "default", MAX_RADIUS_CITY);
        let mut cache = Cache::new();
        loader.recreate_cache(&mut cache, rect);
        cache
    }

    #[test]
    fn test_overlapping_intervals_load_once() {
        let source = FakeSource::world(vec![
            place(1, "city", 0.0, 0.0, 100_000, "Alpha"),
            place(2, "town", 0.0, 0.05, 8_000, "Beta"),
        ]);
        let cache = rebuild(&source, around(0.0, 0.0));

        assert_eq!(cache.len(), 2);
        let mut ids: Vec<u64> = cache.items().map(|i| i.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_filters() {
        let mut line = place(10, "city", 0.0, 0.0, 50_000, "Line");
        line.geometry = crate::models::GeomType::Line;

        let source = FakeSource::world(vec![
            line,
            place(11, "village", 0.0, 0.0, 50_000, "Village"),
            place(12, "city", 0.0, 0.0, 0, "Empty"),
            place(13, "city", 0.0, 0.0, 50_000, ""),
            place(14, "city", 40.0, 40.0, 50_000, "Far"),
            place(15, "town", 0.0, 0.01, 50_000, "Kept"),
        ]);
        let cache = rebuild(&source, around(0.0, 0.0));

        let names: Vec<&str> = cache.items().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Kept"]);
        assert_eq!(cache.usage(), 0);
    }

    #[test]
    fn test_preferred_language() {
        let mut feature = place(1, "city", 0.0, 0.0, 100_000, "Roma");
        feature.add_name("en", "Rome");
        let source = FakeSource::world(vec![feature]);

        let classifier = LocalityClassifier::default();
        let loader = CacheLoader::new(&source, &classifier, "en", MAX_RADIUS_CITY);
        let mut cache = Cache::new();
        loader.recreate_cache(&mut cache, around(0.0, 0.0));

        let point = mercator::from_lat_lon(GeoPoint::new(0.0, 0.0));
        assert_eq!(cache.get_locality(point).as_deref(), Some("Rome"));
    }

    #[test]
    fn test_outside_rect_yields_nothing() {
        let source = FakeSource::world(vec![place(1, "city", 0.0, 0.0, 1_000_000, "Big")]);
        let mut cache = rebuild(&source, around(0.0, 0.0));

        // Inside the city's covering rect but outside the cache rect
        let outside = mercator::from_lat_lon(GeoPoint::new(0.0, 10_000.0 / M_PER_DEG));
        assert_eq!(cache.get_locality(outside), None);
        assert_eq!(cache.usage(), 0);

        let inside = mercator::from_lat_lon(GeoPoint::new(0.0, 0.0));
        assert_eq!(cache.get_locality(inside).as_deref(), Some("Big"));
        assert_eq!(cache.usage(), 1);
    }

    #[test]
    fn test_town_beats_distant_city() {
        let source = FakeSource::world(vec![
            place(1, "city", 0.0, 0.0, 1_000_000, "Metropolis"),
            place(2, "town", 0.0, 18_000.0 / M_PER_DEG, 5_000, "Smallville"),
        ]);
        let query = GeoPoint::new(0.0, 20_000.0 / M_PER_DEG);
        let mut cache = rebuild(&source, around(query.lat, query.lon));

        let point = mercator::from_lat_lon(query);
        let containing = cache.tree.query_point(point).count();
        assert_eq!(containing, 2);
        assert_eq!(cache.get_locality(point).as_deref(), Some("Smallville"));
    }

    #[test]
    fn test_population_weighting_overrides_raw_distance() {
        // Town lies between the city and both query points
        let source = FakeSource::world(vec![
            place(1, "city", 0.0, 0.0, 1_000_000, "Metropolis"),
            place(2, "town", 0.0, 7_000.0 / M_PER_DEG, 5_000, "Smallville"),
        ]);
        let far = GeoPoint::new(0.0, 10_000.0 / M_PER_DEG);
        let near = GeoPoint::new(0.0, 6_000.0 / M_PER_DEG);
        let mut cache = rebuild(&source, around(0.0, 8_000.0 / M_PER_DEG));

        // 10 km from the city, 3 km from the town: the city still wins
        let far_xy = mercator::from_lat_lon(far);
        assert_eq!(cache.tree.query_point(far_xy).count(), 2);
        assert_eq!(cache.get_locality(far_xy).as_deref(), Some("Metropolis"));

        // 6 km from the city, 1 km from the town: the town wins
        let near_xy = mercator::from_lat_lon(near);
        assert_eq!(cache.tree.query_point(near_xy).count(), 2);
        assert_eq!(cache.get_locality(near_xy).as_deref(), Some("Smallville"));
    }

    #[test]
    fn test_non_world_and_failing_intervals_skipped() {
        let mut source = FakeSource::world(vec![place(1, "city", 0.0, 0.0, 100_000, "Alpha")]);
        source.regions.push(RegionInfo {
            id: 1,
            name: "Country".to_string(),
            kind: RegionKind::Country,
            last_scale: 17,
        });
        source.failing = Some((0, 10));

        let cache = rebuild(&source, around(0.0, 0.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failing_everything_leaves_empty_cache_with_rect() {
        let mut source = FakeSource::world(vec![place(1, "city", 0.0, 0.0, 100_000, "Alpha")]);
        source.regions[0].kind = RegionKind::Country;

        let mut cache = rebuild(&source, around(0.0, 0.0));
        assert!(cache.is_empty());
        assert!(cache.rect().is_some());
        assert_eq!(cache.get_locality(mercator::from_lat_lon(GeoPoint::new(0.0, 0.0))), None);
        assert_eq!(cache.usage(), 1);
    }

    #[test]
    fn test_clear_resets_state() {
        let source = FakeSource::world(vec![place(1, "city", 0.0, 0.0, 100_000, "Alpha")]);
        let mut cache = rebuild(&source, around(0.0, 0.0));
        cache.get_locality(mercator::from_lat_lon(GeoPoint::new(0.0, 0.0)));

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.rect().is_none());
        assert_eq!(cache.usage(), 0);
        assert!(!cache.is_loaded(1));
    }

    #[test]
    fn test_expand_rect_clamps() {
        let rect = Rect::new(coord! { x: 179.9, y: 0.0 }, coord! { x: 180.0, y: 1.0 });
        let expanded = expand_rect(rect, MAX_RADIUS_CITY);
        assert_eq!(expanded.max().x, mercator::MAX_X);
        assert!(expanded.min().x < 179.9);
        assert!(expanded.min().y < 0.0 && expanded.max().y > 1.0);
    }
}
