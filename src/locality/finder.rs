use geo::Rect;
use tracing::{debug, info};

use super::cache::{Cache, CacheLoader};
use super::source::MapDataSource;
use super::{LocalityError, MAX_CACHE_TMP_COUNT, MAX_RADIUS_CITY, MAX_VIEWPORT_COUNT};
use crate::config::LocalityConfig;
use crate::models::{GeoPoint, LocalityClassifier, DEFAULT_LANG};
use crate::spatial::mercator;

/// Point-to-locality resolver over a bank of viewport caches and a bank of
/// temporary caches.
///
/// Viewport caches are rebuilt only when the caller moves a viewport.
/// Temporary caches are built on demand around query points, evicting the
/// least used one.
pub struct LocalityFinder<S: MapDataSource> {
    source: S,
    classifier: LocalityClassifier,
    lang: String,
    max_city_radius: f64,
    viewports: Vec<Cache>,
    tmp: Vec<Cache>,
    rebuilds: usize,
}

impl<S: MapDataSource> LocalityFinder<S> {
    pub fn new(source: S, classifier: LocalityClassifier) -> Self {
        Self::with_counts(source, classifier, MAX_VIEWPORT_COUNT, MAX_CACHE_TMP_COUNT)
    }

    pub fn with_counts(source: S, classifier: LocalityClassifier, viewport_count: usize, tmp_count: usize) -> Self {
        Self {
            source,
            classifier,
            lang: DEFAULT_LANG.to_string(),
            max_city_radius: MAX_RADIUS_CITY,
            viewports: (0..viewport_count).map(|_| Cache::new()).collect(),
            tmp: (0..tmp_count).map(|_| Cache::new()).collect(),
            rebuilds: 0,
        }
    }

    pub fn from_config(source: S, classifier: LocalityClassifier, config: &LocalityConfig) -> Self {
        let mut finder = Self::with_counts(source, classifier, config.viewport_count, config.tmp_cache_count);
        finder.max_city_radius = config.max_city_radius_meters;
        finder.set_language(&config.language);
        finder
    }

    /// Preferred name language. Takes effect on the next rebuild.
    pub fn set_language(&mut self, lang: &str) {
        self.lang = if lang.is_empty() {
            DEFAULT_LANG.to_string()
        } else {
            lang.to_string()
        };
    }

    pub fn language(&self) -> &str {
        &self.lang
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn viewport_count(&self) -> usize {
        self.viewports.len()
    }

    pub fn tmp_cache_count(&self) -> usize {
        self.tmp.len()
    }

    pub fn viewport_cache(&self, idx: usize) -> Option<&Cache> {
        self.viewports.get(idx)
    }

    pub fn tmp_cache(&self, idx: usize) -> Option<&Cache> {
        self.tmp.get(idx)
    }

    /// Number of cache rebuilds performed so far
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    fn check_viewport(&self, idx: usize) -> Result<(), LocalityError> {
        if idx < self.viewports.len() {
            Ok(())
        } else {
            Err(LocalityError::ViewportIndex {
                index: idx,
                count: self.viewports.len(),
            })
        }
    }

    /// Rebuild viewport cache `idx` to cover `rect`
    pub fn set_viewport_by_index(&mut self, rect: Rect<f64>, idx: usize) -> Result<(), LocalityError> {
        self.check_viewport(idx)?;

        let loader = CacheLoader::new(&self.source, &self.classifier, &self.lang, self.max_city_radius);
        let items = loader.recreate_cache(&mut self.viewports[idx], rect);
        self.rebuilds += 1;

        info!("Viewport {} now holds {} localities", idx, items);
        Ok(())
    }

    /// Resolve `point` against the viewport caches, first hit wins
    pub fn get_locality_in_viewport(&mut self, point: GeoPoint) -> Option<String> {
        let point = mercator::from_lat_lon(point);
        self.viewports
            .iter_mut()
            .find_map(|cache| cache.get_locality(point))
    }

    /// Resolve `point` against the temporary caches, rebuilding the least
    /// used one around the point when none of them knows it.
    pub fn get_locality_create_cache(&mut self, point: GeoPoint) -> Option<String> {
        let point = mercator::from_lat_lon(point);

        let mut min_usage_idx = 0;
        let mut min_usage = u64::MAX;
        for (idx, cache) in self.tmp.iter_mut().enumerate() {
            if let Some(name) = cache.get_locality(point) {
                return Some(name);
            }
            if cache.usage() < min_usage {
                min_usage = cache.usage();
                min_usage_idx = idx;
            }
        }

        let cache = self.tmp.get_mut(min_usage_idx)?;
        let rect = mercator::rect_by_center_and_size_in_meters(point, self.max_city_radius);
        let loader = CacheLoader::new(&self.source, &self.classifier, &self.lang, self.max_city_radius);
        let items = loader.recreate_cache(cache, rect);
        self.rebuilds += 1;
        debug!("Rebuilt temporary cache {} with {} localities", min_usage_idx, items);

        cache.get_locality(point)
    }

    /// Drop the contents of viewport cache `idx`
    pub fn clear_cache(&mut self, idx: usize) -> Result<(), LocalityError> {
        self.check_viewport(idx)?;
        self.viewports[idx].clear();
        Ok(())
    }

    pub fn clear_cache_all(&mut self) {
        for cache in self.viewports.iter_mut().chain(self.tmp.iter_mut()) {
            cache.clear();
        }
    }
}
