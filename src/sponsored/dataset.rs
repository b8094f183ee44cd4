use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use geo::Coord;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::{AddressMatcher, DatasetError, MatchScore, ReverseGeocoder, SponsoredObject};
use crate::config::MatchingConfig;
use crate::models::{GeoPoint, MapFeature};
use crate::spatial::{mercator, SpatialIndex};

/// Farthest a map feature may be from a sponsored object to match it
pub const DISTANCE_LIMIT_METERS: f64 = 150.0;

/// Nearest candidates considered per map feature
pub const MAX_SELECTED_ELEMENTS: usize = 3;

/// Counters from one [`SponsoredDataset::match_features`] run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MatchStats {
    pub features: usize,
    pub matched: usize,
    pub synthesized: usize,
}

/// Loaded sponsored objects with a read-only spatial index over them.
///
/// Objects are keyed by id in a `BTreeMap`, so every traversal is in id
/// order regardless of the order records appeared in the source.
pub struct SponsoredDataset<O: SponsoredObject> {
    objects: BTreeMap<O::Id, O>,
    index: SpatialIndex<O::Id>,
    config: MatchingConfig,
}

impl<O: SponsoredObject> SponsoredDataset<O> {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        geocoder: Option<&dyn ReverseGeocoder>,
        config: MatchingConfig,
    ) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        info!("Loading sponsored dataset from {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), geocoder, config)
    }

    /// Parse every record, enrich addresses and build the index.
    ///
    /// Any malformed line fails the whole load.
    pub fn from_reader<R: BufRead>(
        reader: R,
        geocoder: Option<&dyn ReverseGeocoder>,
        config: MatchingConfig,
    ) -> Result<Self, DatasetError> {
        let mut objects = BTreeMap::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }

            let object =
                O::from_tsv(&line).map_err(|source| DatasetError::Record { line: line_no, source })?;
            let id = object.id();
            if objects.insert(id, object).is_some() {
                return Err(DatasetError::DuplicateId {
                    line: line_no,
                    id: id.to_string(),
                });
            }
        }

        info!("Loaded {} sponsored objects", objects.len());

        if let Some(geocoder) = geocoder {
            let matcher = AddressMatcher::new(geocoder);
            let enriched: usize = objects
                .par_iter_mut()
                .filter(|(_, object)| object.enriched_address().is_none())
                .map(|(_, object)| usize::from(matcher.apply(object)))
                .sum();
            info!("Enriched {} of {} objects with street addresses", enriched, objects.len());
        }

        let entries = objects
            .values()
            .map(|o| (mercator::point_rect(mercator::from_lat_lon(o.lat_lon())), o.id()))
            .collect();
        let index = SpatialIndex::build(entries);

        Ok(Self {
            objects,
            index,
            config,
        })
    }

    pub fn size(&self) -> usize {
        self.objects.len()
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn get_object_by_id(&self, id: O::Id) -> Option<&O> {
        self.objects.get(&id)
    }

    /// Objects in id order
    pub fn iter(&self) -> impl Iterator<Item = &O> {
        self.objects.values()
    }

    /// Up to `limit` object ids nearest to `lat_lon`, ordered by great-circle
    /// distance and then id. `max_distance` is in metres, `0` means no limit.
    pub fn get_nearest_objects(&self, lat_lon: GeoPoint, limit: usize, max_distance: f64) -> Vec<O::Id> {
        let center = mercator::from_lat_lon(lat_lon);
        let bounded = max_distance > 0.0;
        let planar_limit = bounded.then(|| planar_radius(center, max_distance));

        let mut candidates: Vec<(f64, O::Id)> = self
            .index
            .query_nearest(center, limit, planar_limit)
            .into_iter()
            .filter_map(|id| {
                let object = self.objects.get(&id)?;
                let distance = mercator::distance_on_earth(lat_lon, object.lat_lon());
                (!bounded || distance <= max_distance).then_some((distance, id))
            })
            .collect();

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        candidates.into_iter().map(|(_, id)| id).collect()
    }

    pub fn necessary_matching_condition_holds(&self, feature: &MapFeature) -> bool {
        O::necessary_matching_condition_holds(feature)
    }

    /// Id of the sponsored object `feature` represents, if any
    pub fn find_matching_object_id(&self, feature: &MapFeature) -> Option<O::Id> {
        if !self.necessary_matching_condition_holds(feature) {
            return None;
        }

        let limit = self.config.distance_limit_meters;
        self.get_nearest_objects(feature.center, self.config.max_selected_elements, limit)
            .into_iter()
            .find(|id| {
                let Some(object) = self.objects.get(id) else {
                    return false;
                };
                let distance = mercator::distance_on_earth(feature.center, object.lat_lon());
                let score = MatchScore::new(distance, limit, object.name(), feature);
                debug!(
                    "Candidate {} for feature {}: distance {:.1}m, score {:.3}",
                    id,
                    feature.id,
                    distance,
                    score.linear_combination()
                );
                object.is_match(feature, &score, self.config.score_threshold)
            })
    }

    /// Merge object `id` into a copy of `feature` and emit it.
    ///
    /// An unknown id emits the feature untouched.
    pub fn preprocess_matched_osm_object<F>(&self, id: O::Id, mut feature: MapFeature, emit: F)
    where
        F: FnOnce(MapFeature),
    {
        match self.objects.get(&id) {
            Some(object) => object.merge_into(&mut feature),
            None => warn!("No sponsored object with id {}", id),
        }
        emit(feature);
    }

    /// Emit one synthesized feature per stored object, in id order
    pub fn build_osm_objects<F>(&self, mut emit: F)
    where
        F: FnMut(MapFeature),
    {
        for object in self.objects.values() {
            emit(object.build_feature());
        }
    }

    /// Pass map features through, merging matched objects into them, then
    /// synthesize features for every object nothing matched.
    pub fn match_features<I, F>(&self, features: I, mut emit: F) -> MatchStats
    where
        I: IntoIterator<Item = MapFeature>,
        F: FnMut(MapFeature),
    {
        let mut stats = MatchStats::default();
        let mut matched: BTreeSet<O::Id> = BTreeSet::new();

        for feature in features {
            stats.features += 1;
            match self.find_matching_object_id(&feature) {
                Some(id) => {
                    stats.matched += 1;
                    matched.insert(id);
                    self.preprocess_matched_osm_object(id, feature, &mut emit);
                }
                None => emit(feature),
            }
        }

        for object in self.objects.values().filter(|o| !matched.contains(&o.id())) {
            stats.synthesized += 1;
            emit(object.build_feature());
        }

        info!(
            "Matched {} of {} features, synthesized {} features",
            stats.matched, stats.features, stats.synthesized
        );
        stats
    }
}

/// Planar distance covering `metres` around `center` in every direction
fn planar_radius(center: Coord<f64>, metres: f64) -> f64 {
    let rect = mercator::rect_by_center_and_size_in_meters(center, metres);
    let dx = (rect.max().x - center.x).max(center.x - rect.min().x);
    let dy = (rect.max().y - center.y).max(center.y - rect.min().y);
    dx.hypot(dy)
}
