//! Proximity and name-similarity scoring for sponsored matches.

use strsim::jaro_winkler;

use crate::models::MapFeature;

/// Weight of the proximity component
pub const DISTANCE_WEIGHT: f64 = 0.4;

/// Weight of the name similarity component
pub const NAME_WEIGHT: f64 = 0.6;

/// Score of one sponsored object against one map feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    /// 1.0 at the feature, 0.0 at the distance limit
    pub distance_score: f64,
    /// Best Jaro-Winkler similarity across the feature's names
    pub name_similarity: f64,
}

impl MatchScore {
    pub fn new(distance_m: f64, distance_limit_m: f64, object_name: &str, feature: &MapFeature) -> Self {
        Self {
            distance_score: linear_norm_distance_score(distance_m, distance_limit_m),
            name_similarity: best_name_similarity(object_name, feature),
        }
    }

    pub fn linear_combination(&self) -> f64 {
        DISTANCE_WEIGHT * self.distance_score + NAME_WEIGHT * self.name_similarity
    }

    pub fn is_matched(&self, threshold: f64) -> bool {
        self.linear_combination() > threshold
    }
}

pub fn linear_norm_distance_score(distance_m: f64, distance_limit_m: f64) -> f64 {
    if distance_limit_m <= 0.0 {
        return 0.0;
    }
    (1.0 - distance_m / distance_limit_m).clamp(0.0, 1.0)
}

/// Lowercase, drop punctuation and collapse whitespace
fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    jaro_winkler(&a, &b)
}

pub fn best_name_similarity(object_name: &str, feature: &MapFeature) -> f64 {
    feature
        .name
        .values()
        .map(|n| name_similarity(object_name, n))
        .fold(0.0, f64::max)
}
