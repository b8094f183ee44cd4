use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::locality::{MAX_CACHE_TMP_COUNT, MAX_RADIUS_CITY, MAX_VIEWPORT_COUNT};
use crate::models::DEFAULT_LANG;
use crate::sponsored::{AddressIndex, DISTANCE_LIMIT_METERS, MAX_SELECTED_ELEMENTS};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub matching: MatchingConfig,
    pub locality: LocalityConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MatchingConfig {
    pub distance_limit_meters: f64,
    pub max_selected_elements: usize,
    /// Minimum combined proximity/name score for a candidate to match
    pub score_threshold: f64,
    pub address_lookup_radius_meters: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            distance_limit_meters: DISTANCE_LIMIT_METERS,
            max_selected_elements: MAX_SELECTED_ELEMENTS,
            score_threshold: 0.5,
            address_lookup_radius_meters: AddressIndex::DEFAULT_LOOKUP_RADIUS_METERS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LocalityConfig {
    pub viewport_count: usize,
    pub tmp_cache_count: usize,
    pub max_city_radius_meters: f64,
    /// Preferred name language, falling back to the default name
    pub language: String,
}

impl Default for LocalityConfig {
    fn default() -> Self {
        Self {
            viewport_count: MAX_VIEWPORT_COUNT,
            tmp_cache_count: MAX_CACHE_TMP_COUNT,
            max_city_radius_meters: MAX_RADIUS_CITY,
            language: DEFAULT_LANG.to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.matching.distance_limit_meters, 150.0);
        assert_eq!(config.matching.max_selected_elements, 3);
        assert_eq!(config.locality.max_city_radius_meters, 30_000.0);
        assert!(config.locality.tmp_cache_count < config.locality.viewport_count);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [matching]
            score_threshold = 0.7

            [locality]
            language = "de"
            "#,
        )
        .unwrap();

        assert_eq!(config.matching.score_threshold, 0.7);
        assert_eq!(config.matching.max_selected_elements, 3);
        assert_eq!(config.locality.language, "de");
        assert_eq!(config.locality.viewport_count, MAX_VIEWPORT_COUNT);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml_str("[matching\nscore_threshold = ").is_err());
    }
}
