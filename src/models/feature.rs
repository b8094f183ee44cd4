//! Map feature records exchanged with the map-data collaborators.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Language key for the untranslated name
pub const DEFAULT_LANG: &str = "default";

/// Metadata key carrying the population of a settlement
pub const POPULATION_KEY: &str = "population";

/// Geometry kind of a map feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeomType {
    Point,
    Line,
    Area,
}

impl std::fmt::Display for GeomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeomType::Point => write!(f, "point"),
            GeomType::Line => write!(f, "line"),
            GeomType::Area => write!(f, "area"),
        }
    }
}

/// Geographic point (lat/lon, degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Address components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub housenumber: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        self.housenumber.is_none()
            && self.street.is_none()
            && self.postcode.is_none()
            && self.city.is_none()
    }
}

/// A feature extracted from the general map dataset.
///
/// Matched sponsored objects are merged into a copy of the feature, and
/// unmatched ones are synthesized as brand new features of the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapFeature {
    /// Source feature id, stable within one map dataset
    pub id: u64,

    pub geometry: GeomType,

    /// Key point used for proximity queries
    pub center: GeoPoint,

    /// Multilingual names: {"default": "...", "de": "...", "fr": "..."}
    #[serde(default)]
    pub name: HashMap<String, String>,

    /// Classification tags (e.g., ["tourism:hotel", "place:city"])
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    /// Free-form attributes (population, website, sponsored ids, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl MapFeature {
    pub fn new(id: u64, geometry: GeomType, center: GeoPoint) -> Self {
        Self {
            id,
            geometry,
            center,
            name: HashMap::new(),
            categories: Vec::new(),
            metadata: BTreeMap::new(),
            address: None,
        }
    }

    /// Create a point feature
    pub fn point(id: u64, center: GeoPoint) -> Self {
        Self::new(id, GeomType::Point, center)
    }

    pub fn is_point(&self) -> bool {
        self.geometry == GeomType::Point
    }

    /// Add a name in a specific language
    pub fn add_name(&mut self, lang: &str, name: impl Into<String>) {
        let lang = if lang.is_empty() { DEFAULT_LANG } else { lang };
        self.name.insert(lang.to_string(), name.into());
    }

    /// Name in `lang`, ignoring empty strings
    pub fn get_name(&self, lang: &str) -> Option<&str> {
        self.name
            .get(lang)
            .map(String::as_str)
            .filter(|n| !n.is_empty())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.get_name(DEFAULT_LANG)
    }

    /// Add a category from a key/value tag pair
    pub fn add_category(&mut self, key: &str, value: &str) {
        self.categories.push(format!("{}:{}", key, value));
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    pub fn set_metadata(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Population attribute, 0 when absent or unparsable
    pub fn population(&self) -> u32 {
        self.metadata(POPULATION_KEY)
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(0)
    }
}
