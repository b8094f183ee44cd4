//! Settlement classification for locality lookups.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::MapFeature;

/// Settlement kinds recognised by the classifier.
/// See: https://wiki.openstreetmap.org/wiki/Key:place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LocalityType {
    Country,
    State,
    City,
    Town,
    Village,
}

impl LocalityType {
    /// Convert an OSM `place=*` value
    pub fn from_place_tag(value: &str) -> Option<Self> {
        match value {
            "country" => Some(LocalityType::Country),
            "state" | "province" => Some(LocalityType::State),
            "city" => Some(LocalityType::City),
            "town" => Some(LocalityType::Town),
            "village" | "hamlet" => Some(LocalityType::Village),
            _ => None,
        }
    }

    /// Kinds that are cached for point-to-locality lookups
    pub fn is_city_or_town(&self) -> bool {
        matches!(self, LocalityType::City | LocalityType::Town)
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            LocalityType::Country => "country",
            LocalityType::State => "state",
            LocalityType::City => "city",
            LocalityType::Town => "town",
            LocalityType::Village => "village",
        }
    }
}

/// Category table mapping feature categories to settlement kinds.
///
/// Lookups fall back to shorter `:`-separated prefixes, so `place:city:capital`
/// classifies through a `place:city` entry.
#[derive(Debug, Clone)]
pub struct LocalityClassifier {
    table: HashMap<String, LocalityType>,
}

impl LocalityClassifier {
    /// Create an empty table
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn insert(&mut self, category: &str, kind: LocalityType) {
        self.table.insert(category.to_string(), kind);
    }

    pub fn with_entry(mut self, category: &str, kind: LocalityType) -> Self {
        self.insert(category, kind);
        self
    }

    /// Classify a single category string
    pub fn classify_category(&self, category: &str) -> Option<LocalityType> {
        let mut key = category;
        loop {
            if let Some(kind) = self.table.get(key) {
                return Some(*kind);
            }
            match key.rfind(':') {
                Some(pos) => key = &key[..pos],
                None => return None,
            }
        }
    }

    /// Classify a feature by the first recognised category
    pub fn classify(&self, feature: &MapFeature) -> Option<LocalityType> {
        feature
            .categories
            .iter()
            .find_map(|c| self.classify_category(c))
    }
}

impl Default for LocalityClassifier {
    fn default() -> Self {
        let mut classifier = Self::empty();
        for value in ["country", "state", "province", "city", "town", "village", "hamlet"] {
            if let Some(kind) = LocalityType::from_place_tag(value) {
                classifier.insert(&format!("place:{}", value), kind);
            }
        }
        classifier
    }
}
