//! Restaurant records from a reservation partner feed.
//!
//! Record layout (tab-separated): `id lat lon name address url`

use super::{apply_address, parse_field, parse_lat_lon, split_fields, RecordError, SponsoredObject, SPONSORED_ID_KEY};
use crate::models::{Address, GeoPoint, MapFeature};

const FIELD_COUNT: usize = 6;

const FOOD_CATEGORIES: &[&str] = &[
    "amenity:restaurant",
    "amenity:cafe",
    "amenity:fast_food",
    "amenity:bar",
    "amenity:pub",
    "amenity:food_court",
    "amenity:biergarten",
];

#[derive(Debug, Clone, PartialEq)]
pub struct OpentableRestaurant {
    pub id: u32,
    pub lat_lon: GeoPoint,
    pub name: String,
    pub address: String,
    pub desc_url: String,
    pub enriched: Option<Address>,
}

impl OpentableRestaurant {
    fn set_sponsored_metadata(&self, feature: &mut MapFeature) {
        feature.set_metadata(SPONSORED_ID_KEY, self.id.to_string());
        if !self.desc_url.is_empty() {
            feature.set_metadata("website", self.desc_url.clone());
        }
        if !feature.has_category(Self::SPONSORED_CATEGORY) {
            feature.categories.push(Self::SPONSORED_CATEGORY.to_string());
        }
    }
}

impl SponsoredObject for OpentableRestaurant {
    type Id = u32;

    const SPONSORED_CATEGORY: &'static str = "sponsored:opentable";

    fn from_tsv(record: &str) -> Result<Self, RecordError> {
        let fields = split_fields(record, FIELD_COUNT)?;

        Ok(Self {
            id: parse_field(fields[0], "id")?,
            lat_lon: parse_lat_lon(fields[1], fields[2])?,
            name: fields[3].trim().to_string(),
            address: fields[4].trim().to_string(),
            desc_url: fields[5].trim().to_string(),
            enriched: None,
        })
    }

    fn id(&self) -> u32 {
        self.id
    }

    fn lat_lon(&self) -> GeoPoint {
        self.lat_lon
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn enriched_address(&self) -> Option<&Address> {
        self.enriched.as_ref()
    }

    fn set_enriched_address(&mut self, address: Option<Address>) {
        self.enriched = address;
    }

    fn necessary_matching_condition_holds(feature: &MapFeature) -> bool {
        feature.default_name().is_some() && FOOD_CATEGORIES.iter().any(|c| feature.has_category(c))
    }

    fn merge_into(&self, feature: &mut MapFeature) {
        self.set_sponsored_metadata(feature);
    }

    fn build_feature(&self) -> MapFeature {
        let mut feature = MapFeature::point(u64::from(self.id), self.lat_lon);
        feature.add_name("default", self.name.clone());
        apply_address(&mut feature, self.enriched.as_ref(), &self.address);
        feature.add_category("amenity", "restaurant");
        self.set_sponsored_metadata(&mut feature);
        feature
    }
}
