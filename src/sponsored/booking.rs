//! Hotel records from a booking partner feed.
//!
//! Record layout (tab-separated):
//! `id lat lon name address stars price_category rating_booking rating_users url type [translations]`
//!
//! Translations are `lang|name|address` triples joined by `|`.

use super::{apply_address, parse_field, parse_lat_lon, split_fields, RecordError, SponsoredObject, SPONSORED_ID_KEY};
use crate::models::{Address, GeoPoint, MapFeature};

const FIELD_COUNT: usize = 11;

/// Map categories a hotel may be matched against
const HOTEL_CATEGORIES: &[&str] = &[
    "tourism:hotel",
    "tourism:apartment",
    "tourism:camp_site",
    "tourism:chalet",
    "tourism:guest_house",
    "tourism:hostel",
    "tourism:motel",
    "tourism:resort",
];

#[derive(Debug, Clone, PartialEq)]
pub struct BookingHotel {
    pub id: u32,
    pub lat_lon: GeoPoint,
    pub name: String,
    /// Free-form address as supplied by the feed
    pub address: String,
    pub stars: u8,
    pub price_category: u8,
    pub rating_booking: f64,
    pub rating_users: f64,
    pub desc_url: String,
    pub hotel_type: u32,
    pub translations: String,
    /// Street address resolved from map data
    pub enriched: Option<Address>,
}

impl BookingHotel {
    /// Map category for the feed's accommodation type
    pub fn category(&self) -> &'static str {
        match self.hotel_type {
            2 => "tourism:apartment",
            3 => "tourism:motel",
            6 => "tourism:camp_site",
            8 => "tourism:guest_house",
            17 => "tourism:hostel",
            21 => "tourism:resort",
            22 => "tourism:chalet",
            _ => "tourism:hotel",
        }
    }

    /// Parsed `(lang, name, address)` translations; incomplete triples are dropped
    pub fn translations(&self) -> Vec<(&str, &str, &str)> {
        let parts: Vec<&str> = self.translations.split('|').collect();
        parts
            .chunks_exact(3)
            .filter(|t| !t[0].is_empty())
            .map(|t| (t[0], t[1], t[2]))
            .collect()
    }

    fn set_sponsored_metadata(&self, feature: &mut MapFeature) {
        feature.set_metadata(SPONSORED_ID_KEY, self.id.to_string());
        if !self.desc_url.is_empty() {
            feature.set_metadata("website", self.desc_url.clone());
        }
        feature.set_metadata("rating", format!("{:.1}", self.rating_users));
        feature.set_metadata("stars", self.stars.to_string());
        feature.set_metadata("price_rate", self.price_category.to_string());
        if !feature.has_category(Self::SPONSORED_CATEGORY) {
            feature.categories.push(Self::SPONSORED_CATEGORY.to_string());
        }
    }
}

fn parse_optional<T: std::str::FromStr + Default>(
    value: &str,
    field: &'static str,
) -> Result<T, RecordError> {
    if value.trim().is_empty() {
        return Ok(T::default());
    }
    parse_field(value, field)
}

impl SponsoredObject for BookingHotel {
    type Id = u32;

    const SPONSORED_CATEGORY: &'static str = "sponsored:booking";

    fn from_tsv(record: &str) -> Result<Self, RecordError> {
        let fields = split_fields(record, FIELD_COUNT)?;

        Ok(Self {
            id: parse_field(fields[0], "id")?,
            lat_lon: parse_lat_lon(fields[1], fields[2])?,
            name: fields[3].trim().to_string(),
            address: fields[4].trim().to_string(),
            stars: parse_optional(fields[5], "stars")?,
            price_category: parse_optional(fields[6], "price_category")?,
            rating_booking: parse_optional(fields[7], "rating_booking")?,
            rating_users: parse_optional(fields[8], "rating_users")?,
            desc_url: fields[9].trim().to_string(),
            hotel_type: parse_optional(fields[10], "type")?,
            translations: fields.get(11).map(|t| t.trim().to_string()).unwrap_or_default(),
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
        feature.default_name().is_some()
            && HOTEL_CATEGORIES.iter().any(|c| feature.has_category(c))
    }

    fn merge_into(&self, feature: &mut MapFeature) {
        self.set_sponsored_metadata(feature);
    }

    fn build_feature(&self) -> MapFeature {
        let mut feature = MapFeature::point(u64::from(self.id), self.lat_lon);
        feature.add_name("default", self.name.clone());
        for (lang, name, _) in self.translations() {
            if !name.is_empty() {
                feature.add_name(lang, name);
            }
        }
        apply_address(&mut feature, self.enriched.as_ref(), &self.address);

        feature.categories.push(self.category().to_string());
        self.set_sponsored_metadata(&mut feature);
        feature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = "1001\t52.5163\t13.3777\tHotel Adlon\tUnter den Linden 77\t5\t4\t9.1\t8.7\thttps://example.com/adlon\t14\tde|Hotel Adlon Kempinski|Unter den Linden 77|fr|Hôtel Adlon||x";

    #[test]
    fn test_parse_record() {
        let hotel = BookingHotel::from_tsv(RECORD).unwrap();
        assert_eq!(hotel.id, 1001);
        assert_eq!(hotel.name, "Hotel Adlon");
        assert_eq!(hotel.stars, 5);
        assert_eq!(hotel.category(), "tourism:hotel");
        assert_eq!(hotel.translations().len(), 2);
        assert!(hotel.enriched.is_none());
    }

    #[test]
    fn test_parse_empty_optional_numbers() {
        let hotel = BookingHotel::from_tsv("7\t0.0\t0.0\tInn\t\t\t\t\t\t\t3").unwrap();
        assert_eq!(hotel.stars, 0);
        assert_eq!(hotel.rating_users, 0.0);
        assert_eq!(hotel.category(), "tourism:motel");
    }

    #[test]
    fn test_parse_bad_id() {
        let err = BookingHotel::from_tsv("x1\t0.0\t0.0\tInn\t\t\t\t\t\t\t3").unwrap_err();
        assert!(matches!(err, RecordError::InvalidField { field: "id", .. }));
    }

    #[test]
    fn test_necessary_condition() {
        let mut feature = MapFeature::point(1, GeoPoint::new(52.5, 13.4));
        feature.add_category("tourism", "hostel");
        assert!(!BookingHotel::necessary_matching_condition_holds(&feature));

        feature.add_name("default", "Generator");
        assert!(BookingHotel::necessary_matching_condition_holds(&feature));

        let mut cafe = MapFeature::point(2, GeoPoint::new(52.5, 13.4));
        cafe.add_name("default", "Generator");
        cafe.add_category("amenity", "cafe");
        assert!(!BookingHotel::necessary_matching_condition_holds(&cafe));
    }

    #[test]
    fn test_build_feature() {
        let hotel = BookingHotel::from_tsv(RECORD).unwrap();
        let feature = hotel.build_feature();

        assert_eq!(feature.default_name(), Some("Hotel Adlon"));
        assert_eq!(feature.get_name("de"), Some("Hotel Adlon Kempinski"));
        assert!(feature.has_category("tourism:hotel"));
        assert!(feature.has_category("sponsored:booking"));
        assert_eq!(feature.metadata(SPONSORED_ID_KEY), Some("1001"));
        assert_eq!(
            feature.address.as_ref().and_then(|a| a.street.as_deref()),
            Some("Unter den Linden 77")
        );
    }
}
