//! Sponsored object datasets and their matching against map features.
//!
//! A dataset is loaded from tab-separated records, optionally enriched with
//! street addresses, and indexed once. Map features are then matched against
//! it by proximity and name similarity.

mod address;
mod booking;
mod dataset;
mod opentable;
pub mod scoring;

pub use address::{AddressIndex, AddressMatcher, AddressRecord, ReverseGeocoder};
pub use booking::BookingHotel;
pub use dataset::{MatchStats, SponsoredDataset, DISTANCE_LIMIT_METERS, MAX_SELECTED_ELEMENTS};
pub use opentable::OpentableRestaurant;
pub use scoring::MatchScore;

use std::fmt::{Debug, Display};
use thiserror::Error;

use crate::models::{Address, GeoPoint, MapFeature};

/// Metadata key holding the sponsored object id on emitted features
pub const SPONSORED_ID_KEY: &str = "sponsored_id";

/// Error for a single malformed dataset record
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("expected at least {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// Dataset construction failure. A dataset is either fully loaded or not
/// constructed at all.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: RecordError,
    },

    #[error("line {line}: duplicate object id {id}")]
    DuplicateId { line: usize, id: String },

    #[error("address reference line {line}: {source}")]
    AddressRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// A record kind that can be loaded into a [`SponsoredDataset`].
///
/// Everything dataset-specific lives here: parsing, the matching pre-filter,
/// the acceptance rule and how matched or unmatched objects become features.
pub trait SponsoredObject: Sized + Send + Sync {
    type Id: Ord + Copy + Debug + Display + Send + Sync;

    /// Category attached to every feature carrying this kind of object
    const SPONSORED_CATEGORY: &'static str;

    /// Parse one tab-separated record
    fn from_tsv(record: &str) -> Result<Self, RecordError>;

    fn id(&self) -> Self::Id;

    fn lat_lon(&self) -> GeoPoint;

    fn name(&self) -> &str;

    fn enriched_address(&self) -> Option<&Address>;

    fn set_enriched_address(&mut self, address: Option<Address>);

    /// Cheap check run before any index query
    fn necessary_matching_condition_holds(feature: &MapFeature) -> bool;

    /// Whether a nearby feature is the same real-world place
    fn is_match(&self, _feature: &MapFeature, score: &MatchScore, threshold: f64) -> bool {
        score.is_matched(threshold)
    }

    /// Merge sponsored attributes into a matched map feature
    fn merge_into(&self, feature: &mut MapFeature);

    /// Synthesize a standalone feature from this object
    fn build_feature(&self) -> MapFeature;
}

/// Split a record into tab-separated fields, checking the minimum count
pub(crate) fn split_fields(record: &str, expected: usize) -> Result<Vec<&str>, RecordError> {
    let fields: Vec<&str> = record.split('\t').collect();
    if fields.len() < expected {
        return Err(RecordError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

/// Parse a numeric field, naming it in the error
pub(crate) fn parse_field<T: std::str::FromStr>(
    value: &str,
    field: &'static str,
) -> Result<T, RecordError> {
    value.trim().parse().map_err(|_| RecordError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// Parse and validate a coordinate pair
pub(crate) fn parse_lat_lon(lat: &str, lon: &str) -> Result<GeoPoint, RecordError> {
    let point = GeoPoint::new(parse_field(lat, "latitude")?, parse_field(lon, "longitude")?);
    if !point.is_valid() {
        return Err(RecordError::InvalidField {
            field: "coordinates",
            value: format!("{},{}", lat, lon),
        });
    }
    Ok(point)
}

/// Attach an enriched address, or the raw dataset address as the street
pub(crate) fn apply_address(feature: &mut MapFeature, enriched: Option<&Address>, raw: &str) {
    if let Some(address) = enriched.filter(|a| !a.is_empty()) {
        feature.address = Some(address.clone());
    } else if !raw.is_empty() {
        feature.address = Some(Address {
            street: Some(raw.to_string()),
            ..Address::default()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fields_count() {
        assert_eq!(split_fields("a\tb\tc", 3).unwrap(), vec!["a", "b", "c"]);
        assert!(matches!(
            split_fields("a\tb", 3),
            Err(RecordError::FieldCount {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn test_parse_lat_lon_rejects_out_of_range() {
        assert!(parse_lat_lon("52.5", "13.4").is_ok());
        assert!(parse_lat_lon("95.0", "13.4").is_err());
        assert!(parse_lat_lon("north", "13.4").is_err());
    }
}
