//! Street address enrichment for sponsored objects.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::{DatasetError, SponsoredObject};
use crate::models::{Address, GeoPoint};
use crate::spatial::{mercator, SpatialIndex};

/// Resolves the nearest known street address for a point
pub trait ReverseGeocoder: Send + Sync {
    fn nearby_address(&self, point: GeoPoint) -> Option<Address>;
}

/// Writes reverse-geocoded addresses onto sponsored objects
pub struct AddressMatcher<'a> {
    geocoder: &'a dyn ReverseGeocoder,
}

impl<'a> AddressMatcher<'a> {
    pub fn new(geocoder: &'a dyn ReverseGeocoder) -> Self {
        Self { geocoder }
    }

    /// Look up the object's address. Returns whether one was found; the
    /// object's enriched address is cleared otherwise.
    pub fn apply<O: SponsoredObject>(&self, object: &mut O) -> bool {
        let address = self
            .geocoder
            .nearby_address(object.lat_lon())
            .filter(|a| !a.is_empty());
        let found = address.is_some();
        object.set_enriched_address(address);
        found
    }
}

/// One line of an address reference file
#[derive(Debug, Clone, Deserialize)]
pub struct AddressRecord {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub housenumber: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

impl AddressRecord {
    fn address(&self) -> Address {
        Address {
            housenumber: self.housenumber.clone(),
            street: self.street.clone(),
            postcode: self.postcode.clone(),
            city: self.city.clone(),
        }
    }
}

/// Nearest-address lookup over a list of addressed points
pub struct AddressIndex {
    records: Vec<AddressRecord>,
    index: SpatialIndex<usize>,
    radius_meters: f64,
}

impl AddressIndex {
    pub const DEFAULT_LOOKUP_RADIUS_METERS: f64 = 500.0;

    pub fn new(records: Vec<AddressRecord>) -> Self {
        let entries = records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let point = mercator::from_lat_lon(GeoPoint::new(r.lat, r.lon));
                (mercator::point_rect(point), i)
            })
            .collect();

        Self {
            records,
            index: SpatialIndex::build(entries),
            radius_meters: Self::DEFAULT_LOOKUP_RADIUS_METERS,
        }
    }

    pub fn with_radius(mut self, radius_meters: f64) -> Self {
        self.radius_meters = radius_meters;
        self
    }

    /// Load JSON lines, one [`AddressRecord`] per line
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, DatasetError> {
        let mut records = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: AddressRecord = serde_json::from_str(&line)
                .map_err(|source| DatasetError::AddressRecord { line: idx + 1, source })?;
            if GeoPoint::new(record.lat, record.lon).is_valid() {
                records.push(record);
            } else {
                debug!("Skipping address with invalid coordinates on line {}", idx + 1);
            }
        }
        Ok(Self::new(records))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ReverseGeocoder for AddressIndex {
    fn nearby_address(&self, point: GeoPoint) -> Option<Address> {
        let center = mercator::from_lat_lon(point);
        // Candidates come back in planar order; re-rank by metres
        self.index
            .query_nearest(center, 8, None)
            .into_iter()
            .filter_map(|i| {
                let record = &self.records[i];
                let distance = mercator::distance_on_earth(point, GeoPoint::new(record.lat, record.lon));
                (distance <= self.radius_meters).then_some((distance, i))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, i)| self.records[i].address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sponsored::BookingHotel;
    use std::io::Cursor;

    const ADDRESSES: &str = r#"{"lat": 52.5163, "lon": 13.3777, "street": "Unter den Linden", "housenumber": "77", "city": "Berlin"}
{"lat": 52.5200, "lon": 13.4050, "street": "Alexanderplatz", "housenumber": "1"}

{"lat": 120.0, "lon": 13.4050, "street": "Nowhere"}
"#;

    #[test]
    fn test_load_skips_invalid_points() {
        let index = AddressIndex::from_reader(Cursor::new(ADDRESSES)).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_bad_json_reports_line() {
        let err = AddressIndex::from_reader(Cursor::new("{\"lat\": 1.0, \"lon\": 2.0}\nnot json\n"))
            .err()
            .unwrap();
        assert!(matches!(err, DatasetError::AddressRecord { line: 2, .. }));
    }

    #[test]
    fn test_nearby_address_within_radius() {
        let index = AddressIndex::from_reader(Cursor::new(ADDRESSES)).unwrap();

        let found = index.nearby_address(GeoPoint::new(52.5164, 13.3778)).unwrap();
        assert_eq!(found.street.as_deref(), Some("Unter den Linden"));
        assert_eq!(found.housenumber.as_deref(), Some("77"));

        assert!(index.nearby_address(GeoPoint::new(48.85, 2.35)).is_none());
    }

    #[test]
    fn test_matcher_clears_on_miss() {
        let index = AddressIndex::from_reader(Cursor::new(ADDRESSES)).unwrap();
        let matcher = AddressMatcher::new(&index);

        let mut hotel =
            BookingHotel::from_tsv("1\t52.5163\t13.3777\tAdlon\t\t5\t4\t9\t9\t\t14").unwrap();
        assert!(matcher.apply(&mut hotel));
        assert_eq!(hotel.enriched.as_ref().and_then(|a| a.city.as_deref()), Some("Berlin"));

        hotel.lat_lon = GeoPoint::new(10.0, 10.0);
        assert!(!matcher.apply(&mut hotel));
        assert!(hotel.enriched.is_none());
    }
}
