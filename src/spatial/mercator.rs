//! Projected coordinate helpers.
//!
//! The projected plane keeps degrees on both axes: `x` is the longitude and
//! `y` the Mercator-stretched latitude, both clamped to [-180, 180]. Spatial
//! indexes work in this plane; metric distances are always great-circle.

use geo::{coord, Coord, Distance, Haversine, Point, Rect};

use crate::models::GeoPoint;

pub const MIN_X: f64 = -180.0;
pub const MAX_X: f64 = 180.0;
pub const MIN_Y: f64 = -180.0;
pub const MAX_Y: f64 = 180.0;

/// Latitudes beyond this are clamped before projecting
const MAX_PROJECTED_LAT: f64 = 86.0;

/// Degrees of latitude per metre along a meridian
const DEGREES_PER_METRE: f64 = 360.0 / 40_008_245.0;

pub fn clamp_x(x: f64) -> f64 {
    x.clamp(MIN_X, MAX_X)
}

pub fn clamp_y(y: f64) -> f64 {
    y.clamp(MIN_Y, MAX_Y)
}

pub fn lat_to_y(lat: f64) -> f64 {
    let sin = lat
        .clamp(-MAX_PROJECTED_LAT, MAX_PROJECTED_LAT)
        .to_radians()
        .sin();
    clamp_y((0.5 * ((1.0 + sin) / (1.0 - sin)).ln()).to_degrees())
}

pub fn y_to_lat(y: f64) -> f64 {
    y.to_radians().sinh().atan().to_degrees()
}

/// Project a geographic point
pub fn from_lat_lon(point: GeoPoint) -> Coord<f64> {
    coord! { x: clamp_x(point.lon), y: lat_to_y(point.lat) }
}

/// Unproject a point of the projected plane
pub fn to_lat_lon(point: Coord<f64>) -> GeoPoint {
    GeoPoint::new(y_to_lat(point.y), point.x)
}

/// Projected rect spanning `lon_metres`/`lat_metres` on each side of a
/// geographic point.
pub fn metres_to_xy(center: GeoPoint, lon_metres: f64, lat_metres: f64) -> Rect<f64> {
    let lat_offset = lat_metres * DEGREES_PER_METRE;
    let min_lat = (center.lat - lat_offset).max(-90.0);
    let max_lat = (center.lat + lat_offset).min(90.0);

    // Widen by the latitude closest to a pole so the rect never undershoots
    let cos_lat = min_lat
        .abs()
        .max(max_lat.abs())
        .to_radians()
        .cos()
        .max(0.00001);
    let lon_offset = lon_metres * DEGREES_PER_METRE / cos_lat;
    let min_lon = (center.lon - lon_offset).max(-180.0);
    let max_lon = (center.lon + lon_offset).min(180.0);

    Rect::new(
        from_lat_lon(GeoPoint::new(min_lat, min_lon)),
        from_lat_lon(GeoPoint::new(max_lat, max_lon)),
    )
}

/// Square rect with `size` metres from the center to every side
pub fn rect_by_center_and_size_in_meters(center: Coord<f64>, size: f64) -> Rect<f64> {
    metres_to_xy(to_lat_lon(center), size, size)
}

/// Degenerate rect at a single point
pub fn point_rect(point: Coord<f64>) -> Rect<f64> {
    Rect::new(point, point)
}

pub fn full_rect() -> Rect<f64> {
    Rect::new(coord! { x: MIN_X, y: MIN_Y }, coord! { x: MAX_X, y: MAX_Y })
}

/// Great-circle distance in metres
pub fn distance_on_earth(a: GeoPoint, b: GeoPoint) -> f64 {
    Haversine.distance(Point::new(a.lon, a.lat), Point::new(b.lon, b.lat))
}
