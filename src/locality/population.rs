//! Power-law relation between a settlement's population and the radius it
//! is considered to cover.

const RADIUS_FACTOR_METERS: f64 = 550.0;
const EXPONENT: f64 = 3.6;

/// Covering radius in metres for a settlement of `population`
pub fn radius_by_population(population: u32) -> f64 {
    f64::from(population).powf(1.0 / EXPONENT) * RADIUS_FACTOR_METERS
}

/// Population whose covering radius is `radius` metres
pub fn population_by_radius(radius: f64) -> f64 {
    (radius / RADIUS_FACTOR_METERS).powf(EXPONENT).round()
}
