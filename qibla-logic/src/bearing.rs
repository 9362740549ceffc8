use serde::{Deserialize, Serialize};

use crate::location::GeoCoordinate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Which formula to use for the initial great-circle bearing
pub enum BearingFormula {
    /// `x = cos(φ1)·tan(φ2) − sin(φ1)·cos(Δλ)`, `y = sin(Δλ)`. This is the forward azimuth
    /// with both terms divided by cos(φ2), so it agrees with [BearingFormula::ForwardAzimuth]
    /// for any target that isn't a pole.
    #[default]
    Simplified,
    /// The textbook forward azimuth
    ForwardAzimuth,
}

/// Wrap an angle in degrees into [0, 360)
pub fn normalize_degrees(degrees: f64) -> f64 {
    let mut res = degrees % 360.0;
    if res < 0.0 {
        res += 360.0;
    }
    // A tiny negative remainder rounds up to exactly 360 once shifted
    if res >= 360.0 { 0.0 } else { res }
}

/// Initial great-circle bearing from `origin` toward `target`, in degrees clockwise from true
/// north.
pub fn compute_bearing(origin: GeoCoordinate, target: GeoCoordinate) -> f64 {
    compute_bearing_with(BearingFormula::Simplified, origin, target)
}

pub fn compute_bearing_with(
    formula: BearingFormula,
    origin: GeoCoordinate,
    target: GeoCoordinate,
) -> f64 {
    let phi1 = origin.lat.to_radians();
    let phi2 = target.lat.to_radians();
    let delta_long = (target.long - origin.long).to_radians();

    let (y, x) = match formula {
        BearingFormula::Simplified => (
            delta_long.sin(),
            phi1.cos() * phi2.tan() - phi1.sin() * delta_long.cos(),
        ),
        BearingFormula::ForwardAzimuth => (
            delta_long.sin() * phi2.cos(),
            phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_long.cos(),
        ),
    };

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Degrees to turn clockwise from `heading` to face `bearing`, 0 means straight ahead.
pub fn relative_direction(bearing: f64, heading: f64) -> f64 {
    normalize_degrees(bearing - heading)
}

/// Convert a relative direction into the shortest turn, in (-180, 180]. Negative turns are to
/// the left.
pub fn signed_turn(relative: f64) -> f64 {
    let relative = normalize_degrees(relative);
    if relative > 180.0 {
        relative - 360.0
    } else {
        relative
    }
}
