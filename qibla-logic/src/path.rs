use serde::{Deserialize, Serialize};

use crate::location::{GeoCoordinate, LocationComponent};

/// Mean radius of the earth in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Roughly how many meters a degree of latitude spans
const METERS_PER_DEGREE: f64 = 111_320.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// The straight line drawn from the user to the target on a map
pub struct PathOverlay {
    pub from: GeoCoordinate,
    pub to: GeoCoordinate,
}

impl PathOverlay {
    pub fn new(from: GeoCoordinate, to: GeoCoordinate) -> Self {
        Self { from, to }
    }

    /// Length of the path along the surface of the earth
    pub fn distance_km(&self) -> f64 {
        great_circle_distance_km(self.from, self.to)
    }

    /// The region showing both ends of the path
    pub fn region(&self) -> Region {
        Region::from_bounds(
            self.from.lat.min(self.to.lat),
            self.from.lat.max(self.to.lat),
            self.from.long.min(self.to.long),
            self.from.long.max(self.to.long),
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Some rectangular area of the map, in degrees
pub struct Region {
    pub center: GeoCoordinate,
    pub lat_span: LocationComponent,
    pub long_span: LocationComponent,
}

impl Region {
    /// A square region `meters` wide centered at `center`
    pub fn around(center: GeoCoordinate, meters: f64) -> Self {
        let lat_span = meters / METERS_PER_DEGREE;
        let scale = center.lat.to_radians().cos();
        let long_span = if scale > f64::EPSILON {
            (lat_span / scale).min(360.0)
        } else {
            360.0
        };
        Self {
            center,
            lat_span,
            long_span,
        }
    }

    /// The smallest region that contains every coordinate, [None] if there are none
    pub fn bounding(coords: &[GeoCoordinate]) -> Option<Self> {
        let first = coords.first()?;
        let (min_lat, max_lat, min_long, max_long) = coords.iter().skip(1).fold(
            (first.lat, first.lat, first.long, first.long),
            |(min_lat, max_lat, min_long, max_long), c| {
                (
                    min_lat.min(c.lat),
                    max_lat.max(c.lat),
                    min_long.min(c.long),
                    max_long.max(c.long),
                )
            },
        );
        Some(Self::from_bounds(min_lat, max_lat, min_long, max_long))
    }

    fn from_bounds(min_lat: f64, max_lat: f64, min_long: f64, max_long: f64) -> Self {
        Self {
            center: GeoCoordinate::new((min_lat + max_lat) / 2.0, (min_long + max_long) / 2.0),
            lat_span: max_lat - min_lat,
            long_span: max_long - min_long,
        }
    }

    /// Grow the region on every side by `fraction` of its span
    pub fn padded(self, fraction: f64) -> Self {
        Self {
            center: self.center,
            lat_span: (self.lat_span * (1.0 + 2.0 * fraction)).min(180.0),
            long_span: (self.long_span * (1.0 + 2.0 * fraction)).min(360.0),
        }
    }

    pub fn contains(&self, coord: GeoCoordinate) -> bool {
        // Edges are computed from the center, allow for rounding
        const SLACK: f64 = 1e-9;
        (coord.lat - self.center.lat).abs() <= self.lat_span / 2.0 + SLACK
            && (coord.long - self.center.long).abs() <= self.long_span / 2.0 + SLACK
    }
}

/// Haversine distance between two points
pub fn great_circle_distance_km(a: GeoCoordinate, b: GeoCoordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_phi = (b.lat - a.lat).to_radians();
    let delta_long = (b.long - a.long).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_long / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::KAABA;

    #[test]
    fn test_distance() {
        assert_eq!(great_circle_distance_km(KAABA, KAABA), 0.0);

        // London to Mecca is about 4790km
        let london = GeoCoordinate::new(51.5074, -0.1278);
        let dist = great_circle_distance_km(london, KAABA);
        assert!((dist - 4790.0).abs() < 30.0, "Got {dist}");

        let quarter = great_circle_distance_km(
            GeoCoordinate::new(0.0, 0.0),
            GeoCoordinate::new(0.0, 90.0),
        );
        let expected = std::f64::consts::FRAC_PI_2 * EARTH_RADIUS_KM;
        assert!((quarter - expected).abs() < 1e-6);
    }

    #[test]
    fn test_path_region_contains_ends() {
        let user = GeoCoordinate::new(-6.2088, 106.8456);
        let path = PathOverlay::new(user, KAABA);
        let region = path.region();

        assert!(region.contains(user));
        assert!(region.contains(KAABA));
        assert_eq!(Some(region), Region::bounding(&[user, KAABA]));
    }

    #[test]
    fn test_bounding_empty() {
        assert_eq!(Region::bounding(&[]), None);

        let single = Region::bounding(&[KAABA]).expect("One point is a region");
        assert_eq!(single.center, KAABA);
        assert_eq!(single.lat_span, 0.0);
    }

    #[test]
    fn test_region_around() {
        let region = Region::around(GeoCoordinate::new(0.0, 0.0), 1000.0);
        assert!((region.lat_span - 1000.0 / METERS_PER_DEGREE).abs() < 1e-12);
        assert!((region.long_span - region.lat_span).abs() < 1e-12);

        let north = Region::around(GeoCoordinate::new(60.0, 0.0), 1000.0);
        assert!((north.long_span - north.lat_span * 2.0).abs() < 1e-9);

        let pole = Region::around(GeoCoordinate::new(90.0, 0.0), 1000.0);
        assert_eq!(pole.long_span, 360.0);
    }

    #[test]
    fn test_padded() {
        let corners = [GeoCoordinate::new(0.0, 0.0), GeoCoordinate::new(10.0, 20.0)];
        let region = Region::bounding(&corners)
            .expect("Has points")
            .padded(0.1);
        assert!((region.lat_span - 12.0).abs() < 1e-9);
        assert!((region.long_span - 24.0).abs() < 1e-9);
        assert_eq!(region.center, GeoCoordinate::new(5.0, 10.0));
    }
}
