use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{bearing::normalize_degrees, tracker::UtcDT};

/// A "part" of a location
pub type LocationComponent = f64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Some location in the world as gotten from a Geolocation API
pub struct GeoCoordinate {
    /// Latitude, in degrees from -90 to 90
    pub lat: LocationComponent,
    /// Longitude, in degrees from -180 to 180
    pub long: LocationComponent,
}

impl GeoCoordinate {
    pub const fn new(lat: LocationComponent, long: LocationComponent) -> Self {
        Self { lat, long }
    }

    /// Whether both components are finite and inside their valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.long.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.long)
    }
}

/// The Kaaba in Mecca, the point every bearing is computed toward by default
pub const KAABA: GeoCoordinate = GeoCoordinate::new(21.4225, 39.8262);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// A single reading from the device compass
pub struct HeadingReading {
    /// Degrees clockwise from true north, negative if the device couldn't determine it
    pub true_heading: LocationComponent,
    /// Degrees clockwise from magnetic north, if the compass reports it
    #[serde(default)]
    pub magnetic_heading: Option<LocationComponent>,
    #[serde(default = "Utc::now")]
    pub timestamp: UtcDT,
}

impl HeadingReading {
    pub fn new(true_heading: LocationComponent) -> Self {
        Self {
            true_heading,
            magnetic_heading: None,
            timestamp: Utc::now(),
        }
    }

    /// The heading to steer by in [0, 360), prefers true north and falls back to magnetic north
    /// when the true heading is invalid.
    pub fn effective(&self) -> Option<LocationComponent> {
        let heading = if self.true_heading.is_finite() && self.true_heading >= 0.0 {
            Some(self.true_heading)
        } else {
            self.magnetic_heading
                .filter(|h| h.is_finite() && *h >= 0.0)
        };
        heading.map(normalize_degrees)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Something a sensor stream delivered
pub enum SensorEvent<T> {
    /// A new value from the sensor
    Reading(T),
    /// The sensor is temporarily unable to provide values
    Unavailable(String),
    /// The user has not authorized access to this sensor
    Denied,
}

impl<T> From<T> for SensorEvent<T> {
    fn from(v: T) -> Self {
        Self::Reading(v)
    }
}

pub trait LocationSource: Send + Sync {
    /// Wait for the next event from the location sensor, [None] means the stream has ended and
    /// will never produce anything again.
    fn next_location(
        &self,
    ) -> impl std::future::Future<Output = Option<SensorEvent<GeoCoordinate>>> + Send;
}

pub trait HeadingSource: Send + Sync {
    /// Wait for the next event from the compass, [None] means the stream has ended.
    fn next_heading(
        &self,
    ) -> impl std::future::Future<Output = Option<SensorEvent<HeadingReading>>> + Send;
    /// Ask the platform to begin delivering headings
    fn start_updates(&self) {}
    /// Ask the platform to stop delivering headings, readings already queued may still arrive
    fn stop_updates(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_heading_fallback() {
        let mut reading = HeadingReading::new(-1.0);
        assert_eq!(reading.effective(), None);

        reading.magnetic_heading = Some(12.5);
        assert_eq!(reading.effective(), Some(12.5));

        reading.true_heading = 90.0;
        assert_eq!(reading.effective(), Some(90.0));
    }

    #[test]
    fn test_effective_heading_wraps() {
        assert_eq!(HeadingReading::new(360.0).effective(), Some(0.0));
        assert_eq!(HeadingReading::new(725.0).effective(), Some(5.0));

        let mut reading = HeadingReading::new(f64::NAN);
        reading.magnetic_heading = Some(370.0);
        assert_eq!(reading.effective(), Some(10.0));
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(KAABA.is_valid());
        assert!(GeoCoordinate::new(-90.0, 180.0).is_valid());
        assert!(!GeoCoordinate::new(90.5, 0.0).is_valid());
        assert!(!GeoCoordinate::new(0.0, f64::NAN).is_valid());
    }

    #[test]
    fn test_heading_deserialize_defaults() {
        let reading: HeadingReading =
            serde_json::from_str(r#"{"true_heading": 45.0}"#).expect("Failed to parse");
        assert_eq!(reading.true_heading, 45.0);
        assert_eq!(reading.magnetic_heading, None);
    }
}
