use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::{
    bearing::BearingFormula,
    location::{GeoCoordinate, KAABA},
    prelude::*,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Settings for a [crate::QiblaTracker], fixed once tracking starts
pub struct TrackerSettings {
    /// The location bearings are computed toward
    pub target: GeoCoordinate,
    /// Formula used for the great-circle bearing
    pub formula: BearingFormula,
    /// Minimum change in heading (degrees) before the display is told about it, 0 to push every
    /// reading
    pub heading_filter_degrees: f64,
}

impl TrackerSettings {
    pub fn validate(&self) -> Result {
        if !self.target.is_valid() {
            bail!(
                "Target ({}, {}) is not a valid coordinate",
                self.target.lat,
                self.target.long
            );
        }
        if !self.heading_filter_degrees.is_finite() || self.heading_filter_degrees < 0.0 {
            bail!(
                "Heading filter must be a non-negative number of degrees, got {}",
                self.heading_filter_degrees
            );
        }
        Ok(())
    }

    /// Parse settings from JSON, fields left out keep their defaults
    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(raw).context("Failed to parse tracker settings")?;
        settings.validate().context("Invalid tracker settings")?;
        Ok(settings)
    }
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            target: KAABA,
            formula: BearingFormula::Simplified,
            heading_filter_degrees: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets_kaaba() {
        let settings = TrackerSettings::default();
        assert_eq!(settings.target, KAABA);
        assert_eq!(settings.formula, BearingFormula::Simplified);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let settings = TrackerSettings::from_json(r#"{"formula": "forward_azimuth"}"#)
            .expect("Failed to parse");
        assert_eq!(settings.formula, BearingFormula::ForwardAzimuth);
        assert_eq!(settings.target, KAABA);
        assert_eq!(settings.heading_filter_degrees, 1.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut settings = TrackerSettings {
            heading_filter_degrees: -2.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        settings.heading_filter_degrees = 0.0;
        settings.target = GeoCoordinate::new(91.0, 0.0);
        assert!(settings.validate().is_err());

        assert!(TrackerSettings::from_json(r#"{"target": {"lat": 0.0}}"#).is_err());
    }
}
