use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    bearing::{compute_bearing_with, relative_direction, signed_turn},
    display::direction_label,
    location::{GeoCoordinate, HeadingReading, SensorEvent},
    path::{PathOverlay, Region},
    settings::TrackerSettings,
    tracker::UtcDT,
};

/// How wide the map is around the user when following their heading
const FOLLOW_REGION_METERS: f64 = 1000.0;

/// Extra space around the full path so neither end sits on the edge
const FULL_PATH_PADDING: f64 = 0.1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// What we know about one of the sensor streams
pub enum SensorStatus {
    /// Nothing has been received yet
    #[default]
    Waiting,
    /// The sensor is delivering readings
    Active,
    /// The sensor reported it can't currently produce readings
    Unavailable(String),
    /// Access to the sensor was not authorized
    Denied,
    /// The stream was closed and won't produce anything else
    Ended,
}

impl SensorStatus {
    fn from_event<T>(event: &SensorEvent<T>) -> Self {
        match event {
            SensorEvent::Reading(_) => Self::Active,
            SensorEvent::Unavailable(why) => Self::Unavailable(why.clone()),
            SensorEvent::Denied => Self::Denied,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewMode {
    /// Map centered on the user and rotated with their heading
    #[default]
    FollowHeading,
    /// Map zoomed out to show the whole path to the target, heading updates are paused
    FullPath,
}

#[derive(Debug, Clone)]
/// Latest readings from both sensors and everything derived from them
pub struct TrackerState {
    settings: TrackerSettings,

    /// Most recent location fix
    location: Option<GeoCoordinate>,

    /// Bearing from [Self::location] to the target, recomputed on each fix
    bearing: Option<f64>,

    /// Most recent usable heading
    heading: Option<f64>,

    /// The heading the display was last told about, used for filtering
    last_pushed_heading: Option<f64>,

    /// Whether heading readings should be applied
    heading_updates_enabled: bool,

    view_mode: ViewMode,

    location_status: SensorStatus,
    heading_status: SensorStatus,

    /// Time of the last change to any reading
    updated_at: Option<UtcDT>,
}

impl TrackerState {
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            settings,
            location: None,
            bearing: None,
            heading: None,
            last_pushed_heading: None,
            heading_updates_enabled: false,
            view_mode: ViewMode::default(),
            location_status: SensorStatus::default(),
            heading_status: SensorStatus::default(),
            updated_at: None,
        }
    }

    /// Store a new fix and recompute the bearing to the target
    pub fn update_location(&mut self, location: GeoCoordinate) -> f64 {
        let bearing = compute_bearing_with(self.settings.formula, location, self.settings.target);
        self.location = Some(location);
        self.bearing = Some(bearing);
        self.location_status = SensorStatus::Active;
        self.updated_at = Some(Utc::now());
        bearing
    }

    /// Store a new heading, returns whether it moved far enough from the last pushed heading that
    /// the display should be updated.
    pub fn update_heading(&mut self, reading: &HeadingReading) -> bool {
        let Some(heading) = reading.effective() else {
            return false;
        };

        self.heading = Some(heading);
        self.heading_status = SensorStatus::Active;
        self.updated_at = Some(reading.timestamp);

        let passes = self.last_pushed_heading.is_none_or(|last| {
            signed_turn(relative_direction(heading, last)).abs()
                >= self.settings.heading_filter_degrees
        });

        if passes {
            self.last_pushed_heading = Some(heading);
        }

        passes
    }

    pub fn set_location_status<T>(&mut self, event: &SensorEvent<T>) {
        self.location_status = SensorStatus::from_event(event);
    }

    pub fn set_heading_status<T>(&mut self, event: &SensorEvent<T>) {
        self.heading_status = SensorStatus::from_event(event);
    }

    pub fn end_location(&mut self) {
        self.location_status = SensorStatus::Ended;
    }

    pub fn end_heading(&mut self) {
        self.heading_status = SensorStatus::Ended;
    }

    pub fn location_ended(&self) -> bool {
        self.location_status == SensorStatus::Ended
    }

    pub fn heading_ended(&self) -> bool {
        self.heading_status == SensorStatus::Ended
    }

    pub fn heading_updates_enabled(&self) -> bool {
        self.heading_updates_enabled
    }

    /// Returns whether the flag actually changed
    pub fn set_heading_updates(&mut self, enabled: bool) -> bool {
        let changed = self.heading_updates_enabled != enabled;
        self.heading_updates_enabled = enabled;
        if !enabled {
            // Make sure the first heading after resuming always gets through
            self.last_pushed_heading = None;
        }
        changed
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn location(&self) -> Option<GeoCoordinate> {
        self.location
    }

    pub fn bearing(&self) -> Option<f64> {
        self.bearing
    }

    pub fn heading(&self) -> Option<f64> {
        self.heading
    }

    /// Degrees to turn clockwise to face the target, needs both a fix and a heading
    pub fn relative_direction(&self) -> Option<f64> {
        Some(relative_direction(self.bearing?, self.heading?))
    }

    pub fn path(&self) -> Option<PathOverlay> {
        self.location
            .map(|loc| PathOverlay::new(loc, self.settings.target))
    }

    /// The area of the map the display should show for the current [ViewMode]
    pub fn region(&self) -> Option<Region> {
        match self.view_mode {
            ViewMode::FollowHeading => self
                .location
                .map(|loc| Region::around(loc, FOLLOW_REGION_METERS)),
            ViewMode::FullPath => self
                .path()
                .map(|path| path.region().padded(FULL_PATH_PADDING)),
        }
    }

    pub fn as_ui_state(&self) -> CompassUiState {
        let relative = self.relative_direction();
        let path = self.path();
        CompassUiState {
            location: self.location,
            target: self.settings.target,
            bearing: self.bearing,
            heading: self.heading,
            relative_direction: relative,
            label: relative.map(direction_label),
            distance_km: path.map(|p| p.distance_km()),
            path,
            region: self.region(),
            view_mode: self.view_mode,
            location_status: self.location_status.clone(),
            heading_status: self.heading_status.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Subset of [TrackerState] that is meant to be sent to a display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompassUiState {
    /// The user's last known location
    pub location: Option<GeoCoordinate>,
    /// Where bearings point to
    pub target: GeoCoordinate,
    /// Bearing from the user to the target, clockwise from true north
    pub bearing: Option<f64>,
    /// The direction the device is facing
    pub heading: Option<f64>,
    /// How far clockwise the user needs to turn to face the target, in [0, 360)
    pub relative_direction: Option<f64>,
    /// [Self::relative_direction] formatted for display
    pub label: Option<String>,
    pub distance_km: Option<f64>,
    /// Line from the user to the target
    pub path: Option<PathOverlay>,
    /// The part of the map to show
    pub region: Option<Region>,
    pub view_mode: ViewMode,
    pub location_status: SensorStatus,
    pub heading_status: SensorStatus,
    /// When any reading last changed **in UTC**
    pub updated_at: Option<UtcDT>,
}
