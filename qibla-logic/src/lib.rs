mod bearing;
mod display;
mod location;
mod path;
mod settings;
mod tracker;
mod tracker_state;

pub use bearing::{
    BearingFormula, compute_bearing, compute_bearing_with, normalize_degrees, relative_direction,
    signed_turn,
};
pub use display::direction_label;
pub use location::{
    GeoCoordinate, HeadingReading, HeadingSource, KAABA, LocationComponent, LocationSource,
    SensorEvent,
};
pub use path::{PathOverlay, Region, great_circle_distance_km};
pub use settings::TrackerSettings;
pub use tracker::{DirectionUpdateSender, QiblaTracker, UtcDT};
pub use tracker_state::{CompassUiState, SensorStatus, TrackerState, ViewMode};

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
