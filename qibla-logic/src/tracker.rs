use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::{
    location::{GeoCoordinate, HeadingReading, HeadingSource, LocationSource, SensorEvent},
    prelude::*,
    settings::TrackerSettings,
    tracker_state::{CompassUiState, TrackerState, ViewMode},
};

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

pub trait DirectionUpdateSender {
    fn send_update(&self);
}

/// Struct that keeps the direction to the target up to date, reads fixes from a
/// [LocationSource] and compass readings from a [HeadingSource], and tells the display about
/// changes through a [DirectionUpdateSender].
pub struct QiblaTracker<L: LocationSource, H: HeadingSource, S: DirectionUpdateSender> {
    state: RwLock<TrackerState>,
    location: L,
    heading: H,
    state_update_sender: S,
    cancel: CancellationToken,
}

impl<L: LocationSource, H: HeadingSource, S: DirectionUpdateSender> QiblaTracker<L, H, S> {
    pub fn new(
        settings: TrackerSettings,
        location: L,
        heading: H,
        state_update_sender: S,
    ) -> Result<Self> {
        settings.validate().context("Can't track with these settings")?;

        Ok(Self {
            state: RwLock::new(TrackerState::new(settings)),
            location,
            heading,
            state_update_sender,
            cancel: CancellationToken::new(),
        })
    }

    pub async fn get_ui_state(&self) -> CompassUiState {
        self.state.read().await.as_ui_state()
    }

    fn apply_heading_updates(&self, state: &mut TrackerState, enabled: bool) {
        if !state.set_heading_updates(enabled) {
            return;
        }
        if enabled {
            info!("Starting heading updates");
            self.heading.start_updates();
        } else {
            info!("Stopping heading updates");
            self.heading.stop_updates();
        }
    }

    /// Resume applying compass readings, does nothing if they're already being applied
    pub async fn start_heading_updates(&self) {
        let mut state = self.state.write().await;
        self.apply_heading_updates(&mut state, true);
    }

    /// Stop applying compass readings, does nothing if they're already stopped
    pub async fn stop_heading_updates(&self) {
        let mut state = self.state.write().await;
        self.apply_heading_updates(&mut state, false);
    }

    /// Switch between following the user's heading and showing the full path to the target.
    /// Heading updates are paused while the full path is shown. Returns the new [ViewMode].
    pub async fn toggle_full_path(&self) -> ViewMode {
        let mut state = self.state.write().await;
        let next = match state.view_mode() {
            ViewMode::FollowHeading => ViewMode::FullPath,
            ViewMode::FullPath => ViewMode::FollowHeading,
        };
        self.apply_heading_updates(&mut state, next == ViewMode::FollowHeading);
        state.set_view_mode(next);
        drop(state);
        self.state_update_sender.send_update();
        next
    }

    /// Go back to following the user, resuming heading updates if the full path was shown
    pub async fn focus_user(&self) {
        let mut state = self.state.write().await;
        self.apply_heading_updates(&mut state, true);
        state.set_view_mode(ViewMode::FollowHeading);
        drop(state);
        self.state_update_sender.send_update();
    }

    /// Stop the main loop, this unsubscribes from both sensors
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    fn consume_location(
        &self,
        state: &mut TrackerState,
        event: Option<SensorEvent<GeoCoordinate>>,
    ) {
        match event {
            Some(SensorEvent::Reading(location)) => {
                let bearing = state.update_location(location);
                debug!(
                    "New fix at ({}, {}), bearing to target is {bearing:.2}",
                    location.lat, location.long
                );
            }
            Some(event) => {
                warn!("Location unavailable: {event:?}");
                state.set_location_status(&event);
            }
            None => {
                info!("Location stream ended");
                state.end_location();
            }
        }
        self.state_update_sender.send_update();
    }

    fn consume_heading(
        &self,
        state: &mut TrackerState,
        event: Option<SensorEvent<HeadingReading>>,
    ) {
        match event {
            Some(SensorEvent::Reading(reading)) => {
                if !state.heading_updates_enabled() {
                    return;
                }
                if state.update_heading(&reading) {
                    if let Some(relative) = state.relative_direction() {
                        debug!("Target is {relative:.2}° clockwise");
                    }
                    self.state_update_sender.send_update();
                }
            }
            Some(event) => {
                warn!("Heading unavailable: {event:?}");
                state.set_heading_status(&event);
                self.state_update_sender.send_update();
            }
            None => {
                info!("Heading stream ended");
                state.end_heading();
                self.state_update_sender.send_update();
            }
        }
    }

    /// Main loop of the tracker, handles readings from both sensors until cancelled with
    /// [Self::stop] or until both streams end. Returns the final state if the streams ended.
    pub async fn main_loop(&self) -> Option<CompassUiState> {
        self.start_heading_updates().await;

        let res = 'track: loop {
            let (location_ended, heading_ended) = {
                let state = self.state.read().await;
                (state.location_ended(), state.heading_ended())
            };

            if location_ended && heading_ended {
                break 'track Some(self.get_ui_state().await);
            }

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    break 'track None;
                }

                event = self.location.next_location(), if !location_ended => {
                    let mut state = self.state.write().await;
                    self.consume_location(&mut state, event);
                }

                event = self.heading.next_heading(), if !heading_ended => {
                    let mut state = self.state.write().await;
                    self.consume_heading(&mut state, event);
                }
            }
        };

        self.stop_heading_updates().await;
        info!("Tracker stopped");

        res
    }
}
