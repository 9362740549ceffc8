use log::{debug, warn};
use qibla_logic::{
    DirectionUpdateSender, GeoCoordinate, HeadingReading, HeadingSource, LocationSource,
    SensorEvent,
};
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::{Mutex, mpsc},
};

type LocationRx = mpsc::Receiver<SensorEvent<GeoCoordinate>>;
type LocationTx = mpsc::Sender<SensorEvent<GeoCoordinate>>;
type HeadingRx = mpsc::Receiver<SensorEvent<HeadingReading>>;
type HeadingTx = mpsc::Sender<SensorEvent<HeadingReading>>;

const CHANNEL_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// One line of input to `qibla track`
pub enum InputEvent {
    Location(GeoCoordinate),
    Heading(HeadingReading),
    LocationUnavailable(String),
    LocationDenied,
    HeadingUnavailable(String),
    HeadingDenied,
    /// Close both streams, same as reaching the end of input
    End,
}

/// Location fixes delivered over a channel
pub struct ChannelLocation(Mutex<LocationRx>);

impl LocationSource for ChannelLocation {
    async fn next_location(&self) -> Option<SensorEvent<GeoCoordinate>> {
        let mut rx = self.0.lock().await;
        rx.recv().await
    }
}

/// Compass readings delivered over a channel
pub struct ChannelHeading(Mutex<HeadingRx>);

impl HeadingSource for ChannelHeading {
    async fn next_heading(&self) -> Option<SensorEvent<HeadingReading>> {
        let mut rx = self.0.lock().await;
        rx.recv().await
    }

    fn start_updates(&self) {
        debug!("Compass readings will be applied");
    }

    fn stop_updates(&self) {
        debug!("Compass readings will be ignored");
    }
}

/// The writing half of both sensor channels
pub struct SensorRouter {
    location: LocationTx,
    heading: HeadingTx,
}

pub fn create_channels() -> (ChannelLocation, ChannelHeading, SensorRouter) {
    let (location_tx, location_rx) = mpsc::channel(CHANNEL_SIZE);
    let (heading_tx, heading_rx) = mpsc::channel(CHANNEL_SIZE);
    (
        ChannelLocation(Mutex::new(location_rx)),
        ChannelHeading(Mutex::new(heading_rx)),
        SensorRouter {
            location: location_tx,
            heading: heading_tx,
        },
    )
}

impl SensorRouter {
    /// Forward an event to the right stream, returns `false` once input should stop
    pub async fn route(&self, event: InputEvent) -> bool {
        match event {
            InputEvent::Location(coord) => self.location.send(coord.into()).await.is_ok(),
            InputEvent::LocationUnavailable(why) => self
                .location
                .send(SensorEvent::Unavailable(why))
                .await
                .is_ok(),
            InputEvent::LocationDenied => self.location.send(SensorEvent::Denied).await.is_ok(),
            InputEvent::Heading(reading) => self.heading.send(reading.into()).await.is_ok(),
            InputEvent::HeadingUnavailable(why) => self
                .heading
                .send(SensorEvent::Unavailable(why))
                .await
                .is_ok(),
            InputEvent::HeadingDenied => self.heading.send(SensorEvent::Denied).await.is_ok(),
            InputEvent::End => false,
        }
    }

    /// Read newline-delimited JSON events and route them until input ends. Both streams are
    /// closed when this returns.
    pub async fn run<R: AsyncBufRead + Unpin>(self, reader: R) {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<InputEvent>(line) {
                        Ok(event) => {
                            if !self.route(event).await {
                                break;
                            }
                        }
                        Err(why) => warn!("Skipping invalid input {line:?}: {why}"),
                    }
                }
                Ok(None) => break,
                Err(why) => {
                    warn!("Failed to read input: {why:?}");
                    break;
                }
            }
        }
        debug!("Input finished, closing sensor streams");
    }
}

/// Tells the output loop that the tracker has something new. Only one notification is kept
/// pending, the output loop always reads the latest state anyway.
pub struct UpdateSender(mpsc::Sender<()>);

impl UpdateSender {
    pub fn new() -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        (Self(tx), rx)
    }
}

impl DirectionUpdateSender for UpdateSender {
    fn send_update(&self) {
        // Full means an update is already pending
        self.0.try_send(()).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::test;

    #[test]
    async fn test_parse_events() {
        let event: InputEvent =
            serde_json::from_str(r#"{"location": {"lat": 1.5, "long": -2.0}}"#).expect("Parse");
        assert_eq!(event, InputEvent::Location(GeoCoordinate::new(1.5, -2.0)));

        let event: InputEvent = serde_json::from_str(r#""location_denied""#).expect("Parse");
        assert_eq!(event, InputEvent::LocationDenied);

        let event: InputEvent =
            serde_json::from_str(r#"{"heading": {"true_heading": 12.0}}"#).expect("Parse");
        assert!(matches!(event, InputEvent::Heading(h) if h.true_heading == 12.0));

        assert!(serde_json::from_str::<InputEvent>(r#"{"altitude": 3}"#).is_err());
    }

    #[test]
    async fn test_run_routes_lines() {
        let (location, heading, router) = create_channels();
        let input = concat!(
            "{\"location\": {\"lat\": 10.0, \"long\": 20.0}}\n",
            "not json\n",
            "\n",
            "{\"heading\": {\"true_heading\": 90.0}}\n",
            "{\"heading_unavailable\": \"Calibrating\"}\n",
            "\"location_denied\"\n",
        );

        router.run(input.as_bytes()).await;

        assert_eq!(
            location.next_location().await,
            Some(SensorEvent::Reading(GeoCoordinate::new(10.0, 20.0)))
        );
        assert_eq!(location.next_location().await, Some(SensorEvent::Denied));
        assert_eq!(location.next_location().await, None);

        assert!(matches!(
            heading.next_heading().await,
            Some(SensorEvent::Reading(h)) if h.true_heading == 90.0
        ));
        assert_eq!(
            heading.next_heading().await,
            Some(SensorEvent::Unavailable("Calibrating".to_string()))
        );
        assert_eq!(heading.next_heading().await, None);
    }

    #[test]
    async fn test_end_stops_input() {
        let (location, _heading, router) = create_channels();
        let input = "\"end\"\n{\"location\": {\"lat\": 1.0, \"long\": 1.0}}\n";

        router.run(input.as_bytes()).await;

        assert_eq!(location.next_location().await, None);
    }

    #[test]
    async fn test_updates_coalesce() {
        let (sender, mut rx) = UpdateSender::new();
        sender.send_update();
        sender.send_update();
        sender.send_update();

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }
}
