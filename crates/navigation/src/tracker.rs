//! Turns the raw geolocation and orientation feed into the three outputs the
//! session consumes: jitter-gated routing positions, a heading on every tick
//! and a throttled camera target.

use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use futures::{stream::BoxStream, StreamExt};
use model::geo::{Coordinate, UserPosition};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MOVEMENT_THRESHOLD_M: f64 = 5.0;
pub const DEFAULT_CAMERA_INTERVAL: Duration = Duration::from_secs(1);

const ROUTING_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    PermissionDenied,
    Timeout,
    Unavailable(String),
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "location permission denied"),
            Self::Timeout => write!(f, "timed out waiting for a position fix"),
            Self::Unavailable(why) => write!(f, "position unavailable: {}", why),
        }
    }
}

impl std::error::Error for PositionError {}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Position(UserPosition),
    /// Compass heading in degrees from the device orientation sensor.
    Orientation(f64),
    Error(PositionError),
}

/// Continuous geolocation watch. Dropping the stream unsubscribes.
pub trait PositionSource: Send + Sync {
    fn watch(&self) -> BoxStream<'static, SensorEvent>;
}

#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub movement_threshold_m: f64,
    pub camera_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            movement_threshold_m: DEFAULT_MOVEMENT_THRESHOLD_M,
            camera_interval: DEFAULT_CAMERA_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutingUpdate {
    Position(UserPosition),
    Unavailable(PositionError),
}

/// Everything one sensor event produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TrackerOutput {
    pub routing: Option<RoutingUpdate>,
    pub heading: Option<f64>,
    pub camera: Option<Coordinate>,
}

#[derive(Debug, Default)]
pub struct GeoTracker {
    config: TrackerConfig,
    last_routed: Option<Coordinate>,
    last_camera: Option<DateTime<Utc>>,
    orientation: Option<f64>,
    gps_heading: bool,
}

impl GeoTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn ingest(&mut self, event: SensorEvent) -> TrackerOutput {
        match event {
            SensorEvent::Position(position) => self.ingest_position(position),
            SensorEvent::Orientation(heading) => {
                self.orientation = Some(heading);
                TrackerOutput {
                    // GPS heading wins while the receiver reports one
                    heading: (!self.gps_heading).then_some(heading),
                    ..Default::default()
                }
            }
            SensorEvent::Error(why) => TrackerOutput {
                routing: Some(RoutingUpdate::Unavailable(why)),
                ..Default::default()
            },
        }
    }

    fn ingest_position(&mut self, mut position: UserPosition) -> TrackerOutput {
        self.gps_heading = position.heading.is_some();
        if position.heading.is_none() {
            position.heading = self.orientation;
        }
        let here = position.coordinate();

        let camera = match self.last_camera {
            Some(last)
                if (position.timestamp - last)
                    .to_std()
                    .map_or(true, |elapsed| elapsed < self.config.camera_interval) =>
            {
                None
            }
            _ => {
                self.last_camera = Some(position.timestamp);
                Some(here)
            }
        };

        let moved = self
            .last_routed
            .map_or(true, |last| last.distance_to(&here) >= self.config.movement_threshold_m);
        let heading = position.heading;
        let routing = moved.then(|| {
            self.last_routed = Some(here);
            RoutingUpdate::Position(position)
        });

        TrackerOutput {
            routing,
            heading,
            camera,
        }
    }

    /// Drives the tracker from `source` on a separate task until `cancel`
    /// fires, the source ends, or the routing receiver is dropped.
    pub fn spawn(
        self,
        source: &dyn PositionSource,
        routing_tx: mpsc::Sender<RoutingUpdate>,
        cancel: CancellationToken,
    ) -> TrackerHandle {
        let (heading_tx, heading_rx) = watch::channel(None);
        let (camera_tx, camera_rx) = watch::channel(None);
        let mut events = source.watch();
        let mut tracker = self;
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    event = events.next() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                let output = tracker.ingest(event);
                if let Some(heading) = output.heading {
                    heading_tx.send_replace(Some(heading));
                }
                if let Some(camera) = output.camera {
                    camera_tx.send_replace(Some(camera));
                }
                if let Some(update) = output.routing {
                    if routing_tx.send(update).await.is_err() {
                        break;
                    }
                }
            }
            log::debug!("position watch closed");
        });

        TrackerHandle {
            headings: heading_rx,
            camera: camera_rx,
            cancel,
            task,
        }
    }
}

/// Channel for [`GeoTracker::spawn`].
pub fn routing_channel() -> (mpsc::Sender<RoutingUpdate>, mpsc::Receiver<RoutingUpdate>) {
    mpsc::channel(ROUTING_CHANNEL_CAPACITY)
}

pub struct TrackerHandle {
    pub headings: watch::Receiver<Option<f64>>,
    pub camera: watch::Receiver<Option<Coordinate>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TrackerHandle {
    /// Unsubscribes from the position source and waits for the task to end.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(why) = self.task.await {
            log::warn!("position watch task failed: {}", why);
        }
    }
}

/// Waits for the first position fix, giving up after `timeout`.
pub async fn acquire_initial_fix(
    source: &dyn PositionSource,
    timeout: Duration,
) -> Result<UserPosition, PositionError> {
    let mut events = source.watch();
    let first_fix = async {
        while let Some(event) = events.next().await {
            match event {
                SensorEvent::Position(position) => return Ok(position),
                SensorEvent::Error(why) => return Err(why),
                SensorEvent::Orientation(_) => {}
            }
        }
        Err(PositionError::Unavailable("position source closed".into()))
    };
    tokio::time::timeout(timeout, first_fix)
        .await
        .unwrap_or(Err(PositionError::Timeout))
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Duration as ChronoDuration;
    use futures::stream;

    use super::*;

    /// Replays a fixed list of events to every watcher.
    pub(crate) struct ScriptedSource(pub Vec<SensorEvent>);

    impl PositionSource for ScriptedSource {
        fn watch(&self) -> BoxStream<'static, SensorEvent> {
            stream::iter(self.0.clone()).boxed()
        }
    }

    /// Never yields anything.
    pub(crate) struct SilentSource;

    impl PositionSource for SilentSource {
        fn watch(&self) -> BoxStream<'static, SensorEvent> {
            stream::pending().boxed()
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn reading(north_m: f64, after_ms: i64) -> UserPosition {
        // 1 m of latitude is ~0.000009 degrees
        UserPosition::new(
            14.59 + north_m * 0.000009,
            120.97,
            t0() + ChronoDuration::milliseconds(after_ms),
        )
    }

    #[test]
    fn routing_is_gated_by_movement() {
        let mut tracker = GeoTracker::default();
        let first = tracker.ingest(SensorEvent::Position(reading(0.0, 0)));
        assert!(matches!(first.routing, Some(RoutingUpdate::Position(_))));

        let jitter = tracker.ingest(SensorEvent::Position(reading(3.0, 100)));
        assert_eq!(jitter.routing, None);

        // measured from the last routed position, not the last reading
        let moved = tracker.ingest(SensorEvent::Position(reading(6.0, 200)));
        assert!(matches!(moved.routing, Some(RoutingUpdate::Position(_))));
    }

    #[test]
    fn heading_every_tick_even_when_stationary() {
        let mut tracker = GeoTracker::default();
        let mut position = reading(0.0, 0);
        position.heading = Some(90.0);
        assert_eq!(tracker.ingest(SensorEvent::Position(position)).heading, Some(90.0));

        position.heading = Some(95.0);
        let still = tracker.ingest(SensorEvent::Position(position));
        assert_eq!(still.routing, None);
        assert_eq!(still.heading, Some(95.0));
    }

    #[test]
    fn orientation_fills_missing_gps_heading() {
        let mut tracker = GeoTracker::default();
        assert_eq!(tracker.ingest(SensorEvent::Orientation(180.0)).heading, Some(180.0));
        let output = tracker.ingest(SensorEvent::Position(reading(0.0, 0)));
        assert_eq!(output.heading, Some(180.0));
        match output.routing {
            Some(RoutingUpdate::Position(position)) => assert_eq!(position.heading, Some(180.0)),
            other => panic!("unexpected routing output {:?}", other),
        }

        let mut with_heading = reading(0.0, 100);
        with_heading.heading = Some(10.0);
        tracker.ingest(SensorEvent::Position(with_heading));
        assert_eq!(tracker.ingest(SensorEvent::Orientation(200.0)).heading, None);
    }

    #[test]
    fn camera_throttled_to_interval() {
        let mut tracker = GeoTracker::default();
        assert!(tracker.ingest(SensorEvent::Position(reading(0.0, 0))).camera.is_some());
        assert!(tracker.ingest(SensorEvent::Position(reading(10.0, 400))).camera.is_none());
        assert!(tracker.ingest(SensorEvent::Position(reading(20.0, 999))).camera.is_none());
        assert!(tracker.ingest(SensorEvent::Position(reading(20.0, 1000))).camera.is_some());
    }

    #[test]
    fn camera_throttle_does_not_hold_back_routing() {
        let mut tracker = GeoTracker::default();
        tracker.ingest(SensorEvent::Position(reading(0.0, 0)));
        let output = tracker.ingest(SensorEvent::Position(reading(10.0, 300)));
        assert!(output.camera.is_none());
        assert!(output.routing.is_some());
    }

    #[test]
    fn sensor_errors_are_forwarded() {
        let mut tracker = GeoTracker::default();
        let output = tracker.ingest(SensorEvent::Error(PositionError::PermissionDenied));
        assert_eq!(
            output.routing,
            Some(RoutingUpdate::Unavailable(PositionError::PermissionDenied))
        );
    }

    #[tokio::test]
    async fn spawned_tracker_feeds_channels() {
        let source = ScriptedSource(vec![
            SensorEvent::Position(reading(0.0, 0)),
            SensorEvent::Position(reading(1.0, 100)),
            SensorEvent::Position(reading(8.0, 1200)),
        ]);
        let (routing_tx, mut routing_rx) = routing_channel();
        let handle = GeoTracker::default().spawn(&source, routing_tx, CancellationToken::new());
        let mut routed = vec![];
        while let Some(update) = routing_rx.recv().await {
            routed.push(update);
        }
        assert_eq!(routed.len(), 2);
        assert_eq!(
            *handle.camera.borrow(),
            Some(reading(8.0, 1200).coordinate())
        );
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn cancellation_stops_the_watch() {
        let (routing_tx, mut routing_rx) = routing_channel();
        let handle = GeoTracker::default().spawn(&SilentSource, routing_tx, CancellationToken::new());
        handle.shutdown().await;
        assert!(routing_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn initial_fix_resolves_with_first_position() {
        let source = ScriptedSource(vec![
            SensorEvent::Orientation(12.0),
            SensorEvent::Position(reading(0.0, 0)),
        ]);
        let fix = acquire_initial_fix(&source, Duration::from_secs(5)).await;
        assert_eq!(fix, Ok(reading(0.0, 0)));
    }

    #[tokio::test]
    async fn initial_fix_reports_sensor_error() {
        let source = ScriptedSource(vec![SensorEvent::Error(PositionError::PermissionDenied)]);
        let fix = acquire_initial_fix(&source, Duration::from_secs(5)).await;
        assert_eq!(fix, Err(PositionError::PermissionDenied));
    }

    #[tokio::test]
    async fn initial_fix_times_out() {
        let fix = acquire_initial_fix(&SilentSource, Duration::from_millis(20)).await;
        assert_eq!(fix, Err(PositionError::Timeout));
    }
}
