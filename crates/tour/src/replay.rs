//! Recorded GPS traces played back as a position source.

use std::{io::Read, time::Duration};

use chrono::DateTime;
use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use model::geo::UserPosition;
use navigation::tracker::{PositionError, PositionSource, SensorEvent};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// One line of a trace file.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceRow {
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
}

impl TraceRow {
    fn into_event(self) -> SensorEvent {
        match DateTime::from_timestamp_millis(self.timestamp) {
            Some(timestamp) => SensorEvent::Position(UserPosition {
                latitude: self.latitude,
                longitude: self.longitude,
                heading: self.heading,
                accuracy: self.accuracy,
                timestamp,
            }),
            None => SensorEvent::Error(PositionError::Unavailable(format!(
                "bad timestamp {}",
                self.timestamp
            ))),
        }
    }
}

pub fn read_trace<R: Read>(reader: R) -> Result<Vec<TraceRow>, csv::Error> {
    let mut reader = csv::Reader::from_reader(reader);
    reader.deserialize().collect()
}

/// Replays a trace, sleeping the recorded gap between rows divided by `speed`.
pub struct ReplaySource {
    rows: Vec<TraceRow>,
    speed: f64,
    finished: CancellationToken,
}

impl ReplaySource {
    pub fn new(rows: Vec<TraceRow>, speed: f64) -> Self {
        Self {
            rows,
            speed,
            finished: CancellationToken::new(),
        }
    }

    /// Fires once a watcher has consumed the whole trace.
    pub fn finished(&self) -> CancellationToken {
        self.finished.clone()
    }

    fn gap(&self, from: &TraceRow, to: &TraceRow) -> Duration {
        if self.speed <= 0.0 {
            return Duration::ZERO;
        }
        let millis = (to.timestamp - from.timestamp).max(0) as f64 / self.speed;
        Duration::from_millis(millis as u64)
    }
}

impl PositionSource for ReplaySource {
    fn watch(&self) -> BoxStream<'static, SensorEvent> {
        let (tx, rx) = mpsc::channel(1);
        let mut paced = Vec::with_capacity(self.rows.len());
        let mut previous: Option<&TraceRow> = None;
        for row in &self.rows {
            let delay = previous.map_or(Duration::ZERO, |previous| self.gap(previous, row));
            paced.push((delay, row.clone()));
            previous = Some(row);
        }

        tokio::spawn(async move {
            for (delay, row) in paced {
                tokio::time::sleep(delay).await;
                // watcher went away
                if tx.send(row.into_event()).await.is_err() {
                    return;
                }
            }
        });

        let finished = self.finished.clone();
        stream::unfold(
            (ReceiverStream::new(rx), finished),
            |(mut events, finished)| async move {
                match events.next().await {
                    Some(event) => Some((event, (events, finished))),
                    None => {
                        finished.cancel();
                        None
                    }
                }
            },
        )
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = "\
timestamp,latitude,longitude,heading,accuracy
1700000000000,14.5890,120.9690,,5
1700000001000,14.5891,120.9691,45,5
1700000002000,14.5893,120.9693,,
";

    #[test]
    fn reads_trace_with_optional_columns() {
        let rows = read_trace(TRACE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].heading, None);
        assert_eq!(rows[0].accuracy, Some(5.0));
        assert_eq!(rows[1].heading, Some(45.0));
        assert_eq!(rows[2].accuracy, None);
    }

    #[tokio::test]
    async fn replays_every_row_then_finishes() {
        let source = ReplaySource::new(read_trace(TRACE.as_bytes()).unwrap(), 0.0);
        let events = source.watch().collect::<Vec<_>>().await;
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[1], SensorEvent::Position(position) if position.heading == Some(45.0)));
        source.finished().cancelled().await;
    }

    #[tokio::test]
    async fn abandoned_watch_does_not_finish() {
        let source = ReplaySource::new(read_trace(TRACE.as_bytes()).unwrap(), 0.0);
        let first = source.watch().next().await;
        assert!(matches!(first, Some(SensorEvent::Position(_))));
        assert!(!source.finished().is_cancelled());
    }

    #[test]
    fn gaps_scale_with_speed() {
        let rows = read_trace(TRACE.as_bytes()).unwrap();
        let source = ReplaySource::new(rows.clone(), 4.0);
        assert_eq!(source.gap(&rows[0], &rows[1]), Duration::from_millis(250));
        let instant = ReplaySource::new(rows.clone(), 0.0);
        assert_eq!(instant.gap(&rows[0], &rows[1]), Duration::ZERO);
    }
}
