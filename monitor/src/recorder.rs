//! Concurrent recording front-end for [`EventStore`]
//!
//! A single tokio task owns the store and applies commands in arrival order.
//! Producers hold cheap clones of [`EventRecorder`] and validate observations
//! before sending, so a malformed observation is reported to the producer
//! rather than lost inside the task. Readers take a snapshot (a clone of the
//! store) and reduce over it without blocking producers.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{MonitorError, Result};
use crate::observation::Observation;
use crate::store::EventStore;

/// Default command channel capacity
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug)]
enum RecorderCommand {
    Record(Observation),
    Snapshot(oneshot::Sender<EventStore>),
    Clear,
    Shutdown(oneshot::Sender<EventStore>),
}

#[derive(Debug, Clone)]
pub struct EventRecorder {
    command_tx: mpsc::Sender<RecorderCommand>,
}

impl EventRecorder {
    /// Spawn the recorder task on the current runtime
    pub fn spawn(store: EventStore, capacity: usize) -> Self {
        let (command_tx, command_rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(run(store, command_rx));
        Self { command_tx }
    }

    pub async fn record(&self, observation: Observation) -> Result<()> {
        observation.validate()?;
        self.send(RecorderCommand::Record(observation)).await
    }

    /// A point-in-time copy of the store, including every record sent before this call
    pub async fn snapshot(&self) -> Result<EventStore> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RecorderCommand::Snapshot(reply_tx)).await?;
        reply_rx.await.map_err(|_| MonitorError::RecorderClosed)
    }

    pub async fn clear(&self) -> Result<()> {
        self.send(RecorderCommand::Clear).await
    }

    /// Stop the task and hand back the final store
    pub async fn shutdown(self) -> Result<EventStore> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RecorderCommand::Shutdown(reply_tx)).await?;
        reply_rx.await.map_err(|_| MonitorError::RecorderClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    async fn send(&self, command: RecorderCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| MonitorError::RecorderClosed)
    }
}

async fn run(mut store: EventStore, mut command_rx: mpsc::Receiver<RecorderCommand>) {
    while let Some(command) = command_rx.recv().await {
        match command {
            RecorderCommand::Record(observation) => {
                if let Err(e) = store.record(observation) {
                    warn!("Recorder dropped observation: {}", e);
                }
            }
            RecorderCommand::Snapshot(reply) => {
                let _ = reply.send(store.clone());
            }
            RecorderCommand::Clear => store.clear(),
            RecorderCommand::Shutdown(reply) => {
                command_rx.close();
                debug!("Recorder shutting down with {} observations", store.len());
                let _ = reply.send(store);
                return;
            }
        }
    }
    debug!("Recorder stopped: all handles dropped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{ErrorEvent, ObservationKind, Rating, WebVital};

    #[tokio::test]
    async fn test_concurrent_producers() {
        let recorder = EventRecorder::spawn(EventStore::new(), 16);

        let mut tasks = Vec::new();
        for producer in 0..4 {
            let recorder = recorder.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..25 {
                    let value = (producer * 100 + i) as f64;
                    recorder
                        .record(WebVital::new("LCP", value, Rating::Good).into())
                        .await
                        .unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let snapshot = recorder.snapshot().await.unwrap();
        assert_eq!(snapshot.len_of(ObservationKind::WebVital), 100);
    }

    #[test]
    fn test_clear_from_blocking_caller() {
        tokio_test::block_on(async {
            let recorder = EventRecorder::spawn(EventStore::new(), 4);
            recorder
                .record(WebVital::new("TTFB", 300.0, Rating::Good).into())
                .await
                .unwrap();
            recorder.clear().await.unwrap();
            let store = recorder.shutdown().await.unwrap();
            assert!(store.is_empty());
        });
    }

    #[tokio::test]
    async fn test_invalid_observation_rejected_at_producer() {
        let recorder = EventRecorder::spawn(EventStore::new(), 4);
        let err = recorder
            .record(ErrorEvent::new("", "network").into())
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::Validation(_)));
        assert!(recorder.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_is_independent_copy() {
        let recorder = EventRecorder::spawn(EventStore::new(), 4);
        recorder
            .record(WebVital::new("FID", 80.0, Rating::Good).into())
            .await
            .unwrap();

        let before = recorder.snapshot().await.unwrap();
        recorder.clear().await.unwrap();
        let after = recorder.snapshot().await.unwrap();

        assert_eq!(before.len(), 1);
        assert!(after.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_returns_store_and_closes() {
        let recorder = EventRecorder::spawn(EventStore::with_max_events(2), 4);
        let producer = recorder.clone();
        for value in [1.0, 2.0, 3.0] {
            producer
                .record(WebVital::new("CLS", value, Rating::Good).into())
                .await
                .unwrap();
        }

        let store = recorder.shutdown().await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.web_vitals().next().unwrap().value, 2.0);

        let err = producer
            .record(WebVital::new("CLS", 4.0, Rating::Good).into())
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::RecorderClosed));
    }
}
