//! Cancellable subscription to the shared room.
//!
//! The store's real-time feed is surfaced as a worker future plus an event
//! stream. The worker polls the store's ordered query and pushes a full
//! snapshot whenever the payload changes; dropping the stream cancels the
//! worker, so a subscription can never outlive the view that acquired it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::RoomStore;
use crate::types::GlobalMessageRecord;

pub const DEFAULT_ROOM_POLL_INTERVAL: Duration = Duration::from_millis(1500);

pub type RoomWorker = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// One full snapshot of the room, already ordered by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub messages: Vec<GlobalMessageRecord>,
}

pub struct RoomSubscription {
    events: mpsc::UnboundedReceiver<RoomSnapshot>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

pub struct RoomSubscriptionHandle {
    pub stream: RoomSubscription,
    pub worker: RoomWorker,
}

impl RoomSubscription {
    pub async fn recv(&mut self) -> Option<RoomSnapshot> {
        self.events.recv().await
    }

    pub fn cancel(&mut self) -> bool {
        self.cancel_tx
            .take()
            .map(|cancel_tx| cancel_tx.send(()).is_ok())
            .unwrap_or(false)
    }
}

impl Drop for RoomSubscription {
    fn drop(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

pub fn subscribe_room<S>(store: Arc<S>, poll_interval: Duration) -> RoomSubscriptionHandle
where
    S: RoomStore + ?Sized + 'static,
{
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();

    let worker: RoomWorker = Box::pin(run_room_worker(store, poll_interval, event_tx, cancel_rx));

    RoomSubscriptionHandle {
        stream: RoomSubscription {
            events: event_rx,
            cancel_tx: Some(cancel_tx),
        },
        worker,
    }
}

async fn run_room_worker<S>(
    store: Arc<S>,
    poll_interval: Duration,
    event_tx: mpsc::UnboundedSender<RoomSnapshot>,
    mut cancel_rx: oneshot::Receiver<()>,
) where
    S: RoomStore + ?Sized,
{
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut last_sent: Option<Vec<GlobalMessageRecord>> = None;

    loop {
        tokio::select! {
            _ = &mut cancel_rx => {
                tracing::debug!("room subscription cancelled");
                break;
            }
            _ = interval.tick() => {
                match store.list_room_messages().await {
                    Ok(messages) => {
                        if last_sent.as_ref() == Some(&messages) {
                            continue;
                        }

                        last_sent = Some(messages.clone());
                        if event_tx.send(RoomSnapshot { messages }).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        // Store failures degrade to a stale list, never a crash.
                        tracing::error!("failed to refresh shared room: {error}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::CloudResult;
    use crate::ids::{GlobalMessageId, UserId};
    use crate::types::NewGlobalMessage;
    use crate::BoxFuture;

    struct ScriptedRoom {
        responses: Mutex<Vec<Vec<GlobalMessageRecord>>>,
    }

    impl ScriptedRoom {
        fn new(mut snapshots: Vec<Vec<GlobalMessageRecord>>) -> Self {
            snapshots.reverse();
            Self {
                responses: Mutex::new(snapshots),
            }
        }
    }

    impl RoomStore for ScriptedRoom {
        fn list_room_messages<'a>(
            &'a self,
        ) -> BoxFuture<'a, CloudResult<Vec<GlobalMessageRecord>>> {
            Box::pin(async move {
                let mut responses = self.responses.lock().expect("lock scripted responses");
                let next = match responses.len() {
                    0 => Vec::new(),
                    1 => responses[0].clone(),
                    _ => responses.pop().expect("non-empty scripted responses"),
                };
                Ok(next)
            })
        }

        fn post_room_message<'a>(
            &'a self,
            _input: NewGlobalMessage,
        ) -> BoxFuture<'a, CloudResult<GlobalMessageRecord>> {
            unreachable!("subscription tests never post");
        }
    }

    fn record(id: &str, at_ms: i64) -> GlobalMessageRecord {
        GlobalMessageRecord {
            id: GlobalMessageId::new(id),
            user_id: UserId::new("u-1"),
            user_name: "Udin".to_string(),
            user_photo: None,
            content: format!("pesan {id}"),
            created_at_unix_ms: at_ms,
        }
    }

    #[tokio::test]
    async fn identical_polls_produce_a_single_snapshot() {
        let first = vec![record("g-1", 10)];
        let store = Arc::new(ScriptedRoom::new(vec![
            first.clone(),
            first.clone(),
            vec![record("g-1", 10), record("g-2", 20)],
        ]));

        let handle = subscribe_room(store, Duration::from_millis(1));
        let mut stream = handle.stream;
        tokio::spawn(handle.worker);

        let snapshot = tokio::time::timeout(Duration::from_secs(1), stream.recv())
            .await
            .expect("first snapshot arrives")
            .expect("stream open");
        assert_eq!(snapshot.messages, first);

        // The repeated identical poll is suppressed; the next event is the grown list.
        let snapshot = tokio::time::timeout(Duration::from_secs(1), stream.recv())
            .await
            .expect("second snapshot arrives")
            .expect("stream open");
        assert_eq!(snapshot.messages.len(), 2);
    }

    #[tokio::test]
    async fn dropping_the_stream_stops_the_worker() {
        let store = Arc::new(ScriptedRoom::new(vec![vec![record("g-1", 10)]]));

        let handle = subscribe_room(store, Duration::from_millis(1));
        let worker = tokio::spawn(handle.worker);

        drop(handle.stream);

        tokio::time::timeout(Duration::from_secs(1), worker)
            .await
            .expect("worker exits after cancellation")
            .expect("worker task joins");
    }
}
