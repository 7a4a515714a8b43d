//! Retrieval lifecycle events and observers
//!
//! Observers are advisory: the retriever notifies them synchronously and
//! ignores whatever they do with the event.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::types::ToolRetrievalResult;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetrievalEvent {
    Started { query: String },
    CacheHit { query: String },
    CacheMiss { query: String },
    Completed { result: Box<ToolRetrievalResult> },
    Error { query: String, error: String },
}

impl RetrievalEvent {
    /// Topic name, e.g. for routing to an external bus
    pub fn topic(&self) -> &'static str {
        match self {
            RetrievalEvent::Started { .. } => "retrieval.started",
            RetrievalEvent::CacheHit { .. } => "retrieval.cache_hit",
            RetrievalEvent::CacheMiss { .. } => "retrieval.cache_miss",
            RetrievalEvent::Completed { .. } => "retrieval.completed",
            RetrievalEvent::Error { .. } => "retrieval.error",
        }
    }
}

pub trait RetrievalObserver: Send + Sync {
    fn on_event(&self, event: &RetrievalEvent);
}

/// Writes every event to the `tracing` log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RetrievalObserver for TracingObserver {
    fn on_event(&self, event: &RetrievalEvent) {
        match event {
            RetrievalEvent::Started { query } => debug!(topic = event.topic(), %query, "retrieval started"),
            RetrievalEvent::CacheHit { query } => debug!(topic = event.topic(), %query, "cache hit"),
            RetrievalEvent::CacheMiss { query } => debug!(topic = event.topic(), %query, "cache miss"),
            RetrievalEvent::Completed { result } => info!(
                topic = event.topic(),
                query = %result.query,
                tools = result.tools.len(),
                duration_ms = result.retrieval_time_ms,
                cache_hit = result.metadata.cache_hit,
                "retrieval completed"
            ),
            RetrievalEvent::Error { query, error } => {
                error!(topic = event.topic(), %query, %error, "retrieval failed")
            }
        }
    }
}

/// Fans events out to async subscribers over a broadcast channel.
/// Events sent while nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    sender: broadcast::Sender<RetrievalEvent>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RetrievalEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastObserver {
    fn default() -> Self {
        Self::new(256)
    }
}

impl RetrievalObserver for BroadcastObserver {
    fn on_event(&self, event: &RetrievalEvent) {
        // Err only means there are no receivers
        let _ = self.sender.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_observer_delivers_to_subscribers() {
        let observer = BroadcastObserver::new(8);
        let mut rx = observer.subscribe();

        observer.on_event(&RetrievalEvent::Started { query: "q".into() });
        observer.on_event(&RetrievalEvent::CacheMiss { query: "q".into() });

        assert_eq!(rx.recv().await.unwrap().topic(), "retrieval.started");
        assert_eq!(rx.recv().await.unwrap().topic(), "retrieval.cache_miss");
    }

    #[test]
    fn test_broadcast_without_subscribers_does_not_panic() {
        BroadcastObserver::default().on_event(&RetrievalEvent::Error {
            query: "q".into(),
            error: "boom".into(),
        });
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(RetrievalEvent::CacheHit { query: "q".into() }).unwrap();
        assert_eq!(json["type"], "cache_hit");
        assert_eq!(json["query"], "q");
    }
}
