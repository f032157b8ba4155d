use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// SSE-specific sub-state carved out from [`AppState`](super::AppState): one hub per session.
pub struct SseState {
    hubs: DashMap<String, SseHub>,
    capacity: usize,
}

impl SseState {
    /// Build the SSE registry; every hub gets the same channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to a session's hub, creating the hub on first use.
    pub fn subscribe(&self, code: &str) -> broadcast::Receiver<ServerEvent> {
        self.hubs
            .entry(code.to_owned())
            .or_insert_with(|| SseHub::new(self.capacity))
            .subscribe()
    }

    /// Send an event to the subscribers of a session.
    ///
    /// A hub left without subscribers is dropped.
    pub fn broadcast(&self, code: &str, event: ServerEvent) {
        let delivered = match self.hubs.get(code) {
            Some(hub) => hub.broadcast(event),
            None => return,
        };
        if !delivered {
            self.prune(code);
        }
    }

    /// Drop a session's hub if nobody listens to it anymore.
    pub fn prune(&self, code: &str) {
        self.hubs
            .remove_if(code, |_, hub| hub.subscriber_count() == 0);
    }

    /// Send an event to every session with subscribers.
    pub fn broadcast_all(&self, event: ServerEvent) {
        for hub in self.hubs.iter() {
            hub.broadcast(event.clone());
        }
    }

    /// Drop a session's hub; its subscribers see the stream end.
    pub fn close(&self, code: &str) {
        self.hubs.remove(code);
    }

    /// Number of live hubs.
    pub fn hub_count(&self) -> usize {
        self.hubs.len()
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers; `false` when nobody is listening.
    pub fn broadcast(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Number of live receivers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_only_the_session_hub() {
        let sse = SseState::new(4);
        let mut first = sse.subscribe("AAAA");
        let mut second = sse.subscribe("BBBB");

        sse.broadcast("AAAA", ServerEvent::new(Some("notice".into()), "hi".into()));

        let received = first.recv().await.unwrap();
        assert_eq!(received.data, "hi");
        assert!(second.try_recv().is_err());
    }

    #[test]
    fn hub_without_subscribers_is_dropped_on_broadcast() {
        let sse = SseState::new(4);
        drop(sse.subscribe("AAAA"));
        assert_eq!(sse.hub_count(), 1);

        sse.broadcast("AAAA", ServerEvent::new(None, "x".into()));
        assert_eq!(sse.hub_count(), 0);
    }

    #[test]
    fn prune_keeps_hubs_with_listeners() {
        let sse = SseState::new(4);
        let _listener = sse.subscribe("AAAA");
        drop(sse.subscribe("BBBB"));

        sse.prune("AAAA");
        sse.prune("BBBB");
        sse.prune("CCCC");
        assert_eq!(sse.hub_count(), 1);
    }
}
