use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use uuid::Uuid;

/// Registry of connected dashboard sessions.
///
/// Sessions register on WebSocket connect and deregister on disconnect; the
/// map stays safe to iterate while sessions come and go. Broadcast is
/// fire-and-forget to every current session, with no per-session targeting.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<Uuid, UnboundedSender<Message>>>
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new())
        }
    }

    pub fn add(&self, id: Uuid, sender: UnboundedSender<Message>) {
        self.sessions.insert(id, sender);
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Sends a text frame to every connected session, pruning sessions whose
    /// channel has closed.
    pub fn broadcast(&self, text: &str) {
        let mut closed = Vec::new();

        for entry in self.sessions.iter() {
            if entry.value().send(Message::Text(text.to_string())).is_err() {
                closed.push(*entry.key());
            }
        }

        for id in closed {
            if self.sessions.remove(&id).is_some() {
                debug!("Pruned closed dashboard session [{id}]");
            }
        }
    }
}
