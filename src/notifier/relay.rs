use tokio::sync::mpsc::Receiver;
use tracing::debug;

use crate::notifier::SessionRegistry;
use crate::protocol::InboundEvent;

/// Fans inbound broker events out to every connected dashboard session.
///
/// Runs until the broker side of the channel closes, which only happens at
/// process shutdown.
pub async fn run(mut events: Receiver<InboundEvent>, sessions: SessionRegistry) {
    while let Some(event) = events.recv().await {
        let frame = event.push_frame().to_string();

        debug!("Relaying {} to {} session(s)", event.push_event(), sessions.count());
        sessions.broadcast(&frame);
    }
}
