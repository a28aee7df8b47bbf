use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::protocol::{self, BalanceUpdate, InboundEvent};

const KEEP_ALIVE: Duration = Duration::from_secs(10);
const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);
const INBOUND_BUFFER: usize = 256;

/// Handle to the shared MQTT connection.
///
/// Cloning is cheap and clones may publish concurrently. A background task
/// owns the event loop: it resubscribes after every reconnect, decodes
/// inbound publishes, and retries a lost connection every five seconds for
/// the life of the process. Nothing here ever surfaces an error to callers.
#[derive(Clone)]
pub struct BrokerClient {
    client: AsyncClient,
    topic_prefix: String,
    connected: Arc<AtomicBool>
}

impl BrokerClient {
    /// Starts the connection and returns the client handle plus the stream
    /// of decoded inbound events.
    pub fn start(config: &Config) -> (Self, mpsc::Receiver<InboundEvent>) {
        let mut options = MqttOptions::new(
            config.mqtt_client_id.clone(),
            config.mqtt_host.clone(),
            config.mqtt_port
        );
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);

        let (client, event_loop) = AsyncClient::new(options, INBOUND_BUFFER);
        let (sender, receiver) = mpsc::channel(INBOUND_BUFFER);
        let connected = Arc::new(AtomicBool::new(false));

        let broker = Self {
            client: client.clone(),
            topic_prefix: config.mqtt_topic_prefix.clone(),
            connected: connected.clone()
        };

        let topics = vec![
            protocol::topic(&config.mqtt_topic_prefix, protocol::STATUS_SUFFIX),
            protocol::topic(&config.mqtt_topic_prefix, protocol::BALANCE_SUFFIX)
        ];

        tokio::spawn(drive(event_loop, client, topics, sender, connected));

        (broker, receiver)
    }

    /// Whether the broker connection is currently up, for health reporting.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Best-effort publish of a balance update to the device side.
    ///
    /// Failures are logged and swallowed; a top-up never fails because the
    /// broker is down.
    pub async fn publish_balance(&self, update: &BalanceUpdate) {
        let topic = protocol::topic(&self.topic_prefix, protocol::BALANCE_SUFFIX);

        let payload = match serde_json::to_vec(update) {
            Ok(payload) => payload,
            Err(error) => {
                error!("Balance update for [{}] could not be encoded: {error}", update.uid);
                return;
            }
        };

        if let Err(error) = self.client.publish(topic, QoS::AtLeastOnce, false, payload).await {
            error!("MQTT publish failed: {error}");
        }
    }
}

async fn drive(
    mut event_loop: EventLoop,
    client: AsyncClient,
    topics: Vec<String>,
    sender: mpsc::Sender<InboundEvent>,
    connected: Arc<AtomicBool>
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                connected.store(true, Ordering::Relaxed);
                info!("Connected to MQTT broker");

                for topic in &topics {
                    match client.subscribe(topic.clone(), QoS::AtLeastOnce).await {
                        Ok(_) => info!("Subscribed to [{topic}]"),
                        Err(error) => error!("Subscribe to [{topic}] failed: {error}")
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match InboundEvent::decode(&publish.topic, &publish.payload) {
                    Ok(Some(event)) => {
                        debug!("MQTT rx on [{}]", publish.topic);

                        if sender.try_send(event).is_err() {
                            warn!("Inbound event buffer full, dropping message from [{}]", publish.topic);
                        }
                    }
                    Ok(None) => {}
                    Err(error) => warn!("Invalid MQTT message on [{}]: {error}", publish.topic)
                }
            }
            Ok(_) => {}
            Err(error) => {
                connected.store(false, Ordering::Relaxed);
                warn!("MQTT connection lost: {error}, retrying in {RECONNECT_INTERVAL:?}");
                sleep(RECONNECT_INTERVAL).await;
            }
        }
    }
}
