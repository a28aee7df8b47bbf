use std::net::SocketAddr;

use anyhow::{bail, Context, Result};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8208";
const DEFAULT_BROKER_URL: &str = "mqtt://broker.hivemq.com:1883";
const DEFAULT_MQTT_PORT: u16 = 1883;

/// Process configuration, loaded once at startup.
///
/// Everything has a default except `DATABASE_URL`: without a storage
/// location the relay refuses to start.
pub struct Config {
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_client_id: String,
    pub mqtt_topic_prefix: String,
    pub allowed_origins: Vec<String>
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr = env_or("TAP_LISTEN_ADDR", DEFAULT_LISTEN_ADDR)
            .parse()
            .context("Invalid TAP_LISTEN_ADDR")?;

        let database_url = std::env::var("DATABASE_URL")
            .context("Missing DATABASE_URL (e.g. sqlite://tap-relay.db)")?;

        let (mqtt_host, mqtt_port) = parse_broker_url(&env_or("MQTT_BROKER_URL", DEFAULT_BROKER_URL))?;

        let allowed_origins = env_or("ALLOWED_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            listen_addr,
            database_url,
            mqtt_host,
            mqtt_port,
            mqtt_client_id: env_or("MQTT_CLIENT_ID", "tap-relay"),
            mqtt_topic_prefix: env_or("MQTT_TOPIC_PREFIX", "rfid/"),
            allowed_origins
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Splits `mqtt://host:port` (scheme and port optional) into host and port.
fn parse_broker_url(url: &str) -> Result<(String, u16)> {
    let stripped = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port) = match stripped.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse().with_context(|| format!("Invalid broker port in [{url}]"))?;
            (host, port)
        }
        None => (stripped, DEFAULT_MQTT_PORT)
    };

    if host.is_empty() {
        bail!("Broker URL [{url}] has no host");
    }

    Ok((host.to_string(), port))
}
