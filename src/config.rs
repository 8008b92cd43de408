// Client configuration: server endpoint and timer periods

use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
pub const SERVER_URL_ENV: &str = "TUNNELDECK_SERVER_URL";

pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const TUNNEL_REFRESH_SECS: u64 = 5;
pub const HISTORY_REFRESH_SECS: u64 = 3;
pub const SCAN_POLL_SECS: u64 = 2;
pub const KEEPALIVE_SECS: u64 = 30;
pub const RECONNECT_DELAY_SECS: u64 = 3;

/// Configuration for one client instance.
///
/// The periods default to the server contract values; tests shrink them to
/// keep timer-driven behavior observable without real-time waits.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: Url,
    pub request_timeout: Duration,
    pub tunnel_refresh_period: Duration,
    pub history_refresh_period: Duration,
    pub poll_period: Duration,
    pub keepalive_period: Duration,
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    pub fn new(server_url: Url) -> Self {
        Self {
            server_url,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            tunnel_refresh_period: Duration::from_secs(TUNNEL_REFRESH_SECS),
            history_refresh_period: Duration::from_secs(HISTORY_REFRESH_SECS),
            poll_period: Duration::from_secs(SCAN_POLL_SECS),
            keepalive_period: Duration::from_secs(KEEPALIVE_SECS),
            reconnect_delay: Duration::from_secs(RECONNECT_DELAY_SECS),
        }
    }

    /// Build a config from the environment, falling back to the default
    /// server URL when the override is not set.
    pub fn from_env() -> Result<Self> {
        match std::env::var(SERVER_URL_ENV) {
            Ok(raw) => {
                let url = Url::parse(&raw)
                    .with_context(|| format!("Invalid {} value: {}", SERVER_URL_ENV, raw))?;
                Ok(Self::new(url))
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// The server's REST base, without a trailing slash.
    pub fn api_base(&self) -> String {
        self.server_url.as_str().trim_end_matches('/').to_string()
    }

    /// Derive the push-channel URL from the server URL (http -> ws,
    /// https -> wss).
    pub fn ws_channel_url(&self) -> Result<Url> {
        let mut url = self.server_url.clone();
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(anyhow!("Unsupported server URL scheme: {}", other)),
        };
        url.set_scheme(scheme)
            .map_err(|_| anyhow!("Failed to set channel URL scheme"))?;
        url.set_path("/channel");
        Ok(url)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(Url::parse(DEFAULT_SERVER_URL).expect("default server URL is valid"))
    }
}
