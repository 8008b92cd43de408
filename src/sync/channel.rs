use crate::sync::refresh::RefreshScheduler;
use crate::view::{StatusLevel, ViewSink};
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Literal keepalive token; the server may answer with `pong`.
pub const KEEPALIVE_TOKEN: &str = "ping";

/// Lifecycle of the push channel. Transitions are driven only by channel
/// events, never by application logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    ClosedPendingRetry,
}

/// Server-pushed notification, discriminated on the `type` field. Payload
/// fields beyond the discriminator are informational; every recognized event
/// triggers a full tunnel refresh rather than an incremental update.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelEvent {
    InitialState {},
    TunnelCreated {
        #[serde(default)]
        tunnel_id: Option<String>,
    },
    TunnelStopped {
        #[serde(default)]
        tunnel_id: Option<String>,
    },
    AllTunnelsStopped {
        #[serde(default)]
        count: Option<u32>,
    },
    #[serde(other)]
    Unrecognized,
}

/// Owns the push connection: connect, keepalive, reconnect, dispatch.
///
/// On close the supervisor schedules exactly one reconnect attempt after a
/// fixed delay; there is no backoff growth and no attempt cap, so the channel
/// eventually reconnects as long as the process lives.
pub struct ChannelSupervisor {
    ws_url: String,
    sink: Arc<dyn ViewSink>,
    refresh: Arc<RefreshScheduler>,
    keepalive_period: Duration,
    reconnect_delay: Duration,
    state: Arc<RwLock<ConnectionState>>,
}

impl ChannelSupervisor {
    pub fn new(
        ws_url: String,
        sink: Arc<dyn ViewSink>,
        refresh: Arc<RefreshScheduler>,
        keepalive_period: Duration,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            ws_url,
            sink,
            refresh,
            keepalive_period,
            reconnect_delay,
            state: Arc::new(RwLock::new(ConnectionState::Connecting)),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Connect-forever loop for the lifetime of the client.
    pub async fn run(self: Arc<Self>) {
        loop {
            *self.state.write().await = ConnectionState::Connecting;
            match self.connect_and_run().await {
                Ok(()) => info!("Channel disconnected"),
                Err(e) => warn!("Channel connection error: {}", e),
            }
            *self.state.write().await = ConnectionState::ClosedPendingRetry;
            debug!("Reconnecting channel in {:?}", self.reconnect_delay);
            sleep(self.reconnect_delay).await;
        }
    }

    async fn connect_and_run(&self) -> Result<()> {
        info!("Connecting to channel: {}", self.ws_url);
        let (ws_stream, _) = connect_async(&self.ws_url)
            .await
            .context("Failed to connect to channel")?;
        info!("Channel connection established");
        *self.state.write().await = ConnectionState::Open;

        let (mut write, mut read) = ws_stream.split();

        let mut keepalive = interval(self.keepalive_period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Skip);
        keepalive.tick().await; // the first tick completes immediately

        loop {
            tokio::select! {
                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.handle_frame(&text).await,
                        Some(Ok(Message::Close(_))) => {
                            info!("Channel closed by server");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Channel read error: {}", e);
                            break;
                        }
                        None => break,
                    }
                }
                _ = keepalive.tick() => {
                    // The keepalive never initiates reconnection; while the
                    // channel is not open the tick does nothing.
                    if *self.state.read().await != ConnectionState::Open {
                        continue;
                    }
                    if let Err(e) = write.send(Message::Text(KEEPALIVE_TOKEN.to_string())).await {
                        warn!("Keepalive send failed: {}", e);
                        break;
                    }
                    debug!("Sent channel keepalive");
                }
            }
        }

        Ok(())
    }

    async fn handle_frame(&self, text: &str) {
        if text == "pong" || text == KEEPALIVE_TOKEN {
            debug!("Channel keepalive exchange");
            return;
        }
        match serde_json::from_str::<ChannelEvent>(text) {
            Ok(event) => self.handle_event(event).await,
            Err(e) => debug!("Ignoring unparseable channel frame: {}", e),
        }
    }

    async fn handle_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::InitialState {} => {
                debug!("Channel initial state received");
                self.refresh.refresh_tunnels().await;
            }
            ChannelEvent::TunnelCreated { tunnel_id }
            | ChannelEvent::TunnelStopped { tunnel_id } => {
                debug!("Tunnel lifecycle event for {:?}", tunnel_id);
                self.refresh.refresh_tunnels().await;
                self.sink.toast(StatusLevel::Success, "Tunnel updated");
            }
            ChannelEvent::AllTunnelsStopped { count } => {
                debug!("All tunnels stopped ({:?})", count);
                self.refresh.refresh_tunnels().await;
                self.sink.toast(StatusLevel::Success, "Tunnel updated");
            }
            ChannelEvent::Unrecognized => {
                debug!("Ignoring unrecognized channel event");
            }
        }
    }
}
