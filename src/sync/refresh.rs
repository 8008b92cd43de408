use crate::api::ApiClient;
use crate::view::ViewSink;
use log::warn;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Periodic and on-demand pull of the two server-owned collections.
///
/// Each refresh fetches the full collection and hands it to the sink
/// wholesale; there is no diffing or in-place patching, so overlapping
/// refreshes are safe and the last response to complete wins. The two loops
/// are independent and never touch each other's collection.
pub struct RefreshScheduler {
    api: Arc<ApiClient>,
    sink: Arc<dyn ViewSink>,
    tunnel_period: Duration,
    history_period: Duration,
}

impl RefreshScheduler {
    pub fn new(
        api: Arc<ApiClient>,
        sink: Arc<dyn ViewSink>,
        tunnel_period: Duration,
        history_period: Duration,
    ) -> Self {
        Self {
            api,
            sink,
            tunnel_period,
            history_period,
        }
    }

    /// Pull the tunnel collection and replace the rendered view. A failed
    /// fetch is logged and the current render is left as-is.
    pub async fn refresh_tunnels(&self) {
        match self.api.list_tunnels().await {
            Ok(tunnels) => self.sink.render_tunnels(&tunnels),
            Err(e) => warn!("Tunnel refresh failed: {}", e),
        }
    }

    /// Pull the scan history and replace the rendered view.
    pub async fn refresh_scan_history(&self) {
        match self.api.list_scans().await {
            Ok(scans) => self.sink.render_scan_history(&scans),
            Err(e) => warn!("Scan history refresh failed: {}", e),
        }
    }

    /// Start both periodic loops. They run for the life of the process and
    /// are never cancelled; a failed tick never disables the loop.
    pub fn spawn_loops(self: &Arc<Self>) {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(scheduler.tunnel_period);
            ticker.tick().await; // the first tick completes immediately
            loop {
                ticker.tick().await;
                scheduler.refresh_tunnels().await;
            }
        });

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(scheduler.history_period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                scheduler.refresh_scan_history().await;
            }
        });
    }
}
