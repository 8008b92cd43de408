use crate::api::types::ScanState;
use crate::api::ApiClient;
use crate::error::ClientError;
use crate::sync::refresh::RefreshScheduler;
use crate::view::{StatusLevel, ViewSink};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval;

/// One in-flight poll timer, keyed to exactly one scan.
struct PollSession {
    scan_id: String,
    task: JoinHandle<()>,
}

/// Per-scan status polling.
///
/// At most one session exists at any instant: starting a poll for a new scan
/// aborts the previous timer first, whether or not that scan had finished
/// (last-requested-wins, never queued).
pub struct ScanPoller {
    api: Arc<ApiClient>,
    sink: Arc<dyn ViewSink>,
    refresh: Arc<RefreshScheduler>,
    poll_period: Duration,
    session: Arc<Mutex<Option<PollSession>>>,
}

impl ScanPoller {
    pub fn new(
        api: Arc<ApiClient>,
        sink: Arc<dyn ViewSink>,
        refresh: Arc<RefreshScheduler>,
        poll_period: Duration,
    ) -> Self {
        Self {
            api,
            sink,
            refresh,
            poll_period,
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Kick off a scan and begin polling its status.
    ///
    /// An empty target is rejected before any request is sent; a failed
    /// create command is surfaced and no polling starts.
    pub async fn start_scan(self: &Arc<Self>, target: &str) -> Result<(), ClientError> {
        let target = target.trim();
        if target.is_empty() {
            self.sink
                .scan_status(StatusLevel::Error, "Please enter a target");
            return Err(ClientError::Validation("Please enter a target".to_string()));
        }

        self.sink.scan_status(StatusLevel::Info, "Initiating scan...");
        match self.api.start_scan(target).await {
            Ok(started) => {
                self.sink.scan_status(
                    StatusLevel::Info,
                    &format!("Scan started. ID: {}", started.scan_id),
                );
                self.poll(started.scan_id).await;
                Ok(())
            }
            Err(e) => {
                self.sink
                    .scan_status(StatusLevel::Error, &e.user_message("Failed to start scan"));
                Err(e)
            }
        }
    }

    /// Begin polling the given scan, superseding any previous session.
    pub async fn poll(self: &Arc<Self>, scan_id: String) {
        let mut session = self.session.lock().await;
        if let Some(previous) = session.take() {
            debug!(
                "Superseding poll session for scan {} with scan {}",
                previous.scan_id, scan_id
            );
            previous.task.abort();
        }

        let poller = Arc::clone(self);
        let session_id = scan_id.clone();
        let task = tokio::spawn(async move {
            poller.run_session(session_id).await;
        });
        *session = Some(PollSession { scan_id, task });
    }

    /// The scan id currently being polled, if any.
    pub async fn active_scan(&self) -> Option<String> {
        self.session.lock().await.as_ref().map(|s| s.scan_id.clone())
    }

    /// Explicitly stop polling without a terminal status.
    pub async fn cancel(&self) {
        if let Some(previous) = self.session.lock().await.take() {
            debug!("Cancelling poll session for scan {}", previous.scan_id);
            previous.task.abort();
        }
    }

    async fn run_session(&self, scan_id: String) {
        let mut ticker = interval(self.poll_period);
        ticker.tick().await; // the first tick completes immediately

        loop {
            ticker.tick().await;

            // A transient fetch error never cancels the session; the timer
            // keeps retrying until a definitive status arrives.
            let report = match self.api.scan_status(&scan_id).await {
                Ok(report) => report,
                Err(e) => {
                    warn!("Error polling scan {}: {}", scan_id, e);
                    continue;
                }
            };

            match report.status {
                ScanState::Pending | ScanState::Running => {
                    let progress = report.progress.as_deref().unwrap_or("Scanning...");
                    self.sink.scan_status(StatusLevel::Info, progress);
                }
                ScanState::Completed => {
                    info!("Scan {} completed", scan_id);
                    self.sink.scan_status(StatusLevel::Success, "Scan completed!");
                    self.sink
                        .render_services(report.services.as_deref().unwrap_or(&[]));
                    self.finish_session(&scan_id).await;
                    break;
                }
                ScanState::Failed => {
                    let reason = report.error.as_deref().unwrap_or("Unknown error");
                    warn!("Scan {} failed: {}", scan_id, reason);
                    self.sink
                        .scan_status(StatusLevel::Error, &format!("Scan failed: {}", reason));
                    self.finish_session(&scan_id).await;
                    break;
                }
            }
        }
    }

    /// Terminal transition: exactly one scan-history refresh, then release
    /// the session slot if it still belongs to this scan.
    async fn finish_session(&self, scan_id: &str) {
        self.refresh.refresh_scan_history().await;
        let mut session = self.session.lock().await;
        if session.as_ref().is_some_and(|s| s.scan_id == scan_id) {
            *session = None;
        }
    }
}
