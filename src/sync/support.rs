// Test doubles: an in-process stub of the tunnel/scan server plus a
// recording view sink.

use crate::api::types::{
    CreateTunnelResponse, DiscoveredService, ProxyConfigResponse, ProxyInstructions, ScanListResponse,
    ScanRecord, ScanState, ScanStatusReport, TunnelKind, TunnelListResponse, TunnelMetrics,
    TunnelRecord, TunnelStatus,
};
use crate::view::{StatusLevel, ViewSink};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use warp::http::StatusCode;
use warp::{Filter, Reply};

const CLOSE_DIRECTIVE: &str = "__close__";

/// Shared state behind the stub server. Tests script responses and inspect
/// the requests the client made.
pub struct StubState {
    tunnels: Mutex<Vec<TunnelRecord>>,
    scans: Mutex<Vec<ScanRecord>>,
    scripts: Mutex<HashMap<String, VecDeque<ScanStatusReport>>>,
    status_hits: Mutex<HashMap<String, usize>>,
    created: Mutex<Vec<(String, Value)>>,
    stopped: Mutex<Vec<String>>,
    logs: Mutex<HashMap<String, Vec<String>>>,
    last_scan_target: Mutex<Option<String>>,
    tunnel_list_requests: AtomicUsize,
    scan_list_requests: AtomicUsize,
    scan_posts: AtomicUsize,
    stop_all_requests: AtomicUsize,
    proxy_config_requests: AtomicUsize,
    fail_tunnel_list: AtomicBool,
    fail_scan_post: AtomicBool,
    create_error: Mutex<Option<String>>,
    channel_connects: AtomicUsize,
    channel_disconnects: AtomicUsize,
    keepalive_frames: AtomicUsize,
    events_tx: broadcast::Sender<String>,
}

impl StubState {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(32);
        Self {
            tunnels: Mutex::new(Vec::new()),
            scans: Mutex::new(Vec::new()),
            scripts: Mutex::new(HashMap::new()),
            status_hits: Mutex::new(HashMap::new()),
            created: Mutex::new(Vec::new()),
            stopped: Mutex::new(Vec::new()),
            logs: Mutex::new(HashMap::new()),
            last_scan_target: Mutex::new(None),
            tunnel_list_requests: AtomicUsize::new(0),
            scan_list_requests: AtomicUsize::new(0),
            scan_posts: AtomicUsize::new(0),
            stop_all_requests: AtomicUsize::new(0),
            proxy_config_requests: AtomicUsize::new(0),
            fail_tunnel_list: AtomicBool::new(false),
            fail_scan_post: AtomicBool::new(false),
            create_error: Mutex::new(None),
            channel_connects: AtomicUsize::new(0),
            channel_disconnects: AtomicUsize::new(0),
            keepalive_frames: AtomicUsize::new(0),
            events_tx,
        }
    }

    // Builders

    pub fn sample_tunnel(id: &str, kind: TunnelKind) -> TunnelRecord {
        TunnelRecord {
            id: id.to_string(),
            kind,
            status: TunnelStatus::Active,
            ssh_user: "ops".to_string(),
            ssh_host: "bastion.example.com".to_string(),
            local_port: Some(15432),
            remote_host: Some("10.0.0.8".to_string()),
            remote_port: Some(5432),
            bind_address: None,
            remote_bind_port: Some(8443),
            target_host: Some("10.0.0.9".to_string()),
            target_port: Some(443),
            remote_socks_port: Some(1080),
            pid: Some(4242),
            created_at: Some("2024-05-01T10:00:00".to_string()),
            command: Some("ssh -L 15432:10.0.0.8:5432 ops@bastion.example.com".to_string()),
        }
    }

    pub fn sample_scan(id: &str, target: &str) -> ScanRecord {
        ScanRecord {
            id: id.to_string(),
            target: target.to_string(),
            status: ScanState::Completed,
            scan_type: Some("full".to_string()),
            progress: None,
            error: None,
            services: None,
            service_count: Some(0),
            created_at: Some("2024-05-01T10:00:00".to_string()),
        }
    }

    pub fn report(status: ScanState, progress: Option<&str>) -> ScanStatusReport {
        ScanStatusReport {
            status,
            progress: progress.map(str::to_string),
            error: None,
            services: None,
        }
    }

    pub fn completed_report(services: Vec<DiscoveredService>) -> ScanStatusReport {
        ScanStatusReport {
            status: ScanState::Completed,
            progress: Some("Scan completed".to_string()),
            error: None,
            services: Some(services),
        }
    }

    pub fn failed_report(error: Option<&str>) -> ScanStatusReport {
        ScanStatusReport {
            status: ScanState::Failed,
            progress: None,
            error: error.map(str::to_string),
            services: None,
        }
    }

    pub fn service(port: &str, service: &str, state: &str) -> DiscoveredService {
        DiscoveredService {
            port: port.to_string(),
            service: service.to_string(),
            state: state.to_string(),
        }
    }

    // Scripting

    pub fn push_tunnel(&self, tunnel: TunnelRecord) {
        self.tunnels.lock().unwrap().push(tunnel);
    }

    pub fn clear_tunnels(&self) {
        self.tunnels.lock().unwrap().clear();
    }

    pub fn push_scan(&self, scan: ScanRecord) {
        self.scans.lock().unwrap().push(scan);
    }

    /// Script the status sequence for one scan id. The final report keeps
    /// repeating once the earlier ones are consumed.
    pub fn script_status(&self, scan_id: &str, reports: Vec<ScanStatusReport>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(scan_id.to_string(), reports.into());
    }

    pub fn set_logs(&self, tunnel_id: &str, logs: Vec<String>) {
        self.logs.lock().unwrap().insert(tunnel_id.to_string(), logs);
    }

    pub fn fail_tunnel_list(&self, fail: bool) {
        self.fail_tunnel_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_scan_post(&self, fail: bool) {
        self.fail_scan_post.store(fail, Ordering::SeqCst);
    }

    pub fn fail_create(&self, detail: &str) {
        *self.create_error.lock().unwrap() = Some(detail.to_string());
    }

    pub fn push_event(&self, event: &str) {
        let _ = self.events_tx.send(event.to_string());
    }

    /// Make the server close the active channel connection.
    pub fn close_channel(&self) {
        let _ = self.events_tx.send(CLOSE_DIRECTIVE.to_string());
    }

    // Inspection

    pub fn tunnel_list_requests(&self) -> usize {
        self.tunnel_list_requests.load(Ordering::SeqCst)
    }

    pub fn scan_list_requests(&self) -> usize {
        self.scan_list_requests.load(Ordering::SeqCst)
    }

    pub fn scan_posts(&self) -> usize {
        self.scan_posts.load(Ordering::SeqCst)
    }

    pub fn stop_all_requests(&self) -> usize {
        self.stop_all_requests.load(Ordering::SeqCst)
    }

    pub fn proxy_config_requests(&self) -> usize {
        self.proxy_config_requests.load(Ordering::SeqCst)
    }

    pub fn last_scan_target(&self) -> Option<String> {
        self.last_scan_target.lock().unwrap().clone()
    }

    pub fn status_hits(&self, scan_id: &str) -> usize {
        self.status_hits
            .lock()
            .unwrap()
            .get(scan_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn status_hits_total(&self) -> usize {
        self.status_hits.lock().unwrap().values().sum()
    }

    pub fn created_tunnels(&self) -> Vec<(String, Value)> {
        self.created.lock().unwrap().clone()
    }

    pub fn stopped_tunnels(&self) -> Vec<String> {
        self.stopped.lock().unwrap().clone()
    }

    pub fn channel_connects(&self) -> usize {
        self.channel_connects.load(Ordering::SeqCst)
    }

    pub fn channel_disconnects(&self) -> usize {
        self.channel_disconnects.load(Ordering::SeqCst)
    }

    pub fn keepalive_frames(&self) -> usize {
        self.keepalive_frames.load(Ordering::SeqCst)
    }
}

fn error_reply(status: StatusCode, detail: &str) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&json!({ "detail": detail })), status)
        .into_response()
}

async fn channel_session(socket: warp::ws::WebSocket, state: Arc<StubState>) {
    let mut events = state.events_tx.subscribe();
    state.channel_connects.fetch_add(1, Ordering::SeqCst);
    let (mut tx, mut rx) = socket.split();

    loop {
        tokio::select! {
            frame = rx.next() => {
                match frame {
                    Some(Ok(message)) if message.is_text() => {
                        let text = message.to_str().unwrap_or_default().to_string();
                        if text == "ping" {
                            state.keepalive_frames.fetch_add(1, Ordering::SeqCst);
                            let _ = tx.send(warp::ws::Message::text("pong")).await;
                        }
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) if event == CLOSE_DIRECTIVE => {
                        let _ = tx.send(warp::ws::Message::close()).await;
                        break;
                    }
                    Ok(event) => {
                        if tx.send(warp::ws::Message::text(event)).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        }
    }

    state.channel_disconnects.fetch_add(1, Ordering::SeqCst);
}

/// Spin up the stub server on an ephemeral port and return its address.
pub async fn stub_server(state: Arc<StubState>) -> SocketAddr {
    let with_state = {
        let state = state.clone();
        warp::any().map(move || state.clone())
    };

    let list_tunnels = warp::get()
        .and(warp::path!("tunnels"))
        .and(with_state.clone())
        .map(|state: Arc<StubState>| {
            state.tunnel_list_requests.fetch_add(1, Ordering::SeqCst);
            if state.fail_tunnel_list.load(Ordering::SeqCst) {
                return error_reply(StatusCode::INTERNAL_SERVER_ERROR, "tunnel list unavailable");
            }
            let tunnels = state.tunnels.lock().unwrap().clone();
            warp::reply::json(&TunnelListResponse { tunnels }).into_response()
        });

    let create_tunnel = warp::post()
        .and(warp::path!("tunnels" / String))
        .and(with_state.clone())
        .and(warp::body::json())
        .map(|variant: String, state: Arc<StubState>, body: Value| {
            if let Some(detail) = state.create_error.lock().unwrap().clone() {
                return error_reply(StatusCode::BAD_REQUEST, &detail);
            }
            state.created.lock().unwrap().push((variant, body));
            warp::reply::json(&CreateTunnelResponse {
                tunnel_id: "t-new".to_string(),
                command: "ssh -L 15432:10.0.0.8:5432 ops@bastion.example.com".to_string(),
                tunnel: None,
            })
            .into_response()
        });

    let tunnel_detail = warp::get()
        .and(warp::path!("tunnels" / String))
        .and(with_state.clone())
        .map(|id: String, state: Arc<StubState>| {
            let tunnels = state.tunnels.lock().unwrap();
            match tunnels.iter().find(|t| t.id == id) {
                Some(tunnel) => warp::reply::json(tunnel).into_response(),
                None => error_reply(StatusCode::NOT_FOUND, "Tunnel not found"),
            }
        });

    let tunnel_logs = warp::get()
        .and(warp::path!("tunnels" / String / "logs"))
        .and(with_state.clone())
        .map(|id: String, state: Arc<StubState>| {
            let logs = state
                .logs
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .unwrap_or_default();
            warp::reply::json(&json!({ "logs": logs })).into_response()
        });

    let tunnel_metrics = warp::get()
        .and(warp::path!("tunnels" / String / "metrics"))
        .and(with_state.clone())
        .map(|_id: String, _state: Arc<StubState>| {
            warp::reply::json(&TunnelMetrics {
                uptime_seconds: 42.0,
                status_checks: 7,
                created_at: Some("2024-05-01T10:00:00".to_string()),
            })
            .into_response()
        });

    let stop_tunnel = warp::delete()
        .and(warp::path!("tunnels" / String))
        .and(with_state.clone())
        .map(|id: String, state: Arc<StubState>| {
            state.stopped.lock().unwrap().push(id);
            warp::reply::json(&json!({ "success": true, "message": "Tunnel stopped" }))
                .into_response()
        });

    let stop_all = warp::delete()
        .and(warp::path!("tunnels"))
        .and(with_state.clone())
        .map(|state: Arc<StubState>| {
            state.stop_all_requests.fetch_add(1, Ordering::SeqCst);
            let count = state.tunnels.lock().unwrap().len();
            warp::reply::json(&json!({ "count": count })).into_response()
        });

    let start_scan = warp::post()
        .and(warp::path!("scans"))
        .and(with_state.clone())
        .and(warp::body::json())
        .map(|state: Arc<StubState>, body: Value| {
            if state.fail_scan_post.load(Ordering::SeqCst) {
                return error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to start scan");
            }
            state.scan_posts.fetch_add(1, Ordering::SeqCst);
            let target = body
                .get("target")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            *state.last_scan_target.lock().unwrap() = Some(target);
            let scan_id = uuid::Uuid::new_v4().to_string();
            warp::reply::json(&json!({ "scan_id": scan_id, "status": "queued" })).into_response()
        });

    let scan_status = warp::get()
        .and(warp::path!("scans" / String / "status"))
        .and(with_state.clone())
        .map(|id: String, state: Arc<StubState>| {
            *state.status_hits.lock().unwrap().entry(id.clone()).or_insert(0) += 1;
            let mut scripts = state.scripts.lock().unwrap();
            match scripts.get_mut(&id) {
                Some(queue) if !queue.is_empty() => {
                    let report = if queue.len() > 1 {
                        queue.pop_front().unwrap()
                    } else {
                        queue.front().unwrap().clone()
                    };
                    warp::reply::json(&report).into_response()
                }
                _ => error_reply(StatusCode::NOT_FOUND, "Scan not found"),
            }
        });

    let list_scans = warp::get()
        .and(warp::path!("scans"))
        .and(with_state.clone())
        .map(|state: Arc<StubState>| {
            state.scan_list_requests.fetch_add(1, Ordering::SeqCst);
            let scans = state.scans.lock().unwrap().clone();
            warp::reply::json(&ScanListResponse { scans }).into_response()
        });

    let proxy_config = warp::post()
        .and(warp::path!("proxy-config"))
        .and(with_state.clone())
        .and(warp::body::json())
        .map(|state: Arc<StubState>, _body: Value| {
            state.proxy_config_requests.fetch_add(1, Ordering::SeqCst);
            warp::reply::json(&ProxyConfigResponse {
                config: "[ProxyList]\nsocks5 127.0.0.1 1080".to_string(),
                instructions: Some(ProxyInstructions {
                    linux: "Save as /etc/proxychains4.conf".to_string(),
                    usage: "proxychains4 curl http://target".to_string(),
                    note: "Requires an active dynamic tunnel".to_string(),
                }),
            })
            .into_response()
        });

    let channel = warp::path!("channel")
        .and(warp::ws())
        .and(with_state)
        .map(|ws: warp::ws::Ws, state: Arc<StubState>| {
            ws.on_upgrade(move |socket| channel_session(socket, state))
        });

    let routes = channel
        .or(scan_status)
        .or(start_scan)
        .or(list_scans)
        .or(tunnel_logs)
        .or(tunnel_metrics)
        .or(create_tunnel)
        .or(stop_all)
        .or(stop_tunnel)
        .or(tunnel_detail)
        .or(list_tunnels)
        .or(proxy_config);

    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

/// View sink that records every call for assertions.
#[derive(Default)]
pub struct RecordingSink {
    tunnel_renders: Mutex<Vec<Vec<TunnelRecord>>>,
    history_renders: Mutex<Vec<Vec<ScanRecord>>>,
    service_renders: Mutex<Vec<Vec<DiscoveredService>>>,
    detail_renders: Mutex<Vec<TunnelRecord>>,
    log_renders: Mutex<Vec<Vec<String>>>,
    metric_renders: Mutex<Vec<TunnelMetrics>>,
    config_renders: Mutex<Vec<ProxyConfigResponse>>,
    statuses: Mutex<Vec<(StatusLevel, String)>>,
    toasts: Mutex<Vec<(StatusLevel, String)>>,
    reset_forms: Mutex<Vec<TunnelKind>>,
}

impl RecordingSink {
    pub fn tunnel_renders(&self) -> Vec<Vec<TunnelRecord>> {
        self.tunnel_renders.lock().unwrap().clone()
    }

    pub fn history_renders(&self) -> Vec<Vec<ScanRecord>> {
        self.history_renders.lock().unwrap().clone()
    }

    pub fn service_renders(&self) -> Vec<Vec<DiscoveredService>> {
        self.service_renders.lock().unwrap().clone()
    }

    pub fn detail_renders(&self) -> Vec<TunnelRecord> {
        self.detail_renders.lock().unwrap().clone()
    }

    pub fn log_renders(&self) -> Vec<Vec<String>> {
        self.log_renders.lock().unwrap().clone()
    }

    pub fn metric_renders(&self) -> Vec<TunnelMetrics> {
        self.metric_renders.lock().unwrap().clone()
    }

    pub fn config_renders(&self) -> Vec<ProxyConfigResponse> {
        self.config_renders.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<(StatusLevel, String)> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn toasts(&self) -> Vec<(StatusLevel, String)> {
        self.toasts.lock().unwrap().clone()
    }

    pub fn reset_forms(&self) -> Vec<TunnelKind> {
        self.reset_forms.lock().unwrap().clone()
    }
}

impl ViewSink for RecordingSink {
    fn render_tunnels(&self, tunnels: &[TunnelRecord]) {
        self.tunnel_renders.lock().unwrap().push(tunnels.to_vec());
    }

    fn render_scan_history(&self, scans: &[ScanRecord]) {
        self.history_renders.lock().unwrap().push(scans.to_vec());
    }

    fn render_services(&self, services: &[DiscoveredService]) {
        self.service_renders.lock().unwrap().push(services.to_vec());
    }

    fn render_tunnel_detail(&self, tunnel: &TunnelRecord) {
        self.detail_renders.lock().unwrap().push(tunnel.clone());
    }

    fn render_tunnel_logs(&self, logs: &[String]) {
        self.log_renders.lock().unwrap().push(logs.to_vec());
    }

    fn render_tunnel_metrics(&self, metrics: &TunnelMetrics) {
        self.metric_renders.lock().unwrap().push(metrics.clone());
    }

    fn render_proxy_config(&self, config: &ProxyConfigResponse) {
        self.config_renders.lock().unwrap().push(config.clone());
    }

    fn scan_status(&self, level: StatusLevel, message: &str) {
        self.statuses
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }

    fn toast(&self, level: StatusLevel, message: &str) {
        self.toasts.lock().unwrap().push((level, message.to_string()));
    }

    fn reset_form(&self, form: TunnelKind) {
        self.reset_forms.lock().unwrap().push(form);
    }
}
