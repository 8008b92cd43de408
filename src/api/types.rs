use crate::error::ClientError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

// Wire types for the tunnel/scan server API. All records are owned by the
// server; the client holds them only between one refresh and the next.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunnelKind {
    Static,
    Dynamic,
    Remote,
    RemoteDynamic,
}

impl TunnelKind {
    /// URL path segment for POST /tunnels/{variant}. Note the wire tag for
    /// records is `remote_dynamic` while the path uses a hyphen.
    pub fn path_segment(&self) -> &'static str {
        match self {
            TunnelKind::Static => "static",
            TunnelKind::Dynamic => "dynamic",
            TunnelKind::Remote => "remote",
            TunnelKind::RemoteDynamic => "remote-dynamic",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TunnelKind::Static => "Static",
            TunnelKind::Dynamic => "Dynamic",
            TunnelKind::Remote => "Remote",
            TunnelKind::RemoteDynamic => "Remote dynamic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunnelStatus {
    Active,
    Stopped,
}

/// Scan lifecycle: pending -> running -> {completed, failed}. The server's
/// initial status on the wire is `queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    #[serde(alias = "queued")]
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Completed | ScanState::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TunnelKind,
    pub status: TunnelStatus,
    pub ssh_user: String,
    pub ssh_host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_bind_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_socks_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl TunnelRecord {
    /// One-line summary of the remote endpoint, shaped per variant.
    pub fn endpoint_summary(&self) -> String {
        match self.kind {
            TunnelKind::Static => format!(
                "{}:{}",
                self.remote_host.as_deref().unwrap_or("?"),
                self.remote_port.unwrap_or(0)
            ),
            TunnelKind::Dynamic => "SOCKS proxy".to_string(),
            TunnelKind::Remote => format!(
                "{}:{} -> {}:{}",
                self.bind_address.as_deref().unwrap_or(DEFAULT_BIND_ADDRESS),
                self.remote_bind_port.unwrap_or(0),
                self.target_host.as_deref().unwrap_or("?"),
                self.target_port.unwrap_or(0)
            ),
            TunnelKind::RemoteDynamic => format!(
                "Remote SOCKS proxy ({}:{})",
                self.bind_address.as_deref().unwrap_or(DEFAULT_BIND_ADDRESS),
                self.remote_socks_port.unwrap_or(0)
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredService {
    pub port: String, // e.g. "22/tcp"
    pub service: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: String,
    pub target: String,
    pub status: ScanState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<DiscoveredService>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelMetrics {
    pub uptime_seconds: f64,
    #[serde(default)]
    pub status_checks: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

// Request bodies

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticTunnelRequest {
    pub ssh_user: String,
    pub ssh_host: String,
    pub target_host: String,
    pub remote_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_port: Option<u16>,
    pub execute: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicTunnelRequest {
    pub ssh_user: String,
    pub ssh_host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_port: Option<u16>,
    pub execute: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTunnelRequest {
    pub ssh_user: String,
    pub ssh_host: String,
    pub remote_bind_port: u16,
    pub bind_address: String,
    pub target_host: String,
    pub target_port: u16,
    pub execute: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDynamicTunnelRequest {
    pub ssh_user: String,
    pub ssh_host: String,
    pub remote_socks_port: u16,
    pub bind_address: String,
    pub execute: bool,
}

/// A create-tunnel command for one of the four variants.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TunnelRequest {
    Static(StaticTunnelRequest),
    Dynamic(DynamicTunnelRequest),
    Remote(RemoteTunnelRequest),
    RemoteDynamic(RemoteDynamicTunnelRequest),
}

impl TunnelRequest {
    pub fn kind(&self) -> TunnelKind {
        match self {
            TunnelRequest::Static(_) => TunnelKind::Static,
            TunnelRequest::Dynamic(_) => TunnelKind::Dynamic,
            TunnelRequest::Remote(_) => TunnelKind::Remote,
            TunnelRequest::RemoteDynamic(_) => TunnelKind::RemoteDynamic,
        }
    }

    pub fn execute(&self) -> bool {
        match self {
            TunnelRequest::Static(req) => req.execute,
            TunnelRequest::Dynamic(req) => req.execute,
            TunnelRequest::Remote(req) => req.execute,
            TunnelRequest::RemoteDynamic(req) => req.execute,
        }
    }

    /// Fill in client-side defaults: an empty bind address on the remote
    /// variants becomes 127.0.0.1 before the request is sent.
    pub fn normalize(&mut self) {
        match self {
            TunnelRequest::Remote(req) => {
                if req.bind_address.trim().is_empty() {
                    req.bind_address = DEFAULT_BIND_ADDRESS.to_string();
                }
            }
            TunnelRequest::RemoteDynamic(req) => {
                if req.bind_address.trim().is_empty() {
                    req.bind_address = DEFAULT_BIND_ADDRESS.to_string();
                }
            }
            _ => {}
        }
    }

    /// Required-field check, performed before any network call.
    pub fn validate(&self) -> Result<(), ClientError> {
        match self {
            TunnelRequest::Static(req) => {
                require_str("ssh_user", &req.ssh_user)?;
                require_str("ssh_host", &req.ssh_host)?;
                require_str("target_host", &req.target_host)?;
                require_port("remote_port", req.remote_port)
            }
            TunnelRequest::Dynamic(req) => {
                require_str("ssh_user", &req.ssh_user)?;
                require_str("ssh_host", &req.ssh_host)
            }
            TunnelRequest::Remote(req) => {
                require_str("ssh_user", &req.ssh_user)?;
                require_str("ssh_host", &req.ssh_host)?;
                require_port("remote_bind_port", req.remote_bind_port)?;
                require_str("target_host", &req.target_host)?;
                require_port("target_port", req.target_port)
            }
            TunnelRequest::RemoteDynamic(req) => {
                require_str("ssh_user", &req.ssh_user)?;
                require_str("ssh_host", &req.ssh_host)?;
                require_port("remote_socks_port", req.remote_socks_port)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfigRequest {
    pub proxy_type: String,
    pub proxy_host: String,
    pub proxy_port: u16,
    pub chain_type: String,
}

impl ProxyConfigRequest {
    pub fn validate(&self) -> Result<(), ClientError> {
        require_str("proxy_host", &self.proxy_host)?;
        require_port("proxy_port", self.proxy_port)
    }
}

// Response bodies

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStarted {
    pub scan_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStatusReport {
    pub status: ScanState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<DiscoveredService>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanListResponse {
    pub scans: Vec<ScanRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelListResponse {
    pub tunnels: Vec<TunnelRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTunnelResponse {
    pub tunnel_id: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel: Option<TunnelRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopAllResponse {
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelLogsResponse {
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyInstructions {
    #[serde(default)]
    pub linux: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfigResponse {
    pub config: String,
    #[serde(default)]
    pub instructions: Option<ProxyInstructions>,
}

/// FastAPI-style error body.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

fn require_str(field: &str, value: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        Err(ClientError::Validation(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

fn require_port(field: &str, value: u16) -> Result<(), ClientError> {
    if value == 0 {
        Err(ClientError::Validation(format!("{} is required", field)))
    } else {
        Ok(())
    }
}
