use crate::api::types::{
    CreateTunnelResponse, ErrorBody, ProxyConfigRequest, ProxyConfigResponse, ScanListResponse,
    ScanRecord, ScanRequest, ScanStarted, ScanStatusReport, StopAllResponse, TunnelListResponse,
    TunnelLogsResponse, TunnelMetrics, TunnelRecord, TunnelRequest,
};
use crate::error::ClientError;
use reqwest::Client;
use std::time::Duration;

/// REST client for the tunnel/scan server.
///
/// One method per endpoint; no retries at this layer. Non-success responses
/// are mapped to `ClientError::Server` carrying the server's `detail` message
/// when it sent one.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn error_from(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.detail)
            .unwrap_or(text);
        ClientError::Server { status, message }
    }

    pub async fn start_scan(&self, target: &str) -> Result<ScanStarted, ClientError> {
        let url = format!("{}/scans", self.base_url);
        log::info!("Starting scan for target: {}", target);

        let response = self
            .client
            .post(&url)
            .json(&ScanRequest {
                target: target.to_string(),
            })
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    pub async fn scan_status(&self, scan_id: &str) -> Result<ScanStatusReport, ClientError> {
        let url = format!("{}/scans/{}/status", self.base_url, scan_id);
        log::debug!("Fetching status for scan {}", scan_id);

        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    pub async fn list_scans(&self) -> Result<Vec<ScanRecord>, ClientError> {
        let url = format!("{}/scans", self.base_url);
        log::debug!("Fetching scan history");

        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            let list: ScanListResponse = response.json().await?;
            Ok(list.scans)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    pub async fn list_tunnels(&self) -> Result<Vec<TunnelRecord>, ClientError> {
        let url = format!("{}/tunnels", self.base_url);
        log::debug!("Fetching tunnel list");

        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            let list: TunnelListResponse = response.json().await?;
            Ok(list.tunnels)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    pub async fn create_tunnel(
        &self,
        request: &TunnelRequest,
    ) -> Result<CreateTunnelResponse, ClientError> {
        let url = format!("{}/tunnels/{}", self.base_url, request.kind().path_segment());
        log::info!("Creating {} tunnel", request.kind().path_segment());

        let response = self.client.post(&url).json(request).send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    pub async fn stop_tunnel(&self, tunnel_id: &str) -> Result<(), ClientError> {
        let url = format!("{}/tunnels/{}", self.base_url, tunnel_id);
        log::info!("Stopping tunnel {}", tunnel_id);

        let response = self.client.delete(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    pub async fn stop_all_tunnels(&self) -> Result<StopAllResponse, ClientError> {
        let url = format!("{}/tunnels", self.base_url);
        log::info!("Stopping all tunnels");

        let response = self.client.delete(&url).send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    pub async fn tunnel_detail(&self, tunnel_id: &str) -> Result<TunnelRecord, ClientError> {
        let url = format!("{}/tunnels/{}", self.base_url, tunnel_id);
        log::debug!("Fetching detail for tunnel {}", tunnel_id);

        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    pub async fn tunnel_logs(&self, tunnel_id: &str) -> Result<Vec<String>, ClientError> {
        let url = format!("{}/tunnels/{}/logs", self.base_url, tunnel_id);
        log::debug!("Fetching logs for tunnel {}", tunnel_id);

        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            let body: TunnelLogsResponse = response.json().await?;
            Ok(body.logs)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    pub async fn tunnel_metrics(&self, tunnel_id: &str) -> Result<TunnelMetrics, ClientError> {
        let url = format!("{}/tunnels/{}/metrics", self.base_url, tunnel_id);
        log::debug!("Fetching metrics for tunnel {}", tunnel_id);

        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    pub async fn generate_proxy_config(
        &self,
        request: &ProxyConfigRequest,
    ) -> Result<ProxyConfigResponse, ClientError> {
        let url = format!("{}/proxy-config", self.base_url);
        log::info!(
            "Generating proxy config for {}:{}",
            request.proxy_host,
            request.proxy_port
        );

        let response = self.client.post(&url).json(request).send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_from(response).await)
        }
    }
}
