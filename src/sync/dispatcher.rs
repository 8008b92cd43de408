use crate::api::types::{ProxyConfigRequest, TunnelRequest};
use crate::api::ApiClient;
use crate::error::ClientError;
use crate::sync::refresh::RefreshScheduler;
use crate::view::{ConfirmPrompt, StatusLevel, ViewSink};
use log::info;
use std::sync::Arc;

/// Stateless wrapper around the mutating and read commands.
///
/// Validation happens before any request; a failed command is terminal for
/// that invocation and is never retried here. Successful tunnel mutations
/// trigger an immediate tunnel refresh.
pub struct CommandDispatcher {
    api: Arc<ApiClient>,
    sink: Arc<dyn ViewSink>,
    refresh: Arc<RefreshScheduler>,
    confirm: Arc<dyn ConfirmPrompt>,
}

impl CommandDispatcher {
    pub fn new(
        api: Arc<ApiClient>,
        sink: Arc<dyn ViewSink>,
        refresh: Arc<RefreshScheduler>,
        confirm: Arc<dyn ConfirmPrompt>,
    ) -> Self {
        Self {
            api,
            sink,
            refresh,
            confirm,
        }
    }

    pub async fn create_tunnel(&self, mut request: TunnelRequest) -> Result<(), ClientError> {
        request.normalize();
        if let Err(e) = request.validate() {
            self.sink
                .toast(StatusLevel::Error, "Please fill all required fields");
            return Err(e);
        }

        let kind = request.kind();
        match self.api.create_tunnel(&request).await {
            Ok(created) => {
                info!("Created {} tunnel {}", kind.path_segment(), created.tunnel_id);
                self.sink.toast(
                    StatusLevel::Success,
                    &format!("{} tunnel created successfully!", kind.label()),
                );
                if !request.execute() {
                    self.sink
                        .toast(StatusLevel::Info, &format!("Command: {}", created.command));
                }
                self.refresh.refresh_tunnels().await;
                self.sink.reset_form(kind);
                Ok(())
            }
            Err(e) => {
                // Form state is preserved so the user can correct and resend.
                self.sink
                    .toast(StatusLevel::Error, &e.user_message("Failed to create tunnel"));
                Err(e)
            }
        }
    }

    /// Returns Ok(false) when the user declines the confirmation prompt.
    pub async fn stop_tunnel(&self, tunnel_id: &str) -> Result<bool, ClientError> {
        if !self
            .confirm
            .confirm("Are you sure you want to stop this tunnel?")
        {
            return Ok(false);
        }

        match self.api.stop_tunnel(tunnel_id).await {
            Ok(()) => {
                self.sink.toast(StatusLevel::Success, "Tunnel stopped");
                self.refresh.refresh_tunnels().await;
                Ok(true)
            }
            Err(e) => {
                self.sink
                    .toast(StatusLevel::Error, &e.user_message("Failed to stop tunnel"));
                Err(e)
            }
        }
    }

    /// Returns Ok(false) when the user declines the confirmation prompt.
    pub async fn stop_all_tunnels(&self) -> Result<bool, ClientError> {
        if !self
            .confirm
            .confirm("Are you sure you want to stop ALL tunnels?")
        {
            return Ok(false);
        }

        match self.api.stop_all_tunnels().await {
            Ok(stopped) => {
                self.sink.toast(
                    StatusLevel::Success,
                    &format!("Stopped {} tunnel(s)", stopped.count),
                );
                self.refresh.refresh_tunnels().await;
                Ok(true)
            }
            Err(e) => {
                self.sink
                    .toast(StatusLevel::Error, &e.user_message("Failed to stop tunnels"));
                Err(e)
            }
        }
    }

    pub async fn generate_proxy_config(
        &self,
        request: ProxyConfigRequest,
    ) -> Result<(), ClientError> {
        if let Err(e) = request.validate() {
            self.sink
                .toast(StatusLevel::Error, "Please enter proxy host and port");
            return Err(e);
        }

        match self.api.generate_proxy_config(&request).await {
            Ok(config) => {
                self.sink.render_proxy_config(&config);
                self.sink
                    .toast(StatusLevel::Success, "Proxy configuration generated!");
                Ok(())
            }
            Err(e) => {
                self.sink
                    .toast(StatusLevel::Error, &e.user_message("Failed to generate config"));
                Err(e)
            }
        }
    }

    pub async fn show_tunnel_detail(&self, tunnel_id: &str) -> Result<(), ClientError> {
        match self.api.tunnel_detail(tunnel_id).await {
            Ok(tunnel) => {
                self.sink.render_tunnel_detail(&tunnel);
                Ok(())
            }
            Err(e) => {
                self.sink
                    .toast(StatusLevel::Error, &e.user_message("Failed to load tunnel"));
                Err(e)
            }
        }
    }

    pub async fn show_tunnel_logs(&self, tunnel_id: &str) -> Result<(), ClientError> {
        match self.api.tunnel_logs(tunnel_id).await {
            Ok(logs) => {
                self.sink.render_tunnel_logs(&logs);
                Ok(())
            }
            Err(e) => {
                self.sink
                    .toast(StatusLevel::Error, &e.user_message("Failed to load logs"));
                Err(e)
            }
        }
    }

    pub async fn show_tunnel_metrics(&self, tunnel_id: &str) -> Result<(), ClientError> {
        match self.api.tunnel_metrics(tunnel_id).await {
            Ok(metrics) => {
                self.sink.render_tunnel_metrics(&metrics);
                Ok(())
            }
            Err(e) => {
                self.sink
                    .toast(StatusLevel::Error, &e.user_message("Failed to load metrics"));
                Err(e)
            }
        }
    }
}
