// View sink seam: the controller resolves data fully, the sink renders it.

use crate::api::types::{
    DiscoveredService, ProxyConfigResponse, ScanRecord, TunnelKind, TunnelMetrics, TunnelRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

impl StatusLevel {
    fn tag(&self) -> &'static str {
        match self {
            StatusLevel::Info => "info",
            StatusLevel::Success => "ok",
            StatusLevel::Error => "error",
        }
    }
}

/// Rendering surface for the synchronization controller.
///
/// Collection renders always replace the previous render wholesale; the
/// controller never sends partial or streaming updates.
pub trait ViewSink: Send + Sync {
    fn render_tunnels(&self, tunnels: &[TunnelRecord]);
    fn render_scan_history(&self, scans: &[ScanRecord]);
    fn render_services(&self, services: &[DiscoveredService]);
    fn render_tunnel_detail(&self, tunnel: &TunnelRecord);
    fn render_tunnel_logs(&self, logs: &[String]);
    fn render_tunnel_metrics(&self, metrics: &TunnelMetrics);
    fn render_proxy_config(&self, config: &ProxyConfigResponse);
    /// Scan panel status line.
    fn scan_status(&self, level: StatusLevel, message: &str);
    /// Transient notification.
    fn toast(&self, level: StatusLevel, message: &str);
    /// Clear the input form a successful create command originated from.
    fn reset_form(&self, form: TunnelKind);
}

/// User confirmation gate for destructive commands.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Confirms everything. Used where issuing the command is itself the
/// explicit user action.
pub struct AlwaysConfirm;

impl ConfirmPrompt for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Plain-text sink for the terminal front end.
pub struct ConsoleSink;

impl ConsoleSink {
    fn stamp() -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }

    /// First 8 characters of an opaque id, respecting char boundaries.
    fn short_id(id: &str) -> &str {
        match id.char_indices().nth(8) {
            Some((end, _)) => &id[..end],
            None => id,
        }
    }
}

impl ViewSink for ConsoleSink {
    fn render_tunnels(&self, tunnels: &[TunnelRecord]) {
        println!("-- tunnels ({}) --", tunnels.len());
        for tunnel in tunnels {
            let pid = tunnel
                .pid
                .map(|p| p.to_string())
                .unwrap_or_else(|| "n/a".to_string());
            println!(
                "  [{}] {:?} {} {}@{} {} pid={}",
                Self::short_id(&tunnel.id),
                tunnel.status,
                tunnel.kind.label(),
                tunnel.ssh_user,
                tunnel.ssh_host,
                tunnel.endpoint_summary(),
                pid
            );
        }
    }

    fn render_scan_history(&self, scans: &[ScanRecord]) {
        println!("-- scans ({}) --", scans.len());
        for scan in scans {
            let services = scan.service_count.unwrap_or(0);
            println!(
                "  [{}] {:?} {} services={}",
                Self::short_id(&scan.id),
                scan.status,
                scan.target,
                services
            );
        }
    }

    fn render_services(&self, services: &[DiscoveredService]) {
        if services.is_empty() {
            println!("No services found.");
            return;
        }
        println!("-- discovered services --");
        for service in services {
            println!(
                "  port {} service {} state {}",
                service.port, service.service, service.state
            );
        }
    }

    fn render_tunnel_detail(&self, tunnel: &TunnelRecord) {
        println!("-- tunnel {} --", tunnel.id);
        println!("  type: {}", tunnel.kind.label());
        println!("  status: {:?}", tunnel.status);
        println!("  ssh: {}@{}", tunnel.ssh_user, tunnel.ssh_host);
        println!("  endpoint: {}", tunnel.endpoint_summary());
        if let Some(created) = &tunnel.created_at {
            println!("  created: {}", created);
        }
        if let Some(command) = &tunnel.command {
            println!("  command: {}", command);
        }
    }

    fn render_tunnel_logs(&self, logs: &[String]) {
        if logs.is_empty() {
            println!("No logs available");
            return;
        }
        for line in logs {
            println!("  {}", line);
        }
    }

    fn render_tunnel_metrics(&self, metrics: &TunnelMetrics) {
        let total = metrics.uptime_seconds as u64;
        println!(
            "  uptime: {}h {}m {}s | status checks: {} | created: {}",
            total / 3600,
            (total % 3600) / 60,
            total % 60,
            metrics.status_checks,
            metrics.created_at.as_deref().unwrap_or("n/a")
        );
    }

    fn render_proxy_config(&self, config: &ProxyConfigResponse) {
        println!("{}", config.config);
        if let Some(instructions) = &config.instructions {
            println!("Linux: {}", instructions.linux);
            println!("Usage: {}", instructions.usage);
            println!("Note: {}", instructions.note);
        }
    }

    fn scan_status(&self, level: StatusLevel, message: &str) {
        println!("{} scan [{}] {}", Self::stamp(), level.tag(), message);
    }

    fn toast(&self, level: StatusLevel, message: &str) {
        println!("{} [{}] {}", Self::stamp(), level.tag(), message);
    }

    fn reset_form(&self, _form: TunnelKind) {
        // Nothing to clear on a line-oriented console.
    }
}
