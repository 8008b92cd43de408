use anyhow::Result;
use log::info;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tunneldeck::api::types::{
    DynamicTunnelRequest, ProxyConfigRequest, RemoteDynamicTunnelRequest, RemoteTunnelRequest,
    StaticTunnelRequest, TunnelRequest,
};
use tunneldeck::api::ApiClient;
use tunneldeck::config::ClientConfig;
use tunneldeck::sync::{ChannelSupervisor, CommandDispatcher, RefreshScheduler, ScanPoller};
use tunneldeck::view::{AlwaysConfirm, ConsoleSink, ViewSink};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ClientConfig::from_env()?;
    info!("Using server at {}", config.api_base());

    let api = Arc::new(ApiClient::new(&config.api_base(), config.request_timeout));
    let sink: Arc<dyn ViewSink> = Arc::new(ConsoleSink);
    let refresh = Arc::new(RefreshScheduler::new(
        api.clone(),
        sink.clone(),
        config.tunnel_refresh_period,
        config.history_refresh_period,
    ));
    let poller = Arc::new(ScanPoller::new(
        api.clone(),
        sink.clone(),
        refresh.clone(),
        config.poll_period,
    ));
    let dispatcher = CommandDispatcher::new(
        api.clone(),
        sink.clone(),
        refresh.clone(),
        Arc::new(AlwaysConfirm),
    );

    // Initial render before the periodic loops take over.
    refresh.refresh_tunnels().await;
    refresh.refresh_scan_history().await;
    refresh.spawn_loops();

    let supervisor = Arc::new(ChannelSupervisor::new(
        config.ws_channel_url()?.to_string(),
        sink.clone(),
        refresh.clone(),
        config.keepalive_period,
        config.reconnect_delay,
    ));
    tokio::spawn(Arc::clone(&supervisor).run());

    repl(&dispatcher, &poller, &refresh).await
}

async fn repl(
    dispatcher: &CommandDispatcher,
    poller: &Arc<ScanPoller>,
    refresh: &Arc<RefreshScheduler>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_help();

    while let Some(line) = lines.next_line().await? {
        let mut args: Vec<&str> = line.split_whitespace().collect();
        let execute = if let Some(pos) = args.iter().position(|a| *a == "--run") {
            args.remove(pos);
            true
        } else {
            false
        };

        match args.as_slice() {
            [] => {}
            ["quit"] | ["exit"] => break,
            ["help"] => print_help(),
            ["tunnels"] => refresh.refresh_tunnels().await,
            ["scans"] => refresh.refresh_scan_history().await,
            ["scan", target] => {
                let _ = poller.start_scan(target).await;
            }
            ["static", user, host, target_host, remote_port, rest @ ..] => {
                let ports = parse_port(remote_port)
                    .and_then(|remote| Ok((remote, parse_opt_port(rest.first())?)));
                let (remote_port, local_port) = match ports {
                    Ok(ports) => ports,
                    Err(message) => {
                        println!("{}", message);
                        continue;
                    }
                };
                let request = TunnelRequest::Static(StaticTunnelRequest {
                    ssh_user: (*user).to_string(),
                    ssh_host: (*host).to_string(),
                    target_host: (*target_host).to_string(),
                    remote_port,
                    local_port,
                    execute,
                });
                let _ = dispatcher.create_tunnel(request).await;
            }
            ["dynamic", user, host, rest @ ..] => {
                let local_port = match parse_opt_port(rest.first()) {
                    Ok(port) => port,
                    Err(message) => {
                        println!("{}", message);
                        continue;
                    }
                };
                let request = TunnelRequest::Dynamic(DynamicTunnelRequest {
                    ssh_user: (*user).to_string(),
                    ssh_host: (*host).to_string(),
                    local_port,
                    execute,
                });
                let _ = dispatcher.create_tunnel(request).await;
            }
            ["remote", user, host, bind_port, target_host, target_port, rest @ ..] => {
                let ports = parse_port(bind_port)
                    .and_then(|bind| Ok((bind, parse_port(target_port)?)));
                let (remote_bind_port, target_port) = match ports {
                    Ok(ports) => ports,
                    Err(message) => {
                        println!("{}", message);
                        continue;
                    }
                };
                let request = TunnelRequest::Remote(RemoteTunnelRequest {
                    ssh_user: (*user).to_string(),
                    ssh_host: (*host).to_string(),
                    remote_bind_port,
                    bind_address: rest.first().unwrap_or(&"").to_string(),
                    target_host: (*target_host).to_string(),
                    target_port,
                    execute,
                });
                let _ = dispatcher.create_tunnel(request).await;
            }
            ["remote-dynamic", user, host, socks_port, rest @ ..] => {
                let remote_socks_port = match parse_port(socks_port) {
                    Ok(port) => port,
                    Err(message) => {
                        println!("{}", message);
                        continue;
                    }
                };
                let request = TunnelRequest::RemoteDynamic(RemoteDynamicTunnelRequest {
                    ssh_user: (*user).to_string(),
                    ssh_host: (*host).to_string(),
                    remote_socks_port,
                    bind_address: rest.first().unwrap_or(&"").to_string(),
                    execute,
                });
                let _ = dispatcher.create_tunnel(request).await;
            }
            ["stop", id] => {
                let _ = dispatcher.stop_tunnel(id).await;
            }
            ["stop-all"] => {
                let _ = dispatcher.stop_all_tunnels().await;
            }
            ["detail", id] => {
                let _ = dispatcher.show_tunnel_detail(id).await;
            }
            ["logs", id] => {
                let _ = dispatcher.show_tunnel_logs(id).await;
            }
            ["metrics", id] => {
                let _ = dispatcher.show_tunnel_metrics(id).await;
            }
            ["proxy", host, port] => {
                let proxy_port = match parse_port(port) {
                    Ok(port) => port,
                    Err(message) => {
                        println!("{}", message);
                        continue;
                    }
                };
                let request = ProxyConfigRequest {
                    proxy_type: "socks5".to_string(),
                    proxy_host: (*host).to_string(),
                    proxy_port,
                    chain_type: "strict".to_string(),
                };
                let _ = dispatcher.generate_proxy_config(request).await;
            }
            _ => println!("Unknown command; type 'help' for the list"),
        }
    }

    Ok(())
}

fn parse_port(raw: &str) -> Result<u16, String> {
    raw.parse().map_err(|_| format!("Invalid port: {}", raw))
}

fn parse_opt_port(raw: Option<&&str>) -> Result<Option<u16>, String> {
    raw.map(|p| parse_port(p)).transpose()
}


fn print_help() {
    println!("Commands:");
    println!("  scan <target>");
    println!("  static <user> <host> <target_host> <remote_port> [local_port] [--run]");
    println!("  dynamic <user> <host> [local_port] [--run]");
    println!("  remote <user> <host> <bind_port> <target_host> <target_port> [bind_addr] [--run]");
    println!("  remote-dynamic <user> <host> <socks_port> [bind_addr] [--run]");
    println!("  stop <id> | stop-all");
    println!("  detail <id> | logs <id> | metrics <id>");
    println!("  proxy <host> <port>");
    println!("  tunnels | scans | help | quit");
}
