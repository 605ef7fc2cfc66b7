use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use dealer_dashboard::app;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let host: IpAddr = env_or("DASHBOARD_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST));
    let port: u16 = env_or("DASHBOARD_PORT", 5000);
    let max_sessions: usize = env_or("DASHBOARD_MAX_SESSIONS", 64);
    let addr = SocketAddr::new(host, port);

    if let Err(e) = app::run(addr, max_sessions).await {
        log::error!("server error: {e}");
        std::process::exit(1);
    }
}
