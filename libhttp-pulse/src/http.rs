use reqwest::Client;
use std::time::Duration;

/// Shared probe client. Keepalive exceeds the default cycle interval, so
/// connections survive from one cycle to the next.
pub fn create_http_pool(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("libhttp-pulse/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .use_rustls_tls()
        .build()
        .expect("Failed to create HTTP client")
}
