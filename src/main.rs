use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port = std::env::var("AKUN_HTTP_PORT").unwrap_or_else(|_| "7878".to_string());
    let secret_set = std::env::var("AKUN_SECRET_KEY").is_ok();
    info!(
        target: "akun",
        "akun starting: RUST_LOG='{}', http_port={}, secret_key_set={}",
        rust_log, http_port, secret_set
    );

    akun::server::run().await
}
