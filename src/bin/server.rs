use anyhow::Context;
use clap::Parser;
use replis::config::{DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_MAX_CONNECTIONS};
use replis::{server, LeaderAddr, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = ReplisServer::parse();
    let config = cli.into_config()?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind tcp listener on {addr}"))?;
    info!(%addr, "listening");

    server::run(listener, config, tokio::signal::ctrl_c())
        .await
        .context("server stopped")?;

    Ok(())
}

#[derive(Debug, Parser)]
#[command(name = "replis-server", version, author)]
/// A Redis compatible server with single-leader replication
struct ReplisServer {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Replicate from the given leader, as `<host> <port>` or two arguments.
    #[arg(long, num_args = 1..=2, value_name = "HOST PORT")]
    replicaof: Option<Vec<String>>,
    /// Maximum number of concurrent client connections.
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    max_connections: usize,
    /// Bound on each step of the replication handshake, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_HANDSHAKE_TIMEOUT.as_millis() as u64)]
    handshake_timeout_ms: u64,
}

impl ReplisServer {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let replicaof = self
            .replicaof
            .map(|parts| parts.join(" ").parse::<LeaderAddr>())
            .transpose()
            .context("invalid --replicaof")?;

        Ok(ServerConfig {
            host: self.host,
            port: self.port,
            replicaof,
            max_connections: self.max_connections,
            handshake_timeout: Duration::from_millis(self.handshake_timeout_ms),
        })
    }
}
