//! MJPEG relay binary
//!
//! Usage: mjpeg-relay <PORT> <UPSTREAM_URL> [--host ADDR]
//!
//! Example:
//!   mjpeg-relay 8081 http://192.168.1.20/video.mjpg
//!
//! Then point any number of browsers or players at http://localhost:8081/.
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use mjpeg_relay::protocol::constants::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_VIEWER_BUFFER};
use mjpeg_relay::{RelayServer, ServerConfig, SessionConfig};
use tracing_subscriber::EnvFilter;

/// Share one MJPEG camera stream with many HTTP viewers
#[derive(Parser, Debug)]
#[command(name = "mjpeg-relay", version, about)]
struct Args {
    /// Port viewers connect to
    port: u16,

    /// URL of the upstream MJPEG source (http or https)
    upstream_url: Option<String>,

    /// Address to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    host: IpAddr,

    /// Chunks queued per viewer before it is treated as stalled
    #[arg(long, default_value_t = DEFAULT_VIEWER_BUFFER)]
    viewer_buffer: usize,

    /// Seconds to wait for upstream response headers
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT.as_secs())]
    connect_timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let session = match SessionConfig::parse(args.upstream_url.as_deref()) {
        Ok(session) => session
            .viewer_buffer(args.viewer_buffer)
            .connect_timeout(Duration::from_secs(args.connect_timeout)),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = ServerConfig::new(session).bind(SocketAddr::new(args.host, args.port));

    let server = match RelayServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Failed to start relay: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    match server.run_until(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
