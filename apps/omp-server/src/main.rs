//! OMP Server - reference object server.
//!
//! Serves the object API over HTTP/1.1 and HTTP/2 and verifies HTTP message
//! signatures on every `/objects` request according to `OMP_SIG_MODE`.
//!
//! # Usage
//!
//! ```text
//! OMP_SIG_MODE=strict OMP_SIG_KEYS='{"client-1":"<base64url key>"}' omp-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OMP_SERVER_HOST` | `0.0.0.0` | Bind host |
//! | `OMP_SERVER_PORT` | `8080` | Bind port |
//! | `OMP_MAX_PAYLOAD_MB` | `5` | Request body cap |
//! | `OMP_RATE_LIMIT` | `60` | Advertised requests per minute |
//! | `OMP_SIG_MODE` | `off` | `off`, `permissive` or `strict` |
//! | `OMP_SIG_KEYS` | *(unset)* | JSON object of `keyid -> public key` |
//! | `OMP_SIG_KEYID` / `OMP_SIG_ED25519_PUB` | *(unset)* | Pinned key pair |
//! | `OMP_SIG_PUB_<keyid>` | *(unset)* | Per-keyid public key |
//! | `OMP_SIG_BROAD_SCAN` | `false` | Try every configured key for unknown keyids |
//! | `OMP_PUBLIC_SCHEME` | `http` | Scheme clients sign with |
//! | `OMP_LOG_JSON` | `false` | Emit JSON log lines |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use omp_auth::EnforcementMode;
use omp_core::{ServerConfig, env_bool};
use omp_objects_core::{ObjectsConfig, OmpObjects, OmpObjectsHandler};
use omp_objects_http::{ObjectsHttpConfig, ObjectsHttpService};

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

type Service = ObjectsHttpService<OmpObjectsHandler>;

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

/// Build the HTTP service from the server and object configuration.
fn build_service(server: &ServerConfig, objects: &ObjectsConfig) -> Service {
    let provider = OmpObjects::default();
    let handler = OmpObjectsHandler::new(Arc::new(provider));
    let http_config = ObjectsHttpConfig {
        gate: Arc::new(objects.signature_gate()),
        max_payload_mb: server.max_payload_mb,
        rate_limit_per_min: server.rate_limit_per_min,
        port: server.port,
    };
    ObjectsHttpService::new(Arc::new(handler), http_config)
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: Service) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Perform a health check by connecting to the server and requesting `/health`.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"ok\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

/// Address used to health-check a locally bound server.
fn health_check_addr(listen_addr: &str) -> String {
    listen_addr.replace("0.0.0.0", "127.0.0.1")
}

#[tokio::main]
async fn main() -> Result<()> {
    let server_config = ServerConfig::from_env().context("invalid server configuration")?;

    // Handle --health-check flag for container health checks.
    if std::env::args().any(|a| a == "--health-check") {
        let healthy = run_health_check(&health_check_addr(&server_config.listen_addr()))
            .await
            .is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&server_config.log_level, env_bool("OMP_LOG_JSON", false))?;

    let objects_config = ObjectsConfig::from_env().context("invalid signature configuration")?;
    info!(
        signature_mode = %objects_config.signature_mode,
        public_scheme = %objects_config.public_scheme,
        registry_keys = objects_config.keys.registry_len(),
        pinned_keyid = ?objects_config.keys.pinned_keyid(),
        env_keys = objects_config.keys.env_len(),
        broad_scan = objects_config.keys.broad_scan_enabled(),
        "initializing object service",
    );
    if objects_config.signature_mode != EnforcementMode::Off
        && objects_config.keys == omp_auth::KeyStore::default()
    {
        warn!("signature verification is enabled but no public keys are configured");
    }

    let service = build_service(&server_config, &objects_config);

    let listen_addr = server_config.listen_addr();
    let addr: SocketAddr = listen_addr
        .parse()
        .with_context(|| format!("invalid bind address: {listen_addr}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        max_payload_mb = server_config.max_payload_mb,
        version = VERSION,
        "starting OMP server",
    );

    serve(listener, service).await
}
