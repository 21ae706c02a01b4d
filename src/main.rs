use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::sync::Arc;

use anyhow::{Context, bail};
use docsum::{api, config, logging, processing::DocumentService};
use tokio::net::TcpListener;

/// Ports tried in order when `SERVER_PORT` is unset.
const FALLBACK_PORTS: RangeInclusive<u16> = 4100..=4199;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::init_config().context("Failed to load configuration")?;
    logging::init_tracing(config);

    let service = DocumentService::from_config(config)
        .await
        .context("Failed to initialize document service")?;
    let app = api::create_router(Arc::new(service), config.upload_max_bytes);

    let (listener, port) = bind_listener(config.server_port).await?;
    tracing::info!(port, "Docsum listening on http://0.0.0.0:{port}");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Bind the configured port, or the first free fallback port.
///
/// A configured port is never substituted: if it is taken, startup fails.
async fn bind_listener(configured: Option<u16>) -> anyhow::Result<(TcpListener, u16)> {
    let candidates: Vec<u16> = match configured {
        Some(port) => vec![port],
        None => FALLBACK_PORTS.collect(),
    };

    for port in candidates {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) if configured.is_none() && err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Fallback port busy");
            }
            Err(err) => return Err(err).with_context(|| format!("Failed to bind port {port}")),
        }
    }

    bail!(
        "No free port between {} and {}",
        FALLBACK_PORTS.start(),
        FALLBACK_PORTS.end()
    )
}
