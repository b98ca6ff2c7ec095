use groundchat::config::CONFIG;
use groundchat::server::{RelayState, relay_router};
use groundchat::utils::logging::init_tracing;
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &*CONFIG;
    init_tracing(&cfg.basic.loglevel);

    info!(
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        loglevel = %cfg.basic.loglevel,
        text_url = %cfg.upstream.text_url,
        image_url = %cfg.upstream.image_url,
        proxy = %cfg.upstream.proxy.as_ref().map_or("<none>", url::Url::as_str),
        retry_max_attempts = cfg.upstream.retry_max_attempts,
        retry_base_delay_ms = cfg.upstream.retry_base_delay_ms,
        "groundchat starting"
    );
    if cfg.upstream.api_key().is_none() {
        warn!("No upstream API key configured; /api routes will answer 500 until one is set");
    }

    let state = RelayState::new(cfg)?;
    let app = relay_router(state, cfg.basic.cors_allow_any_origin);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
