use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use decision_engine::{
    app::{ComponentRegistry, build_router},
    config::Config,
    observability,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    install_panic_hook();

    // Telemetry::new() sets up the subscriber
    let config = Config::from_env().context("failed to load configuration")?;
    let bind_addr = config.http_bind();
    let registry =
        ComponentRegistry::build(config).context("failed to assemble decision engine")?;

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("cannot bind {bind_addr}"))?;
    info!(%bind_addr, "decision engine accepting requests");

    let served = axum::serve(listener, build_router(registry))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(error) = served {
        warn!(%error, "http server stopped with an error");
    }

    observability::tracing::shutdown();
    info!("shutdown complete");

    Ok(())
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        let thread = std::thread::current();
        let location = info
            .location()
            .map(|at| format!("{}:{}:{}", at.file(), at.line(), at.column()));

        error!(
            thread = thread.name().unwrap_or("<unnamed>"),
            location = location.as_deref().unwrap_or("<unknown>"),
            %message,
            "thread panicked"
        );
    }));
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(error = %error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
