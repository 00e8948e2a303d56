//! Notes client - local JSON API over the session, notes, and chat stores.
//!
//! This is the main entry point for the notes server.
//! The application is organized into the following modules:
//!
//! - `snapshot`: Keyed JSON snapshots over sled and the `Persisted` cell
//! - `session`: Local sign-in state
//! - `notes`: Note repository, selection, favorites, and search
//! - `chat`: Web-search chat client and response normalization
//! - `conversation`: Chat widget message log
//! - `handlers`: HTTP route handlers

use log::info;

use notes_client::{config::Config, error::AppError, handlers, logging, AppState};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logging::init_logging();

    let config = Config::from_env()?;
    let state = AppState::open(config)?.into_shared();
    let app = handlers::router(state.clone());

    let listener = tokio::net::TcpListener::bind(&state.config.listen_addr).await?;

    info!(
        "event=server_start module=main status=ok addr={} db={} chat_endpoint={}",
        state.config.listen_addr,
        state.config.db_path.display(),
        state.config.chat.endpoint
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.snapshots.flush();
    info!("event=server_stop module=main status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        log::warn!("event=signal_install module=main status=error");
        std::future::pending::<()>().await;
    }
}
