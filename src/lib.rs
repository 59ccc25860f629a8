//! Backend for the mixtape generator.
//!
//! The frontend asks for a "vibe" and gets back an AI-written tracklist plus
//! a cover image. Both come from third-party generative APIs, and the whole
//! point of this server is that the browser never sees the upstream key:
//! every upstream call happens here, behind two small endpoints.
//!
//!
//!
//! # Quotas
//!
//! Generation is metered per UTC day, with a site-wide cap and a smaller
//! per-client cap sharing one reset date. Counters live in memory and are
//! deliberately lost on restart; an abusive day costs at most the global cap.
//! Resets are lazy: the ledger re-checks the stored date on every access, so
//! nothing depends on a timer firing at midnight.
//!
//! Clients are attributed by the first forwarded-for hop, falling back to the
//! transport peer address. This is best effort and spoofable, which is an
//! accepted tradeoff for an anonymous toy with a hard global ceiling.
//!
//!
//!
//! # Cover tokens
//!
//! The cover image comes from a second upstream whose URL embeds the prompt.
//! Handing that URL to the browser would leak the prompt template, so a
//! successful generation instead mints a single-use token the client trades
//! for the image within five minutes. Redemption consumes the token whether
//! or not the image fetch works; expired leftovers are swept once a minute.
//!
//!
//!
//! # Request flow
//!
//! ```text
//! POST /api/generate
//!   validate vibe -> reserve quota -> upstream chat call
//!     -> parse + validate tracklist -> commit quota + mint token
//! GET /api/cover/{token}
//!   redeem token -> fetch image -> stream bytes back
//! GET /api/status
//!   remaining counts for the caller
//! ```
//!
//! Quota is only charged after the upstream call produced a usable
//! tracklist. A failed call, an unparseable reply, or an empty tracklist all
//! leave the caller's remaining count untouched.
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod routes;
pub mod state;
pub mod upstream;
pub mod utils;
pub mod vault;

use routes::{cover_handler, generate_handler, status_handler};
use state::State;
use vault::SWEEP_INTERVAL;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new();

    spawn_sweeper(state.clone());

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/generate", post(generate_handler))
        .route("/api/cover/{token}", get(cover_handler))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .unwrap();

    println!("Server shutting down...");
}

// Memory hygiene only; redeem self-cleans expired entries on access.
fn spawn_sweeper(state: Arc<State>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);

        loop {
            ticker.tick().await;

            let reaped = state.vault.lock().expect("vault mutex poisoned").sweep();

            if reaped > 0 {
                debug!("Swept {reaped} expired cover tokens");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
