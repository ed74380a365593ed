//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatcher mounted as fallback
//! - Wire up middleware (tracing)
//! - Bind server to listener
//! - Pass the peer address to the dispatcher as the client IP
//! - Start the routes watcher when enabled
//! - Stop on the shutdown broadcast

use std::net::SocketAddr;
use std::path::Path;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::watcher::{reload_on_change, RoutesWatcher};
use crate::config::AppConfig;
use crate::dispatch::Dispatcher;
use crate::lifecycle::Shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

/// HTTP server for the router.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    dispatcher: Dispatcher,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig, dispatcher: Dispatcher) -> Self {
        let state = AppState {
            dispatcher: dispatcher.clone(),
        };
        let router = Self::build_router(state);
        Self {
            router,
            config,
            dispatcher,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: &Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        // Load before accepting traffic so startup warnings come first.
        self.dispatcher.ensure_loaded().await;

        let _watcher = if self.config.routes.watch {
            let (watcher, changes) = RoutesWatcher::new(Path::new(&self.config.routes.dir));
            match watcher.run() {
                Ok(handle) => {
                    tokio::spawn(reload_on_change(
                        self.dispatcher.clone(),
                        changes,
                        shutdown.subscribe(),
                    ));
                    Some(handle)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to start routes watcher");
                    None
                }
            }
        } else {
            None
        };

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let mut stop = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The Axum router, for embedding in another service.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Forward every request to the dispatcher.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    state.dispatcher.handle(request, remote).await
}
