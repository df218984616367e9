use axum::{Router, middleware::from_fn_with_state};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{AppState, auth, routes};

pub struct Server;

impl Server {
    /// Builds the full application router. Everything except login and
    /// register sits behind the session middleware.
    pub fn router(state: AppState) -> Router {
        let protected = Router::new()
            .merge(routes::auth::session_router())
            .merge(routes::workspaces::router())
            .merge(routes::projects::router())
            .merge(routes::tasks::router())
            .merge(routes::members::router())
            .layer(from_fn_with_state(state.clone(), auth::require_session));

        let api = routes::auth::router().merge(protected);

        Router::new()
            .nest("/api", api)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    pub async fn serve(state: AppState, listener: TcpListener) -> std::io::Result<()> {
        axum::serve(listener, Self::router(state)).await
    }
}
