use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a session. The login and register forms redirect
/// clients that already hold a valid session back to `/`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET/POST /login
        // POST checks the credentials and sets the session cookie.
        .route("/login", get(handlers::login_form).post(handlers::login))
        // GET/POST /register
        // Self-registration always creates a USER-role account.
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register),
        )
}
