use crate::AppState;
use axum::{Router, http::StatusCode, response::Html, routing::get};

/// Public Router Module
///
/// Minimal pages backing the access gate's redirects. Which of them a caller
/// actually reaches is decided by the gate: `/login` and `/health` are open,
/// `/unauthorized` needs a session, `/admin` needs the admin role.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Load balancer probe; exempt from the gate.
        .route("/health", get(|| async { "ok" }))
        // GET /login
        // Where unauthenticated browser navigation is sent.
        .route("/login", get(|| async { Html("<h1>Sign in</h1>") }))
        // GET /unauthorized
        // Where signed-in users without the admin role land when opening admin pages.
        .route(
            "/unauthorized",
            get(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Html("<h1>You do not have access to this page</h1>"),
                )
            }),
        )
        // GET /admin
        // Admin landing page.
        .route("/admin", get(|| async { Html("<h1>Poll administration</h1>") }))
}
