use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Poll CRUD, mounted under `/api/admin`. The access gate lets API paths
/// through without redirects; authorization happens in each handler, which
/// answers 401/403 as JSON.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/polls, POST /api/admin/polls
        .route("/polls", get(handlers::list_polls).post(handlers::create_poll))
        // PUT /api/admin/polls/{id}, DELETE /api/admin/polls/{id}
        .route(
            "/polls/{id}",
            put(handlers::update_poll).delete(handlers::delete_poll),
        )
}
