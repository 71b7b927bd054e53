use std::sync::Arc;

use axum::routing::{get, put};
use axum::{Extension, Router};

use super::handlers;
use crate::domain::AllowListService;

pub const ALLOWLIST_PATH: &str = "/api/admin/ip-allowlist";

/// Management routes. Handlers read the caller's `Identity` from request
/// extensions, so the router must be mounted behind the admin guard.
pub fn router(service: Arc<AllowListService>) -> Router {
    Router::new()
        .route(
            ALLOWLIST_PATH,
            get(handlers::list_entries).post(handlers::create_entry),
        )
        .route(
            "/api/admin/ip-allowlist/{id}",
            put(handlers::update_entry).delete(handlers::delete_entry),
        )
        .layer(Extension(service))
}
