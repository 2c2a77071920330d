use crate::api::rest::handlers;
use crate::domain::service::Service;
use axum::{routing::get, Extension, Router};
use std::sync::Arc;

/// Register the `/users` collection and item routes.
/// The service is injected per-route via `Extension`.
pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    router
        .route(
            "/users",
            get(handlers::list_users)
                .post(handlers::create_user)
                .delete(handlers::delete_all_users),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .layer(Extension(service))
}
