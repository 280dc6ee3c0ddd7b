use crate::{AppState, handlers};
use axum::{
    Router,
    routing::get,
};

/// Petition Router Module
///
/// Listing, lifecycle, signature, and hero-image routes. Reads are public;
/// creation requires a session; mutation and deletion are author-only, enforced
/// inside the handlers after the existence check (404 before 401/403).
pub fn petition_routes() -> Router<AppState> {
    Router::new()
        // GET /petitions?startIndex=&count=&q=&categoryId=&authorId=&sortBy=
        // POST /petitions
        .route(
            "/petitions",
            get(handlers::list_petitions).post(handlers::create_petition),
        )
        // GET /petitions/categories
        // Static segment registered alongside the {id} capture; the router
        // prefers the literal match.
        .route("/petitions/categories", get(handlers::get_categories))
        // GET/PATCH/DELETE /petitions/{id}
        .route(
            "/petitions/{id}",
            get(handlers::get_petition)
                .patch(handlers::update_petition)
                .delete(handlers::delete_petition),
        )
        // GET/POST/DELETE /petitions/{id}/signatures
        .route(
            "/petitions/{id}/signatures",
            get(handlers::list_signatures)
                .post(handlers::sign_petition)
                .delete(handlers::remove_signature),
        )
        // GET/PUT /petitions/{id}/photo
        .route(
            "/petitions/{id}/photo",
            get(handlers::get_petition_photo).put(handlers::set_petition_photo),
        )
}
