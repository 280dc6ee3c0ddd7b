use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// User Router Module
///
/// Registration, session management, profile access, and avatar storage.
/// Route-level access rules:
/// - register/login are public; logout requires a valid session token.
/// - GET /users/{id} is public but only reveals the email to the user themselves.
/// - PATCH /users/{id} and the PUT/DELETE photo verbs are self-only.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        // POST /users/register
        .route("/users/register", post(handlers::register))
        // POST /users/login
        .route("/users/login", post(handlers::login))
        // POST /users/logout
        .route("/users/logout", post(handlers::logout))
        // GET/PATCH /users/{id}
        .route(
            "/users/{id}",
            get(handlers::get_user).patch(handlers::update_user),
        )
        // GET/PUT/DELETE /users/{id}/photo
        .route(
            "/users/{id}/photo",
            get(handlers::get_user_photo)
                .put(handlers::set_user_photo)
                .delete(handlers::delete_user_photo),
        )
}
