pub mod auth;
pub mod error;
pub mod feedback;
pub mod middleware;
pub mod session;
pub mod users;
pub mod views;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::auth::AppState;
use crate::middleware::require_login;

/// The full route table. Everything under `/users` and `/feedback` needs a
/// logged-in session.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(auth::index))
        .route("/register", get(auth::register_page).post(auth::register_submit))
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .route("/logout", get(auth::logout))
        .route("/error", get(auth::debug_error))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users/{username}", get(users::show_user))
        .route(
            "/users/{username}/feedback/add",
            get(feedback::new_feedback).post(feedback::create_feedback),
        )
        .route("/users/{username}/delete", get(users::delete_user))
        .route(
            "/feedback/{id}/update",
            get(feedback::edit_feedback).post(feedback::update_feedback),
        )
        .route("/feedback/{id}/delete", post(feedback::delete_feedback))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_login))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
