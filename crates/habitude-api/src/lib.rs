//! HTTP surface: auth token issuance, user profile, habit CRUD and the
//! public habit listing. Route assembly lives here so the integration
//! tests can drive the exact router the server binary serves.

pub mod auth;
pub mod error;
pub mod habits;
pub mod middleware;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use habitude_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
}

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/habits/public", get(habits::public_habits))
        .with_state(state.clone());

    // Single-habit routes check the bearer themselves: GET must stay
    // reachable without a token so public habits are world-readable.
    let mixed = Router::new()
        .route(
            "/habits/{id}",
            get(habits::get_habit)
                .put(habits::update_habit)
                .delete(habits::delete_habit),
        )
        .with_state(state.clone());

    let protected = Router::new()
        .route("/habits", get(habits::list_habits).post(habits::create_habit))
        .route("/users/me", get(users::me).put(users::update_me))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public).merge(mixed).merge(protected)
}
