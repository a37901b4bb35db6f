use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::overview))
        .route("/revenue", get(handlers::revenue))
        .route("/bookings", get(handlers::bookings))
        .route("/checkins", get(handlers::checkins))
        .route("/visitors", get(handlers::visitors))
        .route("/locations/:id", get(handlers::location_detail))
        .route("/api/state", get(handlers::get_state).post(handlers::update_state))
        .route("/api/state/reset", post(handlers::reset_state))
        .route("/api/state/export", get(handlers::export_state))
        .route("/api/state/import", post(handlers::import_state))
        .route("/nav", get(handlers::navigate))
        .with_state(state)
}
