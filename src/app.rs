use crate::handlers;
use crate::state::AppState;
use axum::{routing::{delete, get}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route(
            "/api/shipments",
            get(handlers::list_shipments).post(handlers::add_shipment),
        )
        .route(
            "/api/shipments/:submit_id",
            delete(handlers::delete_shipment).put(handlers::update_shipment),
        )
        .route(
            "/api/drivers",
            get(handlers::list_drivers).post(handlers::upsert_driver),
        )
        .route("/api/drivers/:driver_id", delete(handlers::delete_driver))
        .with_state(state)
}
