pub mod coefficients;
pub mod estimates;
pub mod health;
pub mod room_parameters;
pub mod works;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        // Work catalog
        .route("/works", get(works::list_works).post(works::create_work))
        .route("/works/export", get(works::export_works))
        .route("/works/import", post(works::import_works))
        .route(
            "/works/:work_id",
            get(works::get_work)
                .put(works::update_work)
                .delete(works::delete_work),
        )
        // Coefficients
        .route(
            "/coefficients",
            get(coefficients::list_coefficients).post(coefficients::create_coefficient),
        )
        .route(
            "/coefficients/grouped",
            get(coefficients::grouped_coefficients),
        )
        .route(
            "/coefficients/:coefficient_id",
            put(coefficients::update_coefficient).delete(coefficients::delete_coefficient),
        )
        // Room parameters
        .route(
            "/room-parameters",
            get(room_parameters::list_room_parameters).post(room_parameters::create_room_parameter),
        )
        .route(
            "/room-parameters/:parameter_id",
            put(room_parameters::update_room_parameter)
                .delete(room_parameters::delete_room_parameter),
        )
        // Estimates
        .route(
            "/estimates",
            get(estimates::list_estimates).post(estimates::create_estimate),
        )
        .route(
            "/estimates/:estimate_id",
            get(estimates::get_estimate)
                .put(estimates::replace_estimate)
                .delete(estimates::delete_estimate),
        )
        .route("/estimates/:estimate_id/summary", get(estimates::get_summary))
        .route(
            "/estimates/:estimate_id/parameters",
            put(estimates::set_parameter),
        )
        .route("/estimates/:estimate_id/items", post(estimates::add_item))
        .route(
            "/estimates/:estimate_id/items/:item_id",
            patch(estimates::update_item),
        )
        .route(
            "/estimates/:estimate_id/blocks/:block_id/move",
            post(estimates::move_estimate_block),
        )
}
