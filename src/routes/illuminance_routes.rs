use axum::{
    Router,
    routing::{get, post},
};

use crate::controllers::illuminance_controller::{
    get_global_illuminance, get_point_attributes, get_point_helpers, get_point_illuminance,
    get_point_options, list_points, put_point_options, refresh_all, refresh_point,
};
use crate::shared_state::AppState;

/// Build the `/api/*` sub-router.
pub fn illuminance_routes(state: AppState) -> Router {
    Router::new()
        .route("/points",                   get(list_points))
        .route("/points/{id}/illuminance",  get(get_point_illuminance))
        .route("/points/{id}/attributes",   get(get_point_attributes))
        .route("/points/{id}/helpers",      get(get_point_helpers))
        .route("/points/{id}/refresh",      post(refresh_point))
        .route("/points/{id}/options",      get(get_point_options).put(put_point_options))
        .route("/refresh",                  post(refresh_all))
        .route("/illuminance/global",       get(get_global_illuminance))
        .with_state(state)
}
