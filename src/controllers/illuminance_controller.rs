use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::config::{EngineConfig, EngineOptions};
use crate::models::illuminance::{
    HelperFlag, HelperStates, PointStatusResponse, PointSummary, RefreshAllResponse,
    UpdateResult, helper_state,
};
use crate::shared_state::AppState;

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn point_not_found() -> Response {
    error(StatusCode::NOT_FOUND, "Point not found")
}

fn status_response(point_id: &str, data: &UpdateResult) -> Response {
    let response = PointStatusResponse {
        timestamp: chrono::Utc::now(),
        point_id: point_id.to_string(),
        native_value: data.native_value(),
        data: data.clone(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /api/points
/// List all configured points
#[utoipa::path(
    get,
    path = "/api/points",
    responses(
        (status = 200, description = "Configured points", body = Vec<PointSummary>)
    )
)]
pub async fn list_points(State(state): State<AppState>) -> impl IntoResponse {
    let points: Vec<PointSummary> = state.points.iter().map(|p| p.summary()).collect();
    Json(points).into_response()
}

/// GET /api/points/{id}/illuminance
/// Get the latest illuminance estimate for a point
///
/// `native_value` is the raw lux rounded to whole lux. The full result
/// includes control lux, thresholds, daypart and every enabled feature.
#[utoipa::path(
    get,
    path = "/api/points/{id}/illuminance",
    params(
        ("id" = String, Path, description = "Point ID")
    ),
    responses(
        (status = 200, description = "Latest result", body = PointStatusResponse),
        (status = 404, description = "Point not found"),
        (status = 503, description = "No cycle has completed yet")
    )
)]
pub async fn get_point_illuminance(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Some(point) = state.point(&id) else {
        return point_not_found();
    };
    match point.latest() {
        Some(result) => status_response(&id, &result),
        None => error(StatusCode::SERVICE_UNAVAILABLE, "No result computed yet"),
    }
}

/// GET /api/points/{id}/attributes
/// Flat attribute map of the latest result
#[utoipa::path(
    get,
    path = "/api/points/{id}/attributes",
    params(
        ("id" = String, Path, description = "Point ID")
    ),
    responses(
        (status = 200, description = "Attribute map", body = HashMap<String, serde_json::Value>),
        (status = 404, description = "Point not found"),
        (status = 503, description = "No cycle has completed yet")
    )
)]
pub async fn get_point_attributes(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Some(point) = state.point(&id) else {
        return point_not_found();
    };
    match point.latest() {
        Some(result) => Json(result.attributes()).into_response(),
        None => error(StatusCode::SERVICE_UNAVAILABLE, "No result computed yet"),
    }
}

/// GET /api/points/{id}/helpers
/// Boolean helper states mirrored from the latest result
#[utoipa::path(
    get,
    path = "/api/points/{id}/helpers",
    params(
        ("id" = String, Path, description = "Point ID")
    ),
    responses(
        (status = 200, description = "Helper states", body = HelperStates),
        (status = 404, description = "Point not found or helpers disabled"),
        (status = 503, description = "No cycle has completed yet")
    )
)]
pub async fn get_point_helpers(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Some(point) = state.point(&id) else {
        return point_not_found();
    };
    if !point.config().helpers_enabled {
        return error(StatusCode::NOT_FOUND, "Helpers are disabled for this point");
    }
    match point.latest() {
        Some(result) => Json(HelperStates {
            dark: helper_state(&result, HelperFlag::Dark),
            dark_soon: helper_state(&result, HelperFlag::DarkSoon),
        })
        .into_response(),
        None => error(StatusCode::SERVICE_UNAVAILABLE, "No result computed yet"),
    }
}

/// POST /api/points/{id}/refresh
/// Run an update cycle now
///
/// Waits for a running periodic cycle of the same point to finish first.
#[utoipa::path(
    post,
    path = "/api/points/{id}/refresh",
    params(
        ("id" = String, Path, description = "Point ID")
    ),
    responses(
        (status = 200, description = "Fresh result", body = PointStatusResponse),
        (status = 404, description = "Point not found"),
        (status = 502, description = "Input source or engine failed; previous result kept")
    )
)]
pub async fn refresh_point(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Some(point) = state.point(&id) else {
        return point_not_found();
    };
    match point.refresh().await {
        Ok(result) => status_response(&id, &result),
        Err(e) => error(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

/// POST /api/refresh
/// Run an update cycle for every point concurrently
#[utoipa::path(
    post,
    path = "/api/refresh",
    responses(
        (status = 200, description = "Refreshed and failed point IDs", body = RefreshAllResponse)
    )
)]
pub async fn refresh_all(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.refresh_all().await).into_response()
}

/// GET /api/points/{id}/options
/// Current engine options of a point
#[utoipa::path(
    get,
    path = "/api/points/{id}/options",
    params(
        ("id" = String, Path, description = "Point ID")
    ),
    responses(
        (status = 200, description = "Current options", body = EngineOptions),
        (status = 404, description = "Point not found")
    )
)]
pub async fn get_point_options(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.point(&id) {
        Some(point) => Json(point.config().options.clone()).into_response(),
        None => point_not_found(),
    }
}

/// PUT /api/points/{id}/options
/// Replace the engine options of a point
///
/// Applied from the next cycle on. Smoothing, hysteresis and trend state
/// are kept.
#[utoipa::path(
    put,
    path = "/api/points/{id}/options",
    params(
        ("id" = String, Path, description = "Point ID")
    ),
    request_body = EngineOptions,
    responses(
        (status = 200, description = "Options accepted", body = EngineOptions),
        (status = 404, description = "Point not found"),
        (status = 422, description = "Options rejected")
    )
)]
pub async fn put_point_options(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(options): Json<EngineOptions>,
) -> impl IntoResponse {
    let Some(point) = state.point(&id) else {
        return point_not_found();
    };
    match EngineConfig::try_from(options) {
        Ok(config) => {
            let accepted = config.options.clone();
            point.reconfigure(config);
            (StatusCode::OK, Json(accepted)).into_response()
        }
        Err(e) => error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

/// GET /api/illuminance/global
/// Current lux of every point
///
/// Returns a map where keys are point IDs and values are the displayed lux.
/// Points without a result yet are left out.
#[utoipa::path(
    get,
    path = "/api/illuminance/global",
    responses(
        (status = 200, description = "Map of point ID to lux", body = HashMap<String, f64>)
    )
)]
pub async fn get_global_illuminance(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.global_illuminance()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_state::PointRuntime;
    use crate::shared_state::tests::{ScriptedProvider, point_config};

    fn state_with(helpers_enabled: bool) -> AppState {
        let mut config = point_config("garden");
        config.options = EngineConfig::try_from(EngineOptions {
            helpers_enabled,
            ..EngineOptions::default()
        })
        .unwrap();
        let provider = ScriptedProvider::new(vec![Some(35.0), None]);
        AppState::new(vec![PointRuntime::with_provider(&config, Box::new(provider))])
    }

    async fn status_of(response: impl IntoResponse) -> StatusCode {
        response.into_response().status()
    }

    #[tokio::test]
    async fn test_unknown_point_is_404() {
        let state = state_with(true);
        let status = status_of(get_point_illuminance(Path("nowhere".into()), State(state.clone())).await).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let status = status_of(refresh_point(Path("nowhere".into()), State(state)).await).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_result_lifecycle() {
        let state = state_with(true);
        let id = || Path("garden".to_string());

        let before = status_of(get_point_illuminance(id(), State(state.clone())).await).await;
        assert_eq!(before, StatusCode::SERVICE_UNAVAILABLE);

        assert_eq!(status_of(refresh_point(id(), State(state.clone())).await).await, StatusCode::OK);
        assert_eq!(status_of(get_point_illuminance(id(), State(state.clone())).await).await, StatusCode::OK);
        assert_eq!(status_of(get_point_attributes(id(), State(state.clone())).await).await, StatusCode::OK);
        assert_eq!(status_of(get_point_helpers(id(), State(state.clone())).await).await, StatusCode::OK);

        // Second scripted call fails; the previous result stays readable
        assert_eq!(status_of(refresh_point(id(), State(state.clone())).await).await, StatusCode::BAD_GATEWAY);
        assert_eq!(status_of(get_point_illuminance(id(), State(state)).await).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_helpers_disabled_is_404() {
        let state = state_with(false);
        state.point("garden").unwrap().refresh().await.unwrap();
        let status = status_of(get_point_helpers(Path("garden".into()), State(state)).await).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_options_validates() {
        let state = state_with(false);
        let id = || Path("garden".to_string());

        let inverted = EngineOptions {
            on_threshold: 5000.0,
            off_threshold: 100.0,
            ..EngineOptions::default()
        };
        let status = status_of(put_point_options(id(), State(state.clone()), Json(inverted)).await).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.point("garden").unwrap().config().on_threshold_lx, 1000.0);

        let valid = EngineOptions {
            scan_seconds: 60,
            helpers_enabled: true,
            ..EngineOptions::default()
        };
        let status = status_of(put_point_options(id(), State(state.clone()), Json(valid)).await).await;
        assert_eq!(status, StatusCode::OK);
        let config = state.point("garden").unwrap().config();
        assert_eq!(config.scan_period_seconds, 60);
        assert!(config.helpers_enabled);
    }
}
