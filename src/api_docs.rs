use utoipa::OpenApi;

use crate::config;
use crate::controllers::illuminance_controller;
use crate::models::illuminance;
use crate::services::window_exposure;

#[derive(OpenApi)]
#[openapi(
    paths(
        illuminance_controller::list_points,
        illuminance_controller::get_point_illuminance,
        illuminance_controller::get_point_attributes,
        illuminance_controller::get_point_helpers,
        illuminance_controller::refresh_point,
        illuminance_controller::refresh_all,
        illuminance_controller::get_point_options,
        illuminance_controller::put_point_options,
        illuminance_controller::get_global_illuminance
    ),
    components(
        schemas(
            illuminance::PointSummary,
            illuminance::PointStatusResponse,
            illuminance::UpdateResult,
            illuminance::HelperStates,
            illuminance::RefreshAllResponse,
            illuminance::Mode,
            illuminance::Daypart,
            illuminance::GlareRisk,
            config::EngineOptions,
            window_exposure::Window
        )
    ),
    tags(
        (name = "illuminance-plus", description = "Illuminance Estimation & Classification API")
    )
)]
pub struct ApiDoc;
