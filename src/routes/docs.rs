use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

const SWAGGER_UI_PATH: &str = "/docs";
const OPENAPI_JSON_PATH: &str = "/api-doc/openapi.json";

/// Swagger UI over the health and table-client routes.
pub fn router() -> Router<SharedState> {
    SwaggerUi::new(SWAGGER_UI_PATH)
        .url(OPENAPI_JSON_PATH, ApiDoc::openapi())
        .into()
}
