use axum::Json;
use utoipa::openapi::server::ServerBuilder;
use utoipa::{Modify, OpenApi};

/// 业务接口与 `/health` 都挂在根路径下，前缀由 `api.prefix` 决定（默认为空）。
struct ApiServers;

impl Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径（api.prefix 非空时需自行拼接）"))
            .build();

        openapi.servers = Some(vec![root]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::removal::handler::remove_background,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::Stage,
            crate::features::removal::RemovalRequest,
            crate::features::removal::RemovalResponse,
            crate::features::health::HealthResponse,
        )
    ),
    modifiers(&ApiServers),
    tags(
        (name = "Removal", description = "Background removal relay"),
        (name = "Health", description = "Health APIs"),
    ),
    info(
        title = "bg-relay API",
        version = "0.1.0",
        description = "Uploads an image to a public file host and relays it to a background-removal API (Axum)"
    )
)]
pub struct ApiDoc;

/// 返回 OpenAPI JSON
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
