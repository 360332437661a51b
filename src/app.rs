use axum::{Router, extract::DefaultBodyLimit, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::cors::{build_cors_headers, cors_headers_middleware};
use crate::features::{health::health_check, removal::create_removal_router};
use crate::openapi::openapi_json;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 按配置装配完整路由（main 与集成测试共用）
pub fn build_app(config: &AppConfig) -> Result<Router, reqwest::Error> {
    let state = AppState::from_config(config)?;
    Ok(build_router(state, config))
}

/// 在已有状态上装配路由与中间件
///
/// 中间件由内到外：请求体上限 → TraceLayer → CORS 响应头 → request_id。
/// CORS 在外层，因此 405/400/500、请求体超限以及未匹配路由的响应同样带 CORS 头。
pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    let route_path = config.api.route_path();

    let mut app = Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(create_removal_router(&route_path))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_headers(&config.cors) {
        app = app.layer(axum::middleware::from_fn_with_state(
            Arc::new(cors),
            cors_headers_middleware,
        ));
    }

    app.layer(axum::middleware::from_fn(request_id_middleware))
}
