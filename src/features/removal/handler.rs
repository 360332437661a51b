use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
};

use crate::error::AppError;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/remini",
    summary = "图片去背景",
    description = "接收 base64 / data URI 图片，上传至图床后调用去背景接口，返回处理结果 URL。\
        实际路径由 `api.prefix` + `api.endpoint` 决定；同一路径上 OPTIONS 返回空 200，其余方法返回 405。",
    request_body = crate::features::removal::RemovalRequest,
    responses(
        (status = 200, description = "处理成功", body = crate::features::removal::RemovalResponse),
        (status = 400, description = "缺少或无法解码 imageData", body = crate::error::ErrorBody),
        (status = 405, description = "请求方法不被允许", body = crate::error::ErrorBody),
        (status = 413, description = "请求体超过 server.max_body_bytes", body = crate::error::ErrorBody),
        (status = 500, description = "请求体解析失败或上游处理失败", body = crate::error::ErrorBody)
    ),
    tag = "Removal"
)]
pub async fn remove_background(
    State(state): State<AppState>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    // 预检请求：CORS 头由全局中间件写入，这里只需返回空 200
    if method == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }
    if method != Method::POST {
        return Err(AppError::MethodNotAllowed {
            method: method.to_string(),
        });
    }

    let body = body.map_err(|rejection| body_rejection(rejection, state.max_body_bytes))?;
    let resp = state.removal.process(&body).await?;
    Ok((StatusCode::OK, Json(resp)).into_response())
}

/// 请求体读取失败：超限为 413，其余按请求体解析失败处理
fn body_rejection(rejection: BytesRejection, limit: usize) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge {
            limit,
            message: rejection.body_text(),
        }
    } else {
        AppError::MalformedBody(rejection.body_text())
    }
}

/// 所有方法都路由到同一处理函数，由其自行区分 OPTIONS / POST / 其他
pub fn create_removal_router(path: &str) -> Router<AppState> {
    Router::<AppState>::new().route(path, any(remove_background))
}
