use std::fmt;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

/// 出错时所处的处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// 解析请求体
    Parse,
    /// 上传到图床
    Upload,
    /// 调用去背景接口
    Removal,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Parse => "parse",
            Stage::Upload => "upload",
            Stage::Removal => "removal",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 应用统一错误类型
///
/// `Display` 文本会原样写入响应体的 `details` 字段，属于对外契约，保持英文。
#[derive(Error, Debug)]
pub enum AppError {
    /// 非 POST / OPTIONS 的请求方法
    #[error("method {method} is not allowed, use POST")]
    MethodNotAllowed { method: String },

    /// 缺少 imageData（或为空字符串）
    #[error("imageData field is missing or empty")]
    MissingImageData {
        /// 实际收到的请求体类型（object/string/empty 等）
        received: &'static str,
    },

    /// imageData 无法解码为图片字节
    #[error("{0}")]
    InvalidImageData(String),

    /// 请求体不是合法 JSON
    #[error("invalid JSON body: {0}")]
    MalformedBody(String),

    /// 请求体超过 `server.max_body_bytes`
    #[error("request body exceeds {limit} bytes: {message}")]
    PayloadTooLarge { limit: usize, message: String },

    /// 图床未返回可用 URL
    #[error("Failed to upload to file host: {0}")]
    UploadFailed(String),

    /// 去背景接口响应缺少 result
    #[error("Invalid response from remove background API: {0}")]
    InvalidRemovalResponse(String),

    /// 上游连接失败或返回非成功状态码
    #[error("{stage} request failed: {message}")]
    Upstream {
        stage: Stage,
        status: Option<u16>,
        message: String,
    },

    /// 上游请求超时（包含 connect/read 等阶段）
    #[error("{stage} request timed out: {message}")]
    Timeout { stage: Stage, message: String },

    /// 内部服务器错误
    #[error("internal error: {0}")]
    Internal(String),
}

/// 错误响应体
///
/// 所有失败路径都至少包含 `error`（概述）与 `details`（直接原因）。
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// 简短概述
    #[schema(example = "Failed to process image")]
    pub error: String,

    /// 直接原因
    #[schema(example = "Invalid response from remove background API: {}")]
    pub details: String,

    /// 稳定的错误码，用于程序化处理
    #[schema(example = "REMOVAL_INVALID_RESPONSE")]
    pub code: String,

    /// 出错阶段
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,

    /// 实际收到的请求体类型（仅缺少 imageData 时返回）
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "object")]
    pub received: Option<String>,

    /// 允许的请求方法（仅 405 时返回）
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "POST")]
    pub allowed_method: Option<String>,

    /// 上游返回的 HTTP 状态码
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,

    /// 请求追踪 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// RFC3339 时间戳（UTC）
    pub timestamp: String,
}

impl AppError {
    /// 将 reqwest 错误归类为超时或上游错误，并标记所处阶段。
    pub fn from_reqwest(stage: Stage, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout {
                stage,
                message: err.to_string(),
            }
        } else {
            AppError::Upstream {
                stage,
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AppError::MissingImageData { .. } | AppError::InvalidImageData(_) => {
                StatusCode::BAD_REQUEST
            }
            // 请求体解析与上游失败统一归入 500，与调用方既有的重试判断保持一致
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::MalformedBody(_)
            | AppError::UploadFailed(_)
            | AppError::InvalidRemovalResponse(_)
            | AppError::Upstream { .. }
            | AppError::Timeout { .. }
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn stable_code(&self) -> &'static str {
        match self {
            AppError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            AppError::MissingImageData { .. } | AppError::InvalidImageData(_) => {
                "VALIDATION_FAILED"
            }
            AppError::MalformedBody(_) => "MALFORMED_BODY",
            AppError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            AppError::UploadFailed(_) => "UPLOAD_FAILED",
            AppError::InvalidRemovalResponse(_) => "REMOVAL_INVALID_RESPONSE",
            AppError::Upstream { .. } => "UPSTREAM_ERROR",
            AppError::Timeout { .. } => "UPSTREAM_TIMEOUT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            AppError::MalformedBody(_) | AppError::PayloadTooLarge { .. } => Some(Stage::Parse),
            AppError::UploadFailed(_) => Some(Stage::Upload),
            AppError::InvalidRemovalResponse(_) => Some(Stage::Removal),
            AppError::Upstream { stage, .. } | AppError::Timeout { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            AppError::MethodNotAllowed { .. } => "Method not allowed",
            AppError::MissingImageData { .. } => "No image data provided",
            AppError::InvalidImageData(_) => "Invalid image data",
            AppError::PayloadTooLarge { .. } => "Payload too large",
            _ => "Failed to process image",
        }
    }

    fn to_body(&self) -> ErrorBody {
        let (received, allowed_method, upstream_status) = match self {
            AppError::MissingImageData { received } => (Some(received.to_string()), None, None),
            AppError::MethodNotAllowed { .. } => (None, Some("POST".to_string()), None),
            AppError::Upstream { status, .. } => (None, None, *status),
            _ => (None, None, None),
        };

        ErrorBody {
            error: self.summary().to_string(),
            details: self.to_string(),
            code: self.stable_code().to_string(),
            stage: self.stage(),
            received,
            allowed_method,
            upstream_status,
            request_id: crate::request_id::current_request_id(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_body();

        let mut res = Json(body).into_response();
        *res.status_mut() = status;
        if matches!(self, AppError::MethodNotAllowed { .. }) {
            res.headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST, OPTIONS"));
        }
        res
    }
}
