use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::CorsConfig;

/// 预先校验好的 CORS 响应头，每个响应原样写入。
///
/// 浏览器端调用方依赖 `Allow-Origin: *` 与 `Allow-Credentials: true` 同时出现，
/// tower-http 的 `CorsLayer` 会拒绝这种组合，因此这里直接写固定响应头。
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    allow_origin: HeaderValue,
    allow_credentials: bool,
    allow_methods: Option<HeaderValue>,
    allow_headers: Option<HeaderValue>,
    max_age: Option<HeaderValue>,
}

impl CorsHeaders {
    /// 覆盖写入 CORS 响应头
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            self.allow_origin.clone(),
        );
        if self.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if let Some(v) = &self.allow_methods {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, v.clone());
        }
        if let Some(v) = &self.allow_headers {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, v.clone());
        }
        if let Some(v) = &self.max_age {
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, v.clone());
        }
    }
}

/// 根据配置构建 CORS 响应头；未启用或 Origin 非法时返回 None
pub fn build_cors_headers(cors: &CorsConfig) -> Option<CorsHeaders> {
    if !cors.enabled {
        return None;
    }

    let origin = cors.allowed_origin.trim();
    let allow_origin = match HeaderValue::from_str(origin) {
        Ok(v) if !origin.is_empty() => v,
        _ => {
            tracing::error!("CORS allowed_origin 无效: {:?}，已跳过启用", cors.allowed_origin);
            return None;
        }
    };

    let methods = parse_allowed_methods(&cors.allowed_methods);
    let headers = parse_header_names(&cors.allowed_headers);

    let allow_methods = join_header_value(&methods, ",");
    let allow_headers = join_header_value(&headers, ", ");
    let max_age = cors
        .max_age_secs
        .filter(|secs| *secs > 0)
        .map(HeaderValue::from);

    Some(CorsHeaders {
        allow_origin,
        allow_credentials: cors.allow_credentials,
        allow_methods,
        allow_headers,
        max_age,
    })
}

/// 全局 CORS 中间件：无论成功、失败还是预检，响应都带上同一组头。
pub async fn cors_headers_middleware(
    State(cors): State<Arc<CorsHeaders>>,
    req: Request,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;
    cors.apply(res.headers_mut());
    res
}

fn join_header_value(values: &[String], sep: &str) -> Option<HeaderValue> {
    if values.is_empty() {
        return None;
    }
    HeaderValue::from_str(&values.join(sep)).ok()
}

fn parse_allowed_methods(values: &[String]) -> Vec<String> {
    let mut methods = Vec::new();
    for raw in values {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        let normalized = value.to_ascii_uppercase();
        match Method::from_bytes(normalized.as_bytes()) {
            Ok(_) => methods.push(normalized),
            Err(_) => tracing::warn!("CORS allowed_methods 含无效值: {}", value),
        }
    }
    methods
}

/// 校验请求头名称，但保留原始大小写写回响应
fn parse_header_names(values: &[String]) -> Vec<String> {
    let mut headers = Vec::new();
    for raw in values {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        match header::HeaderName::from_bytes(value.as_bytes()) {
            Ok(_) => headers.push(value.to_string()),
            Err(_) => tracing::warn!("CORS allowed_headers 含无效值: {}", value),
        }
    }
    headers
}
