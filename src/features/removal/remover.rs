use serde_json::Value;
use std::time::Duration;

use super::preview;
use crate::config::RemovalConfig;
use crate::error::{AppError, Stage};

/// 去背景接口客户端：`GET <endpoint>?url=<图床 URL>`，响应 JSON 的 `result` 字段即处理结果
#[derive(Clone)]
pub struct RemovalClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl RemovalClient {
    pub fn new(client: reqwest::Client, config: &RemovalConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.trim().to_string(),
            timeout: config.timeout_duration(),
        }
    }

    /// 调用去背景接口，返回 `result` 字段
    ///
    /// 5xx 视为上游故障；4xx 仍解析响应体（部分实现会在 4xx 里带回错误 JSON），缺少 result 时报无效响应。
    pub async fn remove_background(&self, hosted_url: &str) -> Result<Value, AppError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", hosted_url)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::from_reqwest(Stage::Removal, e))?;

        let status = response.status();
        tracing::info!(status = status.as_u16(), "去背景接口已响应");

        if status.is_server_error() {
            return Err(AppError::Upstream {
                stage: Stage::Removal,
                status: Some(status.as_u16()),
                message: format!("remove background API responded with {status}"),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::from_reqwest(Stage::Removal, e))?;

        tracing::debug!(
            body = %preview(&String::from_utf8_lossy(&body)),
            "去背景接口响应体"
        );
        extract_result(&body)
    }
}

/// 从响应体中取出非空的 `result`
pub fn extract_result(body: &[u8]) -> Result<Value, AppError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| {
        AppError::InvalidRemovalResponse(preview(&String::from_utf8_lossy(body)))
    })?;

    match value.get("result") {
        Some(result) if is_present(result) => Ok(result.clone()),
        _ => Err(AppError::InvalidRemovalResponse(preview(&value.to_string()))),
    }
}

fn is_present(v: &Value) -> bool {
    match v {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
