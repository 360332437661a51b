use std::sync::Arc;

use crate::config::AppConfig;
use crate::features::removal::RemovalService;
use crate::http::build_upstream_client;

/// 聚合的应用共享状态（只读，请求之间不共享可变数据）
#[derive(Clone)]
pub struct AppState {
    /// 去背景流水线（内含共享的出站 HTTP Client）
    pub removal: Arc<RemovalService>,
    /// 入站请求体上限，用于超限时的错误详情
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = build_upstream_client(&config.http)?;
        Ok(Self {
            removal: Arc::new(RemovalService::new(client, config)),
            max_body_bytes: config.server.max_body_bytes,
        })
    }
}
