use reqwest::Client;
use std::time::Duration;

use crate::config::HttpClientConfig;

/// 构建出站共享的 HTTP Client（统一连接池/Keep-Alive）。
///
/// 说明：
/// - 只设置建连超时；整体超时按调用点（上传 30s / 去背景 60s）在请求上单独设置。
/// - `Client` 内部是 Arc，clone 后放入 `AppState` 在请求间只读共享。
pub fn build_upstream_client(cfg: &HttpClientConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs.max(1)))
        .user_agent(cfg.user_agent.as_str())
        .pool_idle_timeout(Duration::from_secs(90));
    if !cfg.proxy_from_env {
        builder = builder.no_proxy();
    }
    builder.build()
}
