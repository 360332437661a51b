use std::time::Instant;

use super::models::RemovalResponse;
use super::payload::{decode_image_data, extract_image_data, upload_file_for};
use super::remover::RemovalClient;
use super::upload::FileHostClient;
use crate::config::{AppConfig, UploadConfig};
use crate::error::AppError;

/// 去背景流水线：各步骤依次执行，任一步失败立即返回，不做重试。
#[derive(Clone)]
pub struct RemovalService {
    uploader: FileHostClient,
    remover: RemovalClient,
    upload_defaults: UploadConfig,
    include_original_url: bool,
}

impl RemovalService {
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            uploader: FileHostClient::new(client.clone(), &config.upload),
            remover: RemovalClient::new(client, &config.removal),
            upload_defaults: config.upload.clone(),
            include_original_url: config.removal.include_original_url,
        }
    }

    /// 处理一次请求体，失败时记录阶段与原因后原样返回错误
    pub async fn process(&self, body: &[u8]) -> Result<RemovalResponse, AppError> {
        let started = Instant::now();
        let result = self.run(body).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => tracing::info!(elapsed_ms, "去背景完成"),
            Err(e) if e.status_code().is_client_error() => {
                tracing::warn!(code = e.stable_code(), elapsed_ms, "请求校验失败: {}", e)
            }
            Err(e) => tracing::error!(
                stage = e.stage().map(|s| s.as_str()),
                code = e.stable_code(),
                elapsed_ms,
                "图片处理失败: {}",
                e
            ),
        }
        result
    }

    async fn run(&self, body: &[u8]) -> Result<RemovalResponse, AppError> {
        let image_data = extract_image_data(body)?;
        let payload = decode_image_data(&image_data)?;
        let file = upload_file_for(&payload, &self.upload_defaults);

        tracing::info!(
            bytes = payload.bytes.len(),
            content_type = %file.content_type,
            "开始上传图床"
        );
        let hosted_url = self.uploader.upload(payload.bytes, &file).await?;
        tracing::info!(url = %hosted_url, "图床上传完成，开始去背景");

        let result = self.remover.remove_background(&hosted_url).await?;

        Ok(RemovalResponse {
            success: true,
            result,
            original_url: self.include_original_url.then_some(hosted_url),
        })
    }
}
