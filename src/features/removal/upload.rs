use reqwest::multipart::{Form, Part};
use std::time::Duration;

use super::models::UploadFile;
use super::preview;
use crate::config::UploadConfig;
use crate::error::{AppError, Stage};

/// 图床上传客户端（catbox 风格：multipart `reqtype=fileupload` + `fileToUpload`，响应体为纯文本 URL）
#[derive(Clone)]
pub struct FileHostClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl FileHostClient {
    pub fn new(client: reqwest::Client, config: &UploadConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.trim().to_string(),
            timeout: config.timeout_duration(),
        }
    }

    /// 上传图片字节，返回图床上的公开 URL
    pub async fn upload(&self, bytes: Vec<u8>, file: &UploadFile) -> Result<String, AppError> {
        let part = Part::bytes(bytes)
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| {
                AppError::Internal(format!("无效的 Content-Type {}: {e}", file.content_type))
            })?;
        let form = Form::new()
            .text("reqtype", "fileupload")
            .part("fileToUpload", part);

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::from_reqwest(Stage::Upload, e))?
            .error_for_status()
            .map_err(|e| AppError::from_reqwest(Stage::Upload, e))?;

        let text = response
            .text()
            .await
            .map_err(|e| AppError::from_reqwest(Stage::Upload, e))?;

        validate_hosted_url(&text)
    }
}

/// 图床响应必须是 http(s) URL，否则视为上传失败（catbox 出错时同样返回 200 + 纯文本错误）
pub fn validate_hosted_url(raw: &str) -> Result<String, AppError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(AppError::UploadFailed("empty response".to_string()));
    }

    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(AppError::UploadFailed(preview(url)));
    }

    Ok(url.to_string())
}
