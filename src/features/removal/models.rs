use serde::{Deserialize, Serialize};

/// 去背景请求体
///
/// 实际解析由 [`super::payload::extract_image_data`] 完成（兼容二次序列化的字符串请求体），
/// 此结构用于 OpenAPI 描述与客户端构造请求。
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemovalRequest {
    /// 原始 base64 或 data URI（`data:image/png;base64,...`）
    #[schema(example = "data:image/png;base64,iVBORw0KGgo=")]
    pub image_data: String,
}

/// 去背景成功响应
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemovalResponse {
    /// 恒为 true
    pub success: bool,
    /// 去背景接口返回的 result 字段（原样透传，通常为图片 URL）
    #[schema(value_type = Object, example = "https://cdn.example/processed.png")]
    pub result: serde_json::Value,
    /// 图床上的原图 URL
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "https://files.catbox.moe/abc123.png")]
    pub original_url: Option<String>,
}

/// 上传到图床时使用的文件描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
}

/// 解码后的图片
#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// 原始字节
    pub bytes: Vec<u8>,
    /// data URI 声明的 MIME（小写）
    pub declared_mime: Option<String>,
}
