//! 图片去背景转发（features/removal）
//!
//! 单条线性流水线：解析请求体 → 解码 base64 → 上传图床 → 调用去背景接口。
pub mod handler;
pub mod models;
pub mod payload;
pub mod remover;
pub mod service;
pub mod upload;

// Re-exports for external use (app.rs, OpenAPI, etc.)
pub use handler::{create_removal_router, remove_background};
pub use models::{RemovalRequest, RemovalResponse};
pub use service::RemovalService;

/// 上游响应写入错误信息前的最大字符数
const PREVIEW_CHARS: usize = 256;

/// 截断上游响应文本，避免把整页 HTML 塞进错误详情
pub(crate) fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(PREVIEW_CHARS).collect();
    out.push('…');
    out
}
