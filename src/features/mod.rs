/// 健康检查
pub mod health;

/// 图片去背景转发
pub mod removal;
