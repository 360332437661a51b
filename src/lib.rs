/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// CORS 响应头模块
pub mod cors;

/// 请求 ID 中间件
pub mod request_id;

/// 功能聚合模块
pub mod features;

/// 应用状态聚合模块
pub mod state;

/// 路由装配
pub mod app;

/// OpenAPI 文档
pub mod openapi;

/// 优雅退出管理模块
pub mod shutdown;

/// 上游 HTTP Client 构建
pub mod http;

// 导出常用类型供外部使用
pub use app::build_app;
pub use config::AppConfig;
pub use error::{AppError, Stage};
pub use shutdown::{ShutdownManager, ShutdownReason};
