use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 指定配置文件路径的环境变量
const CONFIG_PATH_ENV: &str = "BG_RELAY_CONFIG";

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
    /// 入站请求体上限（字节），base64 图片通常比原图大 1/3
    #[serde(default = "ServerConfig::default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }
    fn default_port() -> u16 {
        3000
    }
    fn default_max_body_bytes() -> usize {
        32 * 1024 * 1024
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            max_body_bytes: Self::default_max_body_bytes(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（未设置 RUST_LOG 时生效）
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    /// 日志格式：full | compact
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
    fn default_format() -> String {
        "full".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: Self::default_format(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀（可为空）
    #[serde(default)]
    pub prefix: String,
    /// 去背景入口路径
    #[serde(default = "ApiConfig::default_endpoint")]
    pub endpoint: String,
}

impl ApiConfig {
    fn default_endpoint() -> String {
        "/api/remini".to_string()
    }

    /// 前缀与入口路径拼接后的完整路由
    pub fn route_path(&self) -> String {
        format!("{}{}", self.prefix.trim_end_matches('/'), self.endpoint)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            endpoint: Self::default_endpoint(),
        }
    }
}

/// CORS 配置
///
/// 默认值即浏览器端调用方依赖的宽松策略，每个响应都会携带。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否写入 CORS 响应头
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// Access-Control-Allow-Origin（"*" 或单个 Origin）
    #[serde(default = "CorsConfig::default_allowed_origin")]
    pub allowed_origin: String,
    /// Access-Control-Allow-Credentials
    #[serde(default = "CorsConfig::default_allow_credentials")]
    pub allow_credentials: bool,
    /// Access-Control-Allow-Methods
    #[serde(default = "CorsConfig::default_allowed_methods")]
    pub allowed_methods: Vec<String>,
    /// Access-Control-Allow-Headers
    #[serde(default = "CorsConfig::default_allowed_headers")]
    pub allowed_headers: Vec<String>,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_allowed_origin() -> String {
        "*".to_string()
    }

    fn default_allow_credentials() -> bool {
        true
    }

    fn default_allowed_methods() -> Vec<String> {
        ["GET", "OPTIONS", "PATCH", "DELETE", "POST", "PUT"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn default_allowed_headers() -> Vec<String> {
        [
            "X-CSRF-Token",
            "X-Requested-With",
            "Accept",
            "Accept-Version",
            "Content-Length",
            "Content-MD5",
            "Content-Type",
            "Date",
            "X-Api-Version",
            "Authorization",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origin: Self::default_allowed_origin(),
            allow_credentials: Self::default_allow_credentials(),
            allowed_methods: Self::default_allowed_methods(),
            allowed_headers: Self::default_allowed_headers(),
            max_age_secs: None,
        }
    }
}

/// 图床上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 上传端点（multipart POST）
    #[serde(default = "UploadConfig::default_endpoint")]
    pub endpoint: String,
    /// 上传超时（秒）
    #[serde(default = "UploadConfig::default_timeout")]
    pub timeout_secs: u64,
    /// 无法识别图片格式时使用的文件名
    #[serde(default = "UploadConfig::default_file_name")]
    pub default_file_name: String,
    /// 无法识别图片格式时使用的 Content-Type
    #[serde(default = "UploadConfig::default_content_type")]
    pub default_content_type: String,
}

impl UploadConfig {
    fn default_endpoint() -> String {
        "https://catbox.moe/user/api.php".to_string()
    }
    fn default_timeout() -> u64 {
        30
    }
    fn default_file_name() -> String {
        "image.png".to_string()
    }
    fn default_content_type() -> String {
        "image/png".to_string()
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            timeout_secs: Self::default_timeout(),
            default_file_name: Self::default_file_name(),
            default_content_type: Self::default_content_type(),
        }
    }
}

/// 去背景接口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalConfig {
    /// 去背景接口（GET ?url=...）
    #[serde(default = "RemovalConfig::default_endpoint")]
    pub endpoint: String,
    /// 请求超时（秒），远端推理较慢，默认长于上传
    #[serde(default = "RemovalConfig::default_timeout")]
    pub timeout_secs: u64,
    /// 成功响应中是否附带图床 URL（originalUrl）
    #[serde(default = "RemovalConfig::default_include_original_url")]
    pub include_original_url: bool,
}

impl RemovalConfig {
    fn default_endpoint() -> String {
        "https://api.elrayyxml.web.id/api/tools/removebg".to_string()
    }
    fn default_timeout() -> u64 {
        60
    }
    fn default_include_original_url() -> bool {
        true
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            timeout_secs: Self::default_timeout(),
            include_original_url: Self::default_include_original_url(),
        }
    }
}

/// 出站 HTTP Client 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// 建连超时（秒）
    #[serde(default = "HttpClientConfig::default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// User-Agent
    #[serde(default = "HttpClientConfig::default_user_agent")]
    pub user_agent: String,
    /// 是否读取 HTTP(S)_PROXY 等环境变量代理
    #[serde(default = "HttpClientConfig::default_proxy_from_env")]
    pub proxy_from_env: bool,
}

impl HttpClientConfig {
    fn default_connect_timeout() -> u64 {
        10
    }
    fn default_user_agent() -> String {
        format!("bg-relay/{}", env!("CARGO_PKG_VERSION"))
    }
    fn default_proxy_from_env() -> bool {
        true
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: Self::default_connect_timeout(),
            user_agent: Self::default_user_agent(),
            proxy_from_env: Self::default_proxy_from_env(),
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 等待在途请求完成的最长时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 图床上传配置
    #[serde(default)]
    pub upload: UploadConfig,
    /// 去背景接口配置
    #[serde(default)]
    pub removal: RemovalConfig,
    /// 出站 HTTP Client 配置
    #[serde(default)]
    pub http: HttpClientConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置（文件可缺省），支持环境变量覆盖
    ///
    /// 环境变量以 `APP_` 开头，层级用 `__` 分隔，例如 `APP_REMOVAL__TIMEOUT_SECS=90`。
    /// 加载发生在日志初始化之前，因此这里不输出日志，由调用方在初始化后记录 [`Self::config_path`]。
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        let builder = ConfigBuilder::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_methods")
                    .with_list_parse_key("cors.allowed_headers")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = builder.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(())
    }

    /// 配置文件路径：`BG_RELAY_CONFIG` 优先，否则为工作目录下的 `config.toml`
    pub fn config_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 启动前校验：拒绝明显不可用的配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_endpoint("upload.endpoint", &self.upload.endpoint)?;
        check_endpoint("removal.endpoint", &self.removal.endpoint)?;

        if self.upload.timeout_secs == 0 {
            return Err(ConfigError::Message("upload.timeout_secs 必须大于 0".into()));
        }
        if self.removal.timeout_secs == 0 {
            return Err(ConfigError::Message("removal.timeout_secs 必须大于 0".into()));
        }
        if !self.api.endpoint.starts_with('/') {
            return Err(ConfigError::Message(format!(
                "api.endpoint 必须以 / 开头: {}",
                self.api.endpoint
            )));
        }
        if !self.api.prefix.is_empty() && !self.api.prefix.starts_with('/') {
            return Err(ConfigError::Message(format!(
                "api.prefix 必须为空或以 / 开头: {}",
                self.api.prefix
            )));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Message("server.max_body_bytes 必须大于 0".into()));
        }
        Ok(())
    }
}

fn check_endpoint(key: &str, value: &str) -> Result<(), ConfigError> {
    let v = value.trim();
    if v.starts_with("http://") || v.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Message(format!(
            "{key} 必须是 http(s) 地址: {value:?}"
        )))
    }
}
