#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    extract::RawQuery,
    http::{HeaderMap, Request, StatusCode, header},
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

use bg_relay::AppConfig;

/// 1x1 PNG 的前 8 个字节（PNG 签名）
pub const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgo=";
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// 图床收到的一次上传
#[derive(Debug, Clone)]
pub struct CapturedUpload {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// 本地假上游：/upload 模拟图床，/removebg 模拟去背景接口
pub struct MockUpstreams {
    pub base_url: String,
    pub upload_calls: Arc<AtomicUsize>,
    pub removal_calls: Arc<AtomicUsize>,
    pub last_upload: Arc<Mutex<Option<CapturedUpload>>>,
    pub last_removal_query: Arc<Mutex<Option<String>>>,
}

impl MockUpstreams {
    pub fn upload_count(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn removal_count(&self) -> usize {
        self.removal_calls.load(Ordering::SeqCst)
    }

    /// 指向本地假上游的配置（不走环境变量代理）
    pub fn config(&self) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.upload.endpoint = format!("{}/upload", self.base_url);
        cfg.removal.endpoint = format!("{}/removebg", self.base_url);
        cfg.http.proxy_from_env = false;
        cfg
    }
}

pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind tcp listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// 启动假上游：图床按 `upload_reply` 应答，去背景接口按 `removal_reply` 应答（JSON 文本）
pub async fn spawn_upstreams(
    upload_reply: (StatusCode, &'static str),
    removal_reply: (StatusCode, &'static str),
) -> MockUpstreams {
    let upload_calls = Arc::new(AtomicUsize::new(0));
    let removal_calls = Arc::new(AtomicUsize::new(0));
    let last_upload = Arc::new(Mutex::new(None));
    let last_removal_query = Arc::new(Mutex::new(None));

    let upload = {
        let calls = upload_calls.clone();
        let captured = last_upload.clone();
        move |headers: HeaderMap, body: Bytes| {
            let calls = calls.clone();
            let captured = captured.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let content_type = headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                *captured.lock().unwrap() = Some(CapturedUpload {
                    content_type,
                    body: body.to_vec(),
                });
                upload_reply
            }
        }
    };

    let removal = {
        let calls = removal_calls.clone();
        let captured = last_removal_query.clone();
        move |RawQuery(query): RawQuery| {
            let calls = calls.clone();
            let captured = captured.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                *captured.lock().unwrap() = query;
                (
                    removal_reply.0,
                    [(header::CONTENT_TYPE, "application/json")],
                    removal_reply.1,
                )
            }
        }
    };

    let router = Router::new()
        .route("/upload", post(upload))
        .route("/removebg", get(removal));
    let addr = serve(router).await;

    MockUpstreams {
        base_url: format!("http://{addr}"),
        upload_calls,
        removal_calls,
        last_upload,
        last_removal_query,
    }
}

/// 只接受连接、永不应答的服务，用于触发客户端超时
pub async fn start_hanging_http_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind tcp listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(v) => v,
                Err(_) => break,
            };
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                drop(socket);
            });
        }
    });

    addr
}

pub fn image_body(image_data: &str) -> String {
    serde_json::json!({ "imageData": image_data }).to_string()
}

/// 对路由发起一次请求，返回状态码、响应头与原始响应体
pub async fn call(
    app: Router,
    method: &str,
    uri: &str,
    body: impl Into<Body>,
) -> (StatusCode, HeaderMap, Bytes) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("call app");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, headers, bytes)
}

pub fn json(bytes: &Bytes) -> serde_json::Value {
    serde_json::from_slice(bytes).expect("parse json body")
}

pub fn assert_cors_headers(headers: &HeaderMap) {
    let get = |name: header::HeaderName| {
        headers
            .get(&name)
            .unwrap_or_else(|| panic!("missing {name}"))
            .to_str()
            .expect("header to str")
            .to_string()
    };
    assert_eq!(get(header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
    assert_eq!(get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS), "true");
    assert_eq!(
        get(header::ACCESS_CONTROL_ALLOW_METHODS),
        "GET,OPTIONS,PATCH,DELETE,POST,PUT"
    );
    assert!(get(header::ACCESS_CONTROL_ALLOW_HEADERS).contains("X-CSRF-Token"));
}
