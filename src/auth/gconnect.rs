//! /gconnect 授权码转交
//!
//! 把登录组件给出的授权码原样（不做表单编码）POST 给服务器。

use crate::config::SignInConfig;
use crate::error::SignInError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

/// 服务器授权码接收路由
pub const GCONNECT_PATH: &str = "/gconnect";
/// 授权码请求的 Content-Type
pub const CODE_CONTENT_TYPE: &str = "application/octet-stream; charset=utf-8";

/// 授权码转交
#[async_trait]
pub trait CodeExchange: Send + Sync {
    /// Send `code` to the server and return the response body.
    ///
    /// Only 2xx responses count as a response; anything else is an error.
    async fn exchange(&self, state: &str, code: &str) -> Result<String, SignInError>;
}

/// 构建 /gconnect URL
pub fn build_connect_url(server_url: &str, state: &str) -> String {
    format!(
        "{}{}?state={}",
        server_url.trim_end_matches('/'),
        GCONNECT_PATH,
        urlencoding::encode(state)
    )
}

/// 日志用授权码前缀
pub(crate) fn code_preview(code: &str) -> String {
    code.chars().take(20).collect()
}

/// 基于 reqwest 的实现
#[derive(Debug, Clone)]
pub struct HttpCodeExchange {
    client: Client,
    server_url: String,
}

impl HttpCodeExchange {
    pub fn new(config: &SignInConfig) -> Result<Self, SignInError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            server_url: config.server_url.clone(),
        })
    }
}

#[async_trait]
impl CodeExchange for HttpCodeExchange {
    async fn exchange(&self, state: &str, code: &str) -> Result<String, SignInError> {
        let url = build_connect_url(&self.server_url, state);

        debug!("转交授权码: url={}, code={}", url, code_preview(code));

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, CODE_CONTENT_TYPE)
            .body(code.as_bytes().to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SignInError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        debug!("服务器响应: status={}, {} bytes", status, body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    struct CapturedRequest {
        request_line: String,
        headers: String,
        body: Vec<u8>,
    }

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = find_header_end(&buf) {
                break end;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let (request_line, headers) = head.split_once("\r\n").unwrap_or((head.as_str(), ""));
        let headers = headers.to_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < header_end + 4 + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }

        CapturedRequest {
            request_line: request_line.to_string(),
            headers,
            body: buf[header_end + 4..header_end + 4 + content_length].to_vec(),
        }
    }

    /// Serves exactly one request and hands back what it received.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        (format!("http://{}", addr), handle)
    }

    fn exchange_for(server_url: String) -> HttpCodeExchange {
        let config = SignInConfig {
            server_url,
            state_token: "unused".to_string(),
            connect_timeout_secs: 5,
            timeout_secs: 10,
            ..Default::default()
        };
        HttpCodeExchange::new(&config).unwrap()
    }

    #[test]
    fn test_build_connect_url() {
        assert_eq!(
            build_connect_url("http://localhost:8080", "XYZ"),
            "http://localhost:8080/gconnect?state=XYZ"
        );
        assert_eq!(
            build_connect_url("https://catalog.example/", "a/b+c"),
            "https://catalog.example/gconnect?state=a%2Fb%2Bc"
        );
    }

    #[test]
    fn test_code_preview_respects_char_boundaries() {
        assert_eq!(code_preview("abc"), "abc");
        let code = "✓".repeat(30);
        assert_eq!(code_preview(&code).chars().count(), 20);
    }

    #[tokio::test]
    async fn test_exchange_sends_raw_code() {
        let (url, server) = serve_once("200 OK", "Welcome, Ada!").await;

        let body = exchange_for(url).exchange("STATE123", "4/0AbcDEF").await.unwrap();
        assert_eq!(body, "Welcome, Ada!");

        let request = server.await.unwrap();
        assert_eq!(request.request_line, "POST /gconnect?state=STATE123 HTTP/1.1");
        assert!(request
            .headers
            .contains("content-type: application/octet-stream; charset=utf-8"));
        assert_eq!(request.body, b"4/0AbcDEF");
    }

    #[tokio::test]
    async fn test_exchange_body_is_not_form_encoded() {
        let (url, server) = serve_once("200 OK", "ok").await;

        let code = format!("ñ✓ a=b&c+d/{}", "x".repeat(8 * 1024));
        exchange_for(url).exchange("s", &code).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.request_line.starts_with("POST /gconnect?state=s "));
        assert_eq!(request.body, code.as_bytes());
    }

    #[tokio::test]
    async fn test_exchange_empty_body() {
        let (url, server) = serve_once("200 OK", "").await;

        let body = exchange_for(url).exchange("s", "abc").await.unwrap();
        assert!(body.is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_exchange_non_success_status() {
        let (url, server) = serve_once("401 Unauthorized", "Invalid state parameter.").await;

        let err = exchange_for(url).exchange("bad", "abc").await.unwrap_err();
        match err {
            SignInError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "Invalid state parameter.");
            }
            other => panic!("unexpected error: {other}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_exchange_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = exchange_for(format!("http://{}", addr)).exchange("s", "abc").await;
        assert!(matches!(result, Err(SignInError::Transport(_))));
    }
}
