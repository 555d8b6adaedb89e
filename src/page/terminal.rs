//! 终端页面
//!
//! Used by the `callback` CLI command: HTML goes to stdout, console lines to
//! stderr, and navigation fetches the target path from the server.

use super::{Console, Element, Navigator, PageHandles, RESULT_ID, SIGN_IN_BUTTON_ID};
use crate::config::SignInConfig;
use crate::error::SignInError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

struct TerminalElement {
    id: &'static str,
}

impl Element for TerminalElement {
    fn id(&self) -> &str {
        self.id
    }

    fn hide(&self) {
        debug!("隐藏元素: #{}", self.id);
    }

    fn set_html(&self, html: &str) {
        debug!("更新元素: #{}", self.id);
        println!("{}", html);
    }
}

struct TerminalConsole;

impl Console for TerminalConsole {
    fn log(&self, message: &str) {
        eprintln!("{}", message);
    }
}

/// 通过 GET 请求模拟整页跳转
#[derive(Debug, Clone)]
pub struct HttpNavigator {
    client: Client,
    server_url: String,
}

impl HttpNavigator {
    pub fn new(config: &SignInConfig) -> Result<Self, SignInError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            server_url: config.server_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.server_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Navigator for HttpNavigator {
    async fn navigate(&self, path: &str) -> Result<(), SignInError> {
        let url = self.url_for(path);
        info!("跳转: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SignInError::Navigation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SignInError::Navigation(format!("{} 返回 {}", url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SignInError::Navigation(e.to_string()))?;
        debug!("页面已加载: {} bytes", body.len());
        Ok(())
    }
}

/// 终端页面句柄
pub fn terminal_page(config: &SignInConfig) -> Result<PageHandles, SignInError> {
    Ok(PageHandles {
        sign_in_button: Arc::new(TerminalElement {
            id: SIGN_IN_BUTTON_ID,
        }),
        result: Arc::new(TerminalElement { id: RESULT_ID }),
        navigator: Arc::new(HttpNavigator::new(config)?),
        console: Arc::new(TerminalConsole),
    })
}
