//! 配置
//!
//! 从 `<config_dir>/gconnect-signin/config.json` 读取，缺失时使用默认值。

use crate::error::SignInError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_DIR_NAME: &str = "gconnect-signin";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// 回调配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInConfig {
    /// 服务器地址
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// 页面渲染时下发的防伪 state
    #[serde(default)]
    pub state_token: String,
    /// 跳转延迟（毫秒），0 表示当前调用返回后立即跳转
    #[serde(default)]
    pub redirect_delay_ms: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_timeout() -> u64 {
    60
}

impl Default for SignInConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            state_token: String::new(),
            redirect_delay_ms: 0,
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
        }
    }
}

impl SignInConfig {
    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// 读取配置文件，文件不存在时返回默认配置
    pub fn load(path: Option<&Path>) -> Result<Self, SignInError> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            debug!("配置文件不存在，使用默认配置: {}", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        let config: SignInConfig = serde_json::from_str(&raw)?;
        debug!("已加载配置: {}", path.display());
        Ok(config)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 校验服务器地址
    ///
    /// `state_token` is checked by the handler once a code is present.
    pub fn validate(&self) -> Result<(), SignInError> {
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(SignInError::Config(format!(
                "server_url 必须以 http:// 或 https:// 开头: {}",
                self.server_url
            )));
        }
        Ok(())
    }
}
