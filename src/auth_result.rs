//! 登录组件回调数据结构

use serde::{Deserialize, Serialize};

/// 登录组件返回的结果
///
/// Unknown fields sent by the widget are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    /// 授权码
    #[serde(default)]
    pub code: Option<String>,
    /// 组件报告的错误
    #[serde(default)]
    pub error: Option<String>,
}

impl AuthResult {
    #[cfg(test)]
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            error: None,
        }
    }

    /// 授权码（空字符串视为不存在）
    pub fn authorization_code(&self) -> Option<&str> {
        self.code.as_deref().filter(|code| !code.is_empty())
    }

    /// 组件错误（空字符串视为不存在）
    pub fn widget_error(&self) -> Option<&str> {
        self.error.as_deref().filter(|error| !error.is_empty())
    }
}
