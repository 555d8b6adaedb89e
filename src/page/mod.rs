//! 页面句柄
//!
//! The handler never selects elements globally; it is given explicit handles
//! for the two elements it touches, a navigator and a console.

pub mod effects;
pub mod terminal;

use crate::error::SignInError;
use async_trait::async_trait;
use std::sync::Arc;

/// 登录按钮元素 ID
pub const SIGN_IN_BUTTON_ID: &str = "signInButton";
/// 结果显示元素 ID
pub const RESULT_ID: &str = "result";

/// 页面元素
pub trait Element: Send + Sync {
    fn id(&self) -> &str;
    /// 设置 display: none
    fn hide(&self);
    /// 替换元素的 HTML 内容
    fn set_html(&self, html: &str);
}

/// 整页跳转
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, path: &str) -> Result<(), SignInError>;
}

/// 诊断输出
pub trait Console: Send + Sync {
    fn log(&self, message: &str);
}

/// 回调使用的全部页面句柄
#[derive(Clone)]
pub struct PageHandles {
    pub sign_in_button: Arc<dyn Element>,
    pub result: Arc<dyn Element>,
    pub navigator: Arc<dyn Navigator>,
    pub console: Arc<dyn Console>,
}

impl std::fmt::Debug for PageHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageHandles")
            .field("sign_in_button", &self.sign_in_button.id())
            .field("result", &self.result.id())
            .finish_non_exhaustive()
    }
}
