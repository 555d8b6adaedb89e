//! 记录型页面
//!
//! Records every side effect in order instead of applying it. The JSON-RPC
//! host returns the log to its caller, which applies it to the real page.

use super::{Console, Element, Navigator, PageHandles, RESULT_ID, SIGN_IN_BUTTON_ID};
use crate::error::SignInError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// 单个页面副作用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEffect {
    Hide { element: String },
    SetHtml { element: String, html: String },
    Navigate { path: String },
    Log { message: String },
}

#[derive(Debug, Clone, Default)]
pub struct EffectLog {
    effects: Arc<Mutex<Vec<PageEffect>>>,
}

impl EffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PageEffect>> {
        self.effects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, effect: PageEffect) {
        self.lock().push(effect);
    }

    /// 当前记录的副本
    #[cfg(test)]
    pub fn effects(&self) -> Vec<PageEffect> {
        self.lock().clone()
    }

    /// 取出并清空记录
    pub fn take(&self) -> Vec<PageEffect> {
        std::mem::take(&mut *self.lock())
    }

    /// Handles for `signInButton` and `result` that write into this log.
    pub fn handles(&self) -> PageHandles {
        let log = Arc::new(self.clone());
        PageHandles {
            sign_in_button: Arc::new(RecordedElement {
                id: SIGN_IN_BUTTON_ID.to_string(),
                log: self.clone(),
            }),
            result: Arc::new(RecordedElement {
                id: RESULT_ID.to_string(),
                log: self.clone(),
            }),
            navigator: log.clone(),
            console: log,
        }
    }
}

struct RecordedElement {
    id: String,
    log: EffectLog,
}

impl Element for RecordedElement {
    fn id(&self) -> &str {
        &self.id
    }

    fn hide(&self) {
        self.log.push(PageEffect::Hide {
            element: self.id.clone(),
        });
    }

    fn set_html(&self, html: &str) {
        self.log.push(PageEffect::SetHtml {
            element: self.id.clone(),
            html: html.to_string(),
        });
    }
}

#[async_trait]
impl Navigator for EffectLog {
    async fn navigate(&self, path: &str) -> Result<(), SignInError> {
        self.push(PageEffect::Navigate {
            path: path.to_string(),
        });
        Ok(())
    }
}

impl Console for EffectLog {
    fn log(&self, message: &str) {
        self.push(PageEffect::Log {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let log = EffectLog::new();
        let page = log.handles();

        page.sign_in_button.hide();
        page.result.set_html("hello");
        page.console.log("note");
        page.navigator.navigate("/").await.unwrap();

        assert_eq!(
            log.take(),
            vec![
                PageEffect::Hide {
                    element: "signInButton".to_string()
                },
                PageEffect::SetHtml {
                    element: "result".to_string(),
                    html: "hello".to_string()
                },
                PageEffect::Log {
                    message: "note".to_string()
                },
                PageEffect::Navigate {
                    path: "/".to_string()
                },
            ]
        );
        assert!(log.effects().is_empty());
    }

    #[test]
    fn test_effect_serialization() {
        let effect = PageEffect::SetHtml {
            element: "result".to_string(),
            html: "<b>ok</b>".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&effect).unwrap(),
            serde_json::json!({"type": "set_html", "element": "result", "html": "<b>ok</b>"})
        );
    }
}
