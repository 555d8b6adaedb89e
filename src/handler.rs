//! 登录结果回调
//!
//! 收到登录组件结果后：隐藏登录按钮，把授权码转交给 /gconnect，
//! 再根据服务器响应更新页面或跳转。

use crate::auth::gconnect::{code_preview, CodeExchange};
use crate::auth_result::AuthResult;
use crate::config::SignInConfig;
use crate::error::SignInError;
use crate::page::PageHandles;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// 登录成功后的跳转目标
pub const REDIRECT_PATH: &str = "/";
/// 服务器返回空响应或请求失败时显示的消息
pub const FAILURE_MESSAGE: &str =
    "Failed to make server call. Check your configuration and console.";

pub fn success_message(response: &str) -> String {
    format!("Login successful! <br />{}<br /> Redirecting...", response)
}

pub fn widget_error_message(error: &str) -> String {
    format!("There was an error: {}", error)
}

pub fn transport_error_message(error: &SignInError) -> String {
    format!("Failed to make server call: {}", error)
}

/// 单次回调的处理结果
#[derive(Debug)]
pub enum SignInOutcome {
    /// 没有授权码，未做任何操作
    NoCode,
    /// 登录成功，跳转已排队
    Redirecting {
        message: String,
        redirect: JoinHandle<()>,
    },
    /// 服务器无响应内容，组件报告了错误
    WidgetError { message: String },
    /// 服务器无响应内容
    EmptyResponse { message: String },
}

impl SignInOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            SignInOutcome::NoCode => "no_code",
            SignInOutcome::Redirecting { .. } => "redirecting",
            SignInOutcome::WidgetError { .. } => "widget_error",
            SignInOutcome::EmptyResponse { .. } => "empty_response",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            SignInOutcome::NoCode => None,
            SignInOutcome::Redirecting { message, .. }
            | SignInOutcome::WidgetError { message }
            | SignInOutcome::EmptyResponse { message } => Some(message.as_str()),
        }
    }

    /// Wait for a scheduled redirect, if any, to complete.
    pub async fn finish(self) {
        if let SignInOutcome::Redirecting { redirect, .. } = self {
            if let Err(e) = redirect.await {
                warn!("跳转任务异常结束: {}", e);
            }
        }
    }
}

/// 登录结果回调处理器
pub struct SignInResultHandler<E> {
    exchange: E,
    page: PageHandles,
    state_token: String,
    redirect_delay: Duration,
}

impl<E> SignInResultHandler<E>
where
    E: CodeExchange,
{
    pub fn new(config: &SignInConfig, exchange: E, page: PageHandles) -> Self {
        Self {
            exchange,
            page,
            state_token: config.state_token.clone(),
            redirect_delay: config.redirect_delay(),
        }
    }

    /// 处理登录组件结果
    ///
    /// Transport failures and non-2xx responses run the failure continuation
    /// (console log plus the generic message) and are returned as `Err`.
    pub async fn handle(&self, auth_result: &AuthResult) -> Result<SignInOutcome, SignInError> {
        let span = info_span!("sign_in", attempt = %Uuid::new_v4());
        self.process(auth_result).instrument(span).await
    }

    async fn process(&self, auth_result: &AuthResult) -> Result<SignInOutcome, SignInError> {
        let Some(code) = auth_result.authorization_code() else {
            debug!("回调中没有授权码，忽略");
            return Ok(SignInOutcome::NoCode);
        };

        if self.state_token.is_empty() {
            return Err(SignInError::Config("缺少 state_token".to_string()));
        }

        info!("收到授权码: {}", code_preview(code));

        // 用户已登录，隐藏登录按钮
        self.page.sign_in_button.hide();

        let response = match self.exchange.exchange(&self.state_token, code).await {
            Ok(response) => response,
            Err(e) => return Err(self.on_failure(e)),
        };

        if !response.is_empty() {
            let message = success_message(&response);
            self.page.result.set_html(&message);
            info!("登录成功，准备跳转到 {}", REDIRECT_PATH);
            let redirect = self.schedule_redirect();
            return Ok(SignInOutcome::Redirecting { message, redirect });
        }

        if let Some(error) = auth_result.widget_error() {
            let message = widget_error_message(error);
            warn!("{}", message);
            self.page.console.log(&message);
            return Ok(SignInOutcome::WidgetError { message });
        }

        warn!("服务器返回空响应");
        self.page.result.set_html(FAILURE_MESSAGE);
        Ok(SignInOutcome::EmptyResponse {
            message: FAILURE_MESSAGE.to_string(),
        })
    }

    fn on_failure(&self, e: SignInError) -> SignInError {
        let message = transport_error_message(&e);
        error!("{}", message);
        self.page.console.log(&message);
        self.page.result.set_html(FAILURE_MESSAGE);
        e
    }

    /// Navigation runs only after the current call has returned.
    fn schedule_redirect(&self) -> JoinHandle<()> {
        let navigator = Arc::clone(&self.page.navigator);
        let delay = self.redirect_delay;

        tokio::spawn(
            async move {
                if delay.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(delay).await;
                }
                if let Err(e) = navigator.navigate(REDIRECT_PATH).await {
                    warn!("跳转失败: {}", e);
                }
            }
            .in_current_span(),
        )
    }
}
