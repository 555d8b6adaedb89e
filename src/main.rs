//! gconnect-signin CLI - 登录组件回调宿主
//!
//! 把登录组件给出的授权码转交给服务器的 /gconnect 路由，并根据响应更新页面。
//! 可以直接在终端运行，也可以通过 JSON-RPC（stdin/stdout）由页面宿主驱动。

mod auth;
mod auth_result;
mod config;
mod error;
mod handler;
mod page;

use auth::gconnect::{HttpCodeExchange, CODE_CONTENT_TYPE, GCONNECT_PATH};
use auth_result::AuthResult;
use clap::{Parser, Subcommand};
use config::SignInConfig;
use handler::{SignInResultHandler, REDIRECT_PATH};
use page::effects::EffectLog;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info};

/// gconnect-signin CLI
#[derive(Parser)]
#[command(name = "gconnect-signin-cli")]
#[command(about = "Relay a sign-in widget authorization code to /gconnect")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run in JSON-RPC mode (stdin/stdout)
    #[arg(long)]
    json_rpc: bool,

    /// Config file (defaults to <config_dir>/gconnect-signin/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the server base URL
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// Override the anti-forgery state token
    #[arg(long, global = true)]
    state: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print host info
    Info,
    /// Print the effective configuration
    Config,
    /// Run the sign-in callback against the configured server
    Callback {
        /// Authorization code from the widget
        #[arg(long)]
        code: Option<String>,
        /// Error reported by the widget
        #[arg(long)]
        error: Option<String>,
        /// Full widget result as JSON, e.g. '{"code":"4/0Ab..."}'
        #[arg(long, conflicts_with_all = ["code", "error"])]
        auth_result: Option<String>,
    },
}

/// JSON-RPC Request
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: serde_json::Value,
    id: serde_json::Value,
}

/// JSON-RPC Response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
    id: serde_json::Value,
}

/// JSON-RPC Error
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn error(id: serde_json::Value, code: i32, message: String) -> Self {
        Self::error_with_data(id, code, message, None)
    }

    fn error_with_data(
        id: serde_json::Value,
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data,
            }),
            id,
        }
    }
}

/// `sign_in_callback` 参数
#[derive(Debug, Deserialize)]
struct SignInCallbackParams {
    #[serde(default)]
    auth_result: AuthResult,
    #[serde(default)]
    state: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gconnect_signin_cli=debug".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = SignInConfig::load(cli.config.as_deref())?;
    if let Some(server_url) = cli.server_url {
        config.server_url = server_url;
    }
    if let Some(state) = cli.state {
        config.state_token = state;
    }

    if cli.json_rpc {
        run_json_rpc_mode(&config).await?;
    } else if let Some(command) = cli.command {
        match command {
            Commands::Info => {
                println!("{}", serde_json::to_string_pretty(&get_host_info())?);
            }
            Commands::Config => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            Commands::Callback {
                code,
                error,
                auth_result,
            } => {
                let auth_result = match auth_result {
                    Some(raw) => serde_json::from_str(&raw)?,
                    None => AuthResult { code, error },
                };
                run_callback(&config, &auth_result).await?;
            }
        }
    } else {
        // Default: print info
        println!("{}", serde_json::to_string_pretty(&get_host_info())?);
    }

    Ok(())
}

/// 终端模式：直接执行回调并等待跳转完成
async fn run_callback(config: &SignInConfig, auth_result: &AuthResult) -> anyhow::Result<()> {
    if auth_result.authorization_code().is_some() {
        config.validate()?;
    }

    let exchange = HttpCodeExchange::new(config)?;
    let page = page::terminal::terminal_page(config)?;
    let handler = SignInResultHandler::new(config, exchange, page);

    let outcome = handler.handle(auth_result).await?;
    info!("回调完成: {}", outcome.kind());
    outcome.finish().await;
    Ok(())
}

/// Run in JSON-RPC mode
async fn run_json_rpc_mode(config: &SignInConfig) -> anyhow::Result<()> {
    info!("Starting gconnect-signin in JSON-RPC mode");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        debug!("Received: {}", line);

        let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
            Ok(request) => handle_request(config, request).await,
            Err(e) => JsonRpcResponse::error(
                serde_json::Value::Null,
                -32700,
                format!("Parse error: {}", e),
            ),
        };

        let response_str = serde_json::to_string(&response)?;
        debug!("Sending: {}", response_str);

        writeln!(stdout, "{}", response_str)?;
        stdout.flush()?;
    }

    Ok(())
}

/// Handle a JSON-RPC request
async fn handle_request(config: &SignInConfig, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone();

    match request.method.as_str() {
        "get_info" => JsonRpcResponse::success(id, get_host_info()),
        "sign_in_callback" => {
            let params: SignInCallbackParams = match serde_json::from_value(request.params) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {}", e))
                }
            };
            sign_in_callback(config, id, params).await
        }
        _ => JsonRpcResponse::error(id, -32601, format!("Method not found: {}", request.method)),
    }
}

/// 执行回调并把页面副作用交给宿主
async fn sign_in_callback(
    config: &SignInConfig,
    id: serde_json::Value,
    params: SignInCallbackParams,
) -> JsonRpcResponse {
    let mut config = config.clone();
    if let Some(state) = params.state {
        config.state_token = state;
    }

    if params.auth_result.authorization_code().is_some() {
        if let Err(e) = config.validate() {
            return JsonRpcResponse::error_with_data(
                id,
                e.rpc_code(),
                e.to_string(),
                Some(serde_json::json!({ "effects": [] })),
            );
        }
    }

    let exchange = match HttpCodeExchange::new(&config) {
        Ok(exchange) => exchange,
        Err(e) => return JsonRpcResponse::error(id, e.rpc_code(), e.to_string()),
    };
    let log = EffectLog::new();
    let handler = SignInResultHandler::new(&config, exchange, log.handles());

    match handler.handle(&params.auth_result).await {
        Ok(outcome) => {
            let kind = outcome.kind();
            let message = outcome.message().map(str::to_string);
            outcome.finish().await;
            JsonRpcResponse::success(
                id,
                serde_json::json!({
                    "outcome": kind,
                    "message": message,
                    "effects": log.take(),
                }),
            )
        }
        Err(e) => JsonRpcResponse::error_with_data(
            id,
            e.rpc_code(),
            e.to_string(),
            Some(serde_json::json!({ "effects": log.take() })),
        ),
    }
}

/// Get host info
fn get_host_info() -> serde_json::Value {
    serde_json::json!({
        "id": "gconnect-signin",
        "display_name": "gconnect sign-in callback",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoint": GCONNECT_PATH,
        "content_type": CODE_CONTENT_TYPE,
        "redirect_path": REDIRECT_PATH,
        "elements": [page::SIGN_IN_BUTTON_ID, page::RESULT_ID],
        "methods": ["get_info", "sign_in_callback"]
    })
}
