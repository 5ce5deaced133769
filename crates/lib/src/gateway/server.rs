//! Gateway HTTP server (single port) and process wiring.

use crate::bridge::Bridge;
use crate::channels::TelegramTransport;
use crate::config::{self, Config};
use crate::error::Error;
use crate::gateway::protocol::{SendRequest, SuccessResponse, UpdatePromptRequest};
use crate::llm::OpenAiClient;
use crate::router;
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

const INBOUND_QUEUE: usize = 64;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
struct GatewayState {
    bridge: Bridge,
    port: u16,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Transport(_) | Error::Completion(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

fn body_or_400<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| Error::Validation(e.body_text()))
}

/// Routes for the control plane. `port` is only reported by the health endpoint.
pub fn app(bridge: Bridge, port: u16) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/send", post(send_http))
        .route("/update-prompt", post(update_prompt_http))
        .with_state(GatewayState { bridge, port })
}

/// Run the bridge: connect Telegram, start the inbound router, serve HTTP on
/// config.gateway.bind:config.gateway.port. Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    config::log_credential_presence(&config);
    let creds = config::resolve_telegram_credentials(&config)?;
    let api_key = config::resolve_completion_api_key(&config)?;

    let telegram = Arc::new(
        TelegramTransport::connect(&creds)
            .await
            .context("connecting to telegram")?,
    );
    let completion = Arc::new(OpenAiClient::new(
        Some(config.completion.base_url.clone()),
        api_key,
        config.completion.model.clone(),
    ));
    log::info!("completion model: {}", completion.model());

    let bridge = Bridge::new(telegram.clone(), completion)
        .with_contact_names(
            &config.telegram.contact_first_name,
            &config.telegram.contact_last_name,
        )
        .with_completion_timeout(config.completion.timeout());

    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
    let router_task = tokio::spawn(router::run(bridge.clone(), inbound_rx));
    let telegram_task = telegram.clone().start_inbound(inbound_tx);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("http server listening on {}", bind_addr);

    axum::serve(listener, app(bridge, config.gateway.port))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server exited")?;

    telegram.stop();
    let _ = telegram_task.await;
    let _ = router_task.await;
    log::info!("stopped");
    Ok(())
}

/// Future that completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "conversations": state.bridge.store().len().await,
        "port": state.port,
    }))
}

/// POST /send: resolve the phone, send the first message, start the conversation.
///
/// A phone without a Telegram account answers 404, not 500.
async fn send_http(
    State(state): State<GatewayState>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, Error> {
    let body = body_or_400(payload)?;
    let (Some(phone), Some(first_message), Some(prompt)) =
        (body.phone, body.first_message, body.prompt)
    else {
        log::warn!("send: missing fields");
        return Err(Error::Validation(
            "phone, firstMessage and prompt are required".to_string(),
        ));
    };
    match state.bridge.initiate(&phone, &first_message, &prompt).await {
        Ok(user_id) => Ok(Json(SuccessResponse::new(user_id))),
        Err(e) => {
            log::warn!("send: {}", e);
            Err(e)
        }
    }
}

/// POST /update-prompt: replace the instruction of an existing conversation.
async fn update_prompt_http(
    State(state): State<GatewayState>,
    payload: Result<Json<UpdatePromptRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, Error> {
    let body = body_or_400(payload)?;
    let new_prompt = body.new_prompt.unwrap_or_default();
    match state
        .bridge
        .update_prompt(body.phone.as_deref(), body.user_id.as_ref(), &new_prompt)
        .await
    {
        Ok(user_id) => Ok(Json(SuccessResponse::new(user_id))),
        Err(e) => {
            log::warn!("update-prompt: {}", e);
            Err(e)
        }
    }
}
