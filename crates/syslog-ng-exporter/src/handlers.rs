//! HTTP request handlers: metrics exposition, control commands, landing page.

use std::sync::PoisonError;

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use serde::Serialize;
use tracing::{error, info};
use utoipa::OpenApi;

use syslog_ng_ctl::command::{Command, CommandResult, CommandStatus};
use syslog_ng_ctl::session::run_command;

use crate::openapi::ApiDoc;
use crate::state::AppState;

const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

// ============================================================
// Metrics
// ============================================================

pub(crate) async fn handle_metrics(State(state): AppState) -> Response {
    // Sessions block on the socket; keep them off the async workers.
    let scrape = tokio::task::spawn_blocking(move || {
        let mut scraper = state.scraper.lock().unwrap_or_else(PoisonError::into_inner);
        scraper.scrape(state.socket.as_ref(), state.timeout)
    })
    .await;

    match scrape {
        Ok(Ok(body)) => ([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body).into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
        Err(e) => {
            error!(error = %e, "scrape task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "scrape task failed").into_response()
        }
    }
}

// ============================================================
// Commands
// ============================================================

/// Body of a command request that could not be carried out.
#[derive(Serialize, utoipa::ToSchema)]
pub(crate) struct ErrorBody {
    message: String,
    status: CommandStatus,
}

#[utoipa::path(
    get,
    path = "/reload",
    responses(
        (status = 200, description = "Reload attempted; see `status`", body = CommandResult),
        (status = 500, description = "Control socket unreachable or timed out", body = ErrorBody)
    )
)]
pub(crate) async fn handle_reload(state: AppState) -> Response {
    process_command(state, Command::Reload).await
}

#[utoipa::path(
    get,
    path = "/healthcheck",
    responses(
        (status = 200, description = "Healthcheck values; see `status`", body = CommandResult),
        (status = 500, description = "Control socket unreachable or timed out", body = ErrorBody)
    )
)]
pub(crate) async fn handle_healthcheck(state: AppState) -> Response {
    process_command(state, Command::Healthcheck).await
}

async fn process_command(State(state): AppState, command: Command) -> Response {
    let outcome = tokio::task::spawn_blocking(move || {
        run_command(state.socket.as_ref(), command, state.timeout)
    })
    .await;

    match outcome {
        Ok(Ok(result)) => json_response(StatusCode::OK, &result),
        Ok(Err(e)) => json_error(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
        Err(e) => json_error(
            &format!("error: command task failed: {e}"),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(json) => (status, [(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(e) => json_error(
            &format!("error: marshalling payload: {e}"),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    }
}

/// Sends `{"message": ..., "status": "failed"}`, or the raw error text if
/// even that cannot be encoded.
fn json_error(message: &str, status: StatusCode) -> Response {
    info!(error = message, "command request failed");
    let body = ErrorBody {
        message: message.to_string(),
        status: CommandStatus::Failed,
    };
    match serde_json::to_vec(&body) {
        Ok(json) => (
            status,
            [
                (
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json; charset=utf-8"),
                ),
                (
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ),
            ],
            json,
        )
            .into_response(),
        Err(e) => {
            let text = format!("critical error: {e}");
            error!(error = %text, "failed to encode error body");
            (status, text).into_response()
        }
    }
}

// ============================================================
// Landing page and API docs
// ============================================================

pub(crate) async fn handle_index(State(state): AppState) -> Html<String> {
    Html(format!(
        "<html>
<head><title>Syslog-NG Exporter/API</title></head>
<body>
<h1>Syslog-NG Exporter/API</h1>
<ul>
  <li><a href='{metrics}'>Metrics</a></li>
  <li><a href='/reload'>Reload</a></li>
  <li><a href='/healthcheck'>Healthcheck</a></li>
  <li><a href='/api-docs/openapi.json'>OpenAPI</a></li>
</ul>
</body>
</html>
",
        metrics = state.metrics_path
    ))
}

pub(crate) async fn handle_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
