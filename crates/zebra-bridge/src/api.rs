use axum::{
    Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Request, State, rejection::BytesRejection},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, error, info, trace, warn};

use crate::state::AppState;

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Accept";

pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .route("/status", get(get_status).fallback(not_found))
        .route("/api/status", get(get_status).fallback(not_found))
        .route("/print", post(submit_print).fallback(not_found))
        .route("/api/print", post(submit_print).fallback(not_found))
        .route("/available", get(get_available).fallback(not_found))
        .route("/api/available", get(get_available).fallback(not_found))
        .route("/default", get(get_default).fallback(not_found))
        .route("/api/default", get(get_default).fallback(not_found))
        .route("/health", get(get_health).fallback(not_found))
        .route("/", get(get_health).fallback(not_found))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(middleware::from_fn(preflight))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub connected: bool,
    pub printer_address: String,
    pub is_ready_to_print: bool,
}

#[derive(Debug, Serialize)]
pub struct AvailableResponse {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printer: Option<AvailablePrinter>,
}

#[derive(Debug, Serialize)]
pub struct AvailablePrinter {
    pub address: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DefaultResponse {
    Configured {
        available: bool,
        name: String,
        address: String,
        connection: &'static str,
    },
    Unconfigured {
        available: bool,
        error: &'static str,
    },
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
    pub port: u16,
}

#[derive(Debug, Serialize)]
pub struct PrintAccepted {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PrintFailure {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let connected = state.link.current_state().is_connected();
    Json(StatusResponse {
        connected,
        printer_address: state
            .link
            .address()
            .map(|a| a.to_string())
            .unwrap_or_default(),
        is_ready_to_print: connected,
    })
}

async fn get_available(State(state): State<AppState>) -> Json<AvailableResponse> {
    let printer = state.link.address().map(|address| AvailablePrinter {
        address: address.to_string(),
        kind: state.link.connection_kind(),
    });
    Json(AvailableResponse {
        available: printer.is_some(),
        printer,
    })
}

async fn get_default(State(state): State<AppState>) -> Json<DefaultResponse> {
    let body = match state.link.address() {
        Some(address) => DefaultResponse::Configured {
            available: true,
            name: state.printer_name.to_string(),
            address: address.to_string(),
            connection: state.link.connection_kind(),
        },
        None => DefaultResponse::Unconfigured {
            available: false,
            error: "No printer configured",
        },
    };
    Json(body)
}

async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: state.service.name.clone(),
        version: state.service.version,
        port: state.service.port,
    })
}

/// Accepts a print job and answers before any printer I/O happens.
async fn submit_print(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Failed to read print request body");
            return print_failure(rejection.body_text());
        }
    };
    trace!(body = %String::from_utf8_lossy(&body), "Print request body");

    let payload = extract_payload(&body);
    let bytes = payload.len();
    match state.dispatcher.submit(payload) {
        Ok(job_id) => {
            info!(%job_id, bytes, "📨 Print job submitted");
            (
                StatusCode::OK,
                Json(PrintAccepted {
                    success: true,
                    message: "Print job submitted",
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, bytes, "Failed to submit print job");
            print_failure(e.to_string())
        }
    }
}

async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Endpoint not found",
        }),
    )
}

fn print_failure(error: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(PrintFailure {
            success: false,
            error,
        }),
    )
        .into_response()
}

/// Payload to send for a print request body.
///
/// A JSON object with a string `data` field yields that string's bytes;
/// anything else is printed as received.
pub fn extract_payload(body: &[u8]) -> Vec<u8> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(mut fields)) => match fields.remove("data") {
            Some(Value::String(data)) => data.into_bytes(),
            _ => body.to_vec(),
        },
        _ => body.to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// Logs every request and answers CORS preflight before routing
async fn preflight(request: Request, next: Next) -> Response {
    debug!(method = %request.method(), path = %request.uri().path(), "HTTP request");

    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown handler failure".to_string()
    };
    error!(error = %detail, "❌ Request handler panicked");
    print_failure(detail)
}
