//! HTTP gateway (Axum) for face and fingerprint verification.
//!
//! This module is primarily used by the `biomatch` server binary.

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::{
    FaceVerifyRequest, FingerprintVerifyRequest, verify_face_handler, verify_fingerprint_handler,
};
pub use state::HandlerState;

use crate::compare::refresh_readiness;
use crate::decision::BIOMATCH_STATUS_HEADER;
use crate::verifier::Verifier;

pub const BIOMATCH_STATUS_HEALTHY: &str = "healthy";
pub const BIOMATCH_STATUS_READY: &str = "ready";
pub const BIOMATCH_STATUS_PENDING: &str = "pending";
pub const BIOMATCH_STATUS_UNAVAILABLE: &str = "unavailable";

pub fn create_router_with_state(state: HandlerState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/v1/verify/face", post(verify_face_handler))
        .route("/v1/verify/fingerprint", post(verify_fingerprint_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    pub store: &'static str,
    pub face_comparator: &'static str,
    pub fingerprint_comparator: &'static str,
    pub face_transport: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        BIOMATCH_STATUS_HEADER,
        HeaderValue::from_static(BIOMATCH_STATUS_HEALTHY),
    );

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

async fn comparator_status(verifier: &Verifier) -> &'static str {
    match refresh_readiness(verifier.comparator().as_ref()).await {
        Ok(()) => BIOMATCH_STATUS_READY,
        Err(e) => {
            tracing::debug!(modality = %verifier.modality(), error = %e, "Comparator not ready");
            BIOMATCH_STATUS_PENDING
        }
    }
}

#[tracing::instrument(skip(state))]
pub async fn ready_handler(State(state): State<HandlerState>) -> Response {
    let store_status = match state.face.store().health_check().await {
        Ok(()) => BIOMATCH_STATUS_READY,
        Err(e) => {
            tracing::warn!(error = %e, "Template store health check failed");
            BIOMATCH_STATUS_UNAVAILABLE
        }
    };

    let (face_comparator, fingerprint_comparator) = tokio::join!(
        comparator_status(&state.face),
        comparator_status(&state.fingerprint)
    );

    let components = ComponentStatus {
        http: BIOMATCH_STATUS_READY,
        store: store_status,
        face_comparator,
        fingerprint_comparator,
        face_transport: state.face.comparator().transport().as_str(),
    };

    let is_ready = components.store == BIOMATCH_STATUS_READY
        && components.face_comparator == BIOMATCH_STATUS_READY
        && components.fingerprint_comparator == BIOMATCH_STATUS_READY;

    let status_code = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let status_msg = if is_ready { "ok" } else { BIOMATCH_STATUS_PENDING };

    let mut headers = HeaderMap::new();
    headers.insert(
        BIOMATCH_STATUS_HEADER,
        HeaderValue::from_static(if is_ready {
            BIOMATCH_STATUS_READY
        } else {
            BIOMATCH_STATUS_PENDING
        }),
    );

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg,
            components,
        }),
    )
        .into_response()
}
