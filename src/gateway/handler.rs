use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{Span, debug, field, instrument};

use crate::biometric::{ProbeError, ProbeSample};
use crate::decision::{BIOMATCH_STATUS_HEADER, Verdict};
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::verifier::VerifyContext;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaceVerifyRequest {
    /// Descriptor extracted on the client. Absent when no face was detected.
    #[serde(default)]
    pub descriptor: Option<Vec<f32>>,
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
    #[serde(default, alias = "courseId")]
    pub course_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FingerprintVerifyRequest {
    /// Base64-encoded capture.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
    #[serde(default, alias = "courseId")]
    pub course_id: Option<String>,
}

fn context(session_id: Option<String>, course_id: Option<String>) -> VerifyContext {
    match session_id {
        Some(session) => VerifyContext::for_session(session, course_id),
        None => VerifyContext {
            course_id,
            ..VerifyContext::default()
        },
    }
}

#[instrument(skip_all, fields(session = tracing::field::Empty))]
pub async fn verify_face_handler(
    State(state): State<HandlerState>,
    body: Result<Json<FaceVerifyRequest>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let Json(request) = body?;
    Span::current().record("session", field::debug(&request.session_id));
    let probe = ProbeSample::from_face_capture(request.descriptor)?;
    let context = context(request.session_id, request.course_id);

    let verdict = state
        .verifier(probe.modality)
        .try_verify(&probe, &context)
        .await?;
    Ok(make_response(verdict))
}

#[instrument(skip_all, fields(session = tracing::field::Empty))]
pub async fn verify_fingerprint_handler(
    State(state): State<HandlerState>,
    body: Result<Json<FingerprintVerifyRequest>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let Json(request) = body?;
    Span::current().record("session", field::debug(&request.session_id));
    let encoded = request.image.as_deref().ok_or(ProbeError::EmptyImage)?;
    let probe = ProbeSample::from_fingerprint_base64(encoded)?;
    let context = context(request.session_id, request.course_id);

    let verdict = state
        .verifier(probe.modality)
        .try_verify(&probe, &context)
        .await?;
    Ok(make_response(verdict))
}

pub(crate) fn make_response(verdict: Verdict) -> Response {
    debug!(status = %verdict.status, "Returning verdict");

    let mut headers = HeaderMap::new();
    headers.insert(
        BIOMATCH_STATUS_HEADER,
        HeaderValue::from_static(verdict.status.as_header_value()),
    );

    (StatusCode::OK, headers, Json(verdict)).into_response()
}
