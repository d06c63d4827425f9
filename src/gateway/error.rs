use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::biometric::ProbeError;
use crate::decision::{BIOMATCH_STATUS_HEADER, Verdict, VerdictStatus};
use crate::store::StoreError;
use crate::verifier::VerifyError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request body: {}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),

    #[error("invalid probe: {0}")]
    ProbeInvalid(#[from] ProbeError),

    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

impl From<VerifyError> for GatewayError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::ProbeInvalid(e) => GatewayError::ProbeInvalid(e),
            VerifyError::StoreUnavailable(e) => GatewayError::StoreUnavailable(e),
        }
    }
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidBody(rejection) => rejection.status(),
            GatewayError::ProbeInvalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Verification failed");
        } else {
            tracing::debug!(error = %self, "Rejected verification request");
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            BIOMATCH_STATUS_HEADER,
            HeaderValue::from_static(VerdictStatus::Error.as_header_value()),
        );

        (status, headers, Json(Verdict::failure(self.to_string()))).into_response()
    }
}
