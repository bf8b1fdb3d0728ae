//! HTTP mapping of application errors.
//!
//! Operator-facing failures are answered with short plain-text messages (the
//! counting UI shows the body as is). The by-id count mismatch is the only
//! structured error: it carries the list of differing lines. Internal failures
//! are logged and answered with a generic message.

use crate::core::reconcile::{Mismatch, RECOUNT_MESSAGE};
use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Body of a 409 answer to a by-id validation.
#[derive(Debug, Serialize)]
pub struct MismatchResponse {
    /// Always `false`
    pub ok: bool,
    /// Every differing line
    pub mismatches: Vec<Mismatch>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation { message } => (StatusCode::BAD_REQUEST, message),
            Self::BatchNotFound { .. } => (StatusCode::NOT_FOUND, "Lote no encontrado".to_string()),
            Self::DuplicateBatchCode { .. } => (
                StatusCode::CONFLICT,
                "El código de lote ya existe".to_string(),
            ),
            Self::QuantityMismatch { mismatches } => {
                let body = MismatchResponse {
                    ok: false,
                    mismatches,
                };
                return (StatusCode::CONFLICT, Json(body)).into_response();
            }
            Self::RecountRequired { .. } => (StatusCode::BAD_REQUEST, RECOUNT_MESSAGE.to_string()),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Clave inválida".to_string()),
            Self::AdminKeyNotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ADMIN_KEY no configurada".to_string(),
            ),
            Self::Ledger { message } => (StatusCode::BAD_GATEWAY, message),
            err @ (Self::Config { .. } | Self::Database(_) | Self::Io(_)) => {
                tracing::error!("Request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error interno del servidor".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}
