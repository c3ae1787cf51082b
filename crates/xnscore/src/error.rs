use crate::config::ConfigError;
use crate::scoring::{AdjustmentError, RecoveryError, SweepError, VouchError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Scoring(AdjustmentError),
    Vouching(VouchError),
    Sweep(SweepError),
    Recovery(RecoveryError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Scoring(err) => write!(f, "scoring error: {}", err),
            AppError::Vouching(err) => write!(f, "vouching error: {}", err),
            AppError::Sweep(err) => write!(f, "sweep error: {}", err),
            AppError::Recovery(err) => write!(f, "recovery error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Scoring(err) => Some(err),
            AppError::Vouching(err) => Some(err),
            AppError::Sweep(err) => Some(err),
            AppError::Recovery(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Scoring(AdjustmentError::Validation { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Scoring(AdjustmentError::UnknownUser(_)) => StatusCode::NOT_FOUND,
            AppError::Scoring(AdjustmentError::Busy) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Vouching(VouchError::CapacityExceeded { .. }) => StatusCode::CONFLICT,
            AppError::Vouching(VouchError::UnknownUser(_) | VouchError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Vouching(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Recovery(RecoveryError::NotActive(_)) => StatusCode::NOT_FOUND,
            AppError::Scoring(_)
            | AppError::Sweep(_)
            | AppError::Recovery(_)
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<AdjustmentError> for AppError {
    fn from(value: AdjustmentError) -> Self {
        Self::Scoring(value)
    }
}

impl From<crate::scoring::StoreError> for AppError {
    fn from(value: crate::scoring::StoreError) -> Self {
        Self::Scoring(AdjustmentError::Store(value))
    }
}

impl From<VouchError> for AppError {
    fn from(value: VouchError) -> Self {
        Self::Vouching(value)
    }
}

impl From<SweepError> for AppError {
    fn from(value: SweepError) -> Self {
        Self::Sweep(value)
    }
}

impl From<RecoveryError> for AppError {
    fn from(value: RecoveryError) -> Self {
        Self::Recovery(value)
    }
}
