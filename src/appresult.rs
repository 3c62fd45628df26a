//! Service errors and the JSON envelope every endpoint answers with:
//! `{ "ok": bool, "data"?: ..., "error"?: { "message": string } }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::{store::StoreError, validate::ValidationError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Este nome já confirmou presença")]
    Conflict,

    /// `context` is the only part that reaches the client.
    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AppError {
    pub fn store(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Invalid(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Store { context, source } = &self {
            error!(error = %source, "{context}");
        }

        let body = Envelope::<()> {
            ok: false,
            data: None,
            error: Some(ErrorBody { message: self.to_string() }),
        };

        (self.status(), Json(body)).into_response()
    }
}

/// A successful envelope.
pub struct Reply<T> {
    status: StatusCode,
    data: T,
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Self { status: StatusCode::OK, data }
    }

    pub fn created(data: T) -> Self {
        Self { status: StatusCode::CREATED, data }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            ok: true,
            data: Some(self.data),
            error: None,
        };

        (self.status, Json(body)).into_response()
    }
}
