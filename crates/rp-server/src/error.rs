//! Error-to-HTTP response conversion.
//!
//! Handlers return `Result<T, AppError>` and use `?` on [`rp_core::Error`]
//! values. A rejected form action also reports the task state it ran into,
//! so the page can tell "already running" from "already finished".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rp_form::TaskState;
use serde::Serialize;

/// A failed request: the error plus whatever context the handler had.
#[derive(Debug)]
pub struct AppError {
    inner: rp_core::Error,
    request_id: Option<String>,
    form_state: Option<TaskState>,
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: String,
    code: &'static str,
    request_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a TaskState>,
}

impl AppError {
    pub fn new(inner: rp_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
            form_state: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Attach the form's task state; only conflicts carry it.
    pub fn with_form_state(mut self, state: TaskState) -> Self {
        if self.is_conflict() {
            self.form_state = Some(state);
        }
        self
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.inner, rp_core::Error::Conflict(_))
    }

    fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.inner.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn body(&self) -> ErrorBody<'_> {
        ErrorBody {
            error: self.inner.to_string(),
            code: self.inner.code(),
            request_id: self.request_id.as_deref(),
            state: self.form_state.as_ref(),
        }
    }
}

impl From<rp_core::Error> for AppError {
    fn from(e: rp_core::Error) -> Self {
        Self::new(e)
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        Self::new(rp_core::Error::Validation(format!("invalid upload: {}", e.body_text())))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match status {
            s if s.is_server_error() => {
                tracing::error!(status = %s, error = %self.inner, "Form request failed");
            }
            StatusCode::CONFLICT => {
                tracing::info!(state = ?self.form_state, error = %self.inner, "Form action refused");
            }
            s => tracing::debug!(status = %s, error = %self.inner, "Request rejected"),
        }

        (status, axum::Json(self.body())).into_response()
    }
}
