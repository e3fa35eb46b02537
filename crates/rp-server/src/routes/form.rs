//! Form route handlers.
//!
//! Every mutating handler answers with the resulting [`FormSnapshot`] so the
//! page can re-render without a second request.

use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use rp_form::{FormSnapshot, SelectedInput};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// Body of the option and extension edits.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct TextBody {
    pub text: String,
}

/// Multipart body of the file selection.
#[derive(utoipa::ToSchema)]
pub struct FileUpload {
    /// The source video.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Answer to an accepted start.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StartResponse {
    pub run_id: String,
    pub status: String,
}

/// Tag a failure with the request id and, for refused actions, the form state.
fn tagged(
    err: impl Into<AppError>,
    ctx: &AppContext,
    request_id: &Option<Extension<RequestId>>,
) -> AppError {
    let err = err.into().with_form_state(ctx.form.task_state());
    match request_id {
        Some(Extension(RequestId(id))) => err.with_request_id(id.clone()),
        None => err,
    }
}

/// GET /api/form
#[utoipa::path(
    get,
    path = "/api/form",
    responses(
        (status = 200, description = "Current form state", body = FormSnapshot)
    )
)]
pub async fn get_form(State(ctx): State<AppContext>) -> Json<FormSnapshot> {
    Json(ctx.form.snapshot())
}

/// POST /api/form/file
///
/// Multipart upload. The first part carrying a non-empty file name becomes
/// the selected input; a request without one leaves the selection unchanged.
#[utoipa::path(
    post,
    path = "/api/form/file",
    request_body(content = FileUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File selected", body = FormSnapshot),
        (status = 409, description = "A transcode has already started")
    )
)]
pub async fn select_file(
    State(ctx): State<AppContext>,
    request_id: Option<Extension<RequestId>>,
    mut multipart: Multipart,
) -> Result<Json<FormSnapshot>, AppError> {
    let mut selected = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| tagged(e, &ctx, &request_id))?
    {
        // An empty picker still posts a part, with `filename=""` and no body.
        let Some(file_name) = field
            .file_name()
            .filter(|n| !n.is_empty())
            .map(str::to_string)
        else {
            continue;
        };
        let data = field.bytes().await.map_err(|e| tagged(e, &ctx, &request_id))?;
        selected = Some(SelectedInput::new(file_name, data));
        break;
    }

    ctx.form
        .select_file(selected)
        .map_err(|e| tagged(e, &ctx, &request_id))?;
    Ok(Json(ctx.form.snapshot()))
}

/// PUT /api/form/options
#[utoipa::path(
    put,
    path = "/api/form/options",
    request_body = TextBody,
    responses(
        (status = 200, description = "Options replaced", body = FormSnapshot),
        (status = 409, description = "A transcode has already started")
    )
)]
pub async fn edit_options(
    State(ctx): State<AppContext>,
    request_id: Option<Extension<RequestId>>,
    Json(body): Json<TextBody>,
) -> Result<Json<FormSnapshot>, AppError> {
    ctx.form
        .edit_options(body.text)
        .map_err(|e| tagged(e, &ctx, &request_id))?;
    Ok(Json(ctx.form.snapshot()))
}

/// PUT /api/form/extension
#[utoipa::path(
    put,
    path = "/api/form/extension",
    request_body = TextBody,
    responses(
        (status = 200, description = "Extension replaced", body = FormSnapshot),
        (status = 409, description = "A transcode has already started")
    )
)]
pub async fn edit_extension(
    State(ctx): State<AppContext>,
    request_id: Option<Extension<RequestId>>,
    Json(body): Json<TextBody>,
) -> Result<Json<FormSnapshot>, AppError> {
    ctx.form
        .edit_extension(body.text)
        .map_err(|e| tagged(e, &ctx, &request_id))?;
    Ok(Json(ctx.form.snapshot()))
}

/// POST /api/form/start
///
/// The run is admitted before the response is sent; the engine sequence then
/// continues in the background and reports through `/api/events`.
#[utoipa::path(
    post,
    path = "/api/form/start",
    responses(
        (status = 202, description = "Transcode started", body = StartResponse),
        (status = 409, description = "No file selected or already started")
    )
)]
pub async fn start(
    State(ctx): State<AppContext>,
    request_id: Option<Extension<RequestId>>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = ctx.form.begin().map_err(|e| tagged(e, &ctx, &request_id))?;
    let run_id = ticket.run_id;

    let form = ctx.form.clone();
    tokio::spawn(async move {
        // Failures are recorded in the form state and broadcast.
        let _ = form.execute(ticket).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(StartResponse {
            run_id: run_id.to_string(),
            status: ctx.form.status(),
        }),
    ))
}

/// POST /api/form/reset
#[utoipa::path(
    post,
    path = "/api/form/reset",
    responses(
        (status = 200, description = "Form back to idle", body = FormSnapshot),
        (status = 409, description = "A transcode is running")
    )
)]
pub async fn reset(
    State(ctx): State<AppContext>,
    request_id: Option<Extension<RequestId>>,
) -> Result<Json<FormSnapshot>, AppError> {
    ctx.form.reset().map_err(|e| tagged(e, &ctx, &request_id))?;
    Ok(Json(ctx.form.snapshot()))
}

/// GET /api/form/log
#[utoipa::path(
    get,
    path = "/api/form/log",
    responses(
        (status = 200, description = "Log lines, one per line", body = String, content_type = "text/plain")
    )
)]
pub async fn get_log(State(ctx): State<AppContext>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        ctx.form.render_log(),
    )
}
