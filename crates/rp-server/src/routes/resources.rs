//! Serving produced outputs by their local URL.

use std::str::FromStr;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use rp_core::ResourceId;
use serde::Deserialize;

use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ResourceQuery {
    /// Any value other than `0`/`false` asks for an attachment download.
    pub download: Option<String>,
}

impl ResourceQuery {
    fn wants_download(&self) -> bool {
        matches!(self.download.as_deref(), Some(v) if v != "0" && v != "false")
    }
}

/// GET /resources/{id}
#[utoipa::path(
    get,
    path = "/resources/{id}",
    params(
        ("id" = String, Path, description = "Resource id"),
        ResourceQuery
    ),
    responses(
        (status = 200, description = "Output bytes tagged video/<ext>"),
        (status = 404, description = "Unknown or revoked resource")
    )
)]
pub async fn get_resource(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Query(query): Query<ResourceQuery>,
) -> Result<Response, AppError> {
    let resource = ResourceId::from_str(&id)
        .ok()
        .and_then(|rid| ctx.resources.get(rid))
        .ok_or_else(|| rp_core::Error::not_found("resource", &id))?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, resource.len())
        .header(header::CACHE_CONTROL, "no-store");

    builder = match HeaderValue::from_str(&resource.mime) {
        Ok(v) => builder.header(header::CONTENT_TYPE, v),
        Err(_) => builder.header(header::CONTENT_TYPE, "application/octet-stream"),
    };

    if query.wants_download() {
        let name = resource.file_name.replace(['"', '\\', '\r', '\n'], "_");
        if let Ok(v) = HeaderValue::from_str(&format!("attachment; filename=\"{name}\"")) {
            builder = builder.header(header::CONTENT_DISPOSITION, v);
        }
    }

    builder
        .body(Body::from(resource.data.clone()))
        .map_err(|e| rp_core::Error::Internal(format!("failed to build response: {e}")).into())
}
