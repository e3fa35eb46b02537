//! Axum router construction.
//!
//! Builds the application router with the form API, SSE, resource URLs,
//! middleware layers, and either the built-in page or a static directory.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    info(title = "reelpress", description = "Single-page transcode form"),
    paths(
        routes::form::get_form,
        routes::form::select_file,
        routes::form::edit_options,
        routes::form::edit_extension,
        routes::form::start,
        routes::form::reset,
        routes::form::get_log,
        routes::resources::get_resource,
        routes::tools::tools,
    ),
    components(schemas(
        routes::form::TextBody,
        routes::form::FileUpload,
        routes::form::StartResponse,
        rp_form::FormSnapshot,
        rp_form::FileSummary,
        rp_form::OutputSummary,
        rp_form::TaskState,
        rp_form::RunPhase,
        rp_engine::ToolInfo,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = ctx.config.form.upload_limit();

    let api = Router::new()
        .route("/form", get(routes::form::get_form))
        .route(
            "/form/file",
            post(routes::form::select_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/form/options", put(routes::form::edit_options))
        .route("/form/extension", put(routes::form::edit_extension))
        .route("/form/start", post(routes::form::start))
        .route("/form/reset", post(routes::form::reset))
        .route("/form/log", get(routes::form::get_log))
        .route("/events", get(routes::events::events_handler))
        .route("/tools", get(routes::tools::tools));

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/resources/{id}", get(routes::resources::get_resource))
        .nest("/api", api);

    // A custom page directory replaces the built-in page.
    match static_dir {
        Some(dir) if dir.exists() => {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                tower_http::services::ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(tower_http::services::ServeFile::new(index_path)),
            );
        }
        Some(dir) => {
            tracing::warn!("Static directory {:?} does not exist; using built-in page", dir);
            app = app.route("/", get(routes::page::index));
        }
        None => {
            app = app.route("/", get(routes::page::index));
        }
    }

    app.layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
