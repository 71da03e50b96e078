//! Single-page web front end
//!
//! Serves the input form, runs one generation at a time and renders the
//! copy and thumbnails back into the same page.

use crate::app::App;
use crate::copy::ParsedCopy;
use crate::models::{is_blank, Creativity, GenerationRequest, Tone};
use crate::progress::LogProgress;
use crate::render::{self, FormValues, Notice, Report, COPY_FILE_NAME, EMPTY_CAPTION};
use crate::{Error, Result};
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    app: Arc<App>,
    gate: Arc<Mutex<()>>,
    shutdown: Arc<Notify>,
}

impl AppState {
    pub fn new(app: Arc<App>) -> Self {
        Self {
            app,
            gate: Arc::new(Mutex::new(())),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Notified once a generation hits an error the process cannot recover from.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/generate", post(generate_page))
        .route("/api/generate", post(generate_api))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(app: App, bind: &str) -> Result<()> {
    let state = AppState::new(Arc::new(app));
    let shutdown = state.shutdown_handle();

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(fatal: Arc<Notify>) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for ctrl-c: {}", e);
            }
            info!("Shutdown requested");
        }
        _ = fatal.notified() => {
            warn!("Shutting down after fatal image pipeline error");
        }
    }
}

/// Validate the inputs and run one generation behind the request gate.
///
/// `Ok(None)` means the description was blank and nothing was called.
async fn run_generation(state: &AppState, form: &FormValues) -> Result<Option<Report>> {
    if is_blank(&form.description) {
        return Ok(None);
    }
    let creativity = Creativity::new(form.creativity)?;
    let request = GenerationRequest::new(form.description.clone(), form.tone, creativity)?;

    let _gate = state.gate.lock().await;
    let generation = state.app.handle_request(request, &LogProgress).await?;

    if let Err(e) = &generation.images {
        if e.is_fatal() {
            error!("[{}] Fatal image pipeline error: {}", generation.id, e);
            state.shutdown.notify_one();
        }
    }

    Ok(Some(Report::build(&generation).await))
}

fn status_for(err: &Error, validation: StatusCode) -> StatusCode {
    match err {
        Error::Validation(_) => validation,
        Error::CopyProvider(_) | Error::Http(_) | Error::Serialization(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn index() -> Html<String> {
    Html(render::page(
        Some(&FormValues::default()),
        Some(Notice::Info(EMPTY_CAPTION)),
        None,
    ))
}

async fn healthz() -> &'static str {
    "ok"
}

/// Raw form fields; parsed by hand so bad values still get the page back.
#[derive(Debug, Default, Deserialize)]
struct PageForm {
    #[serde(default)]
    description: String,
    #[serde(default)]
    tone: String,
    #[serde(default)]
    creativity: String,
}

impl PageForm {
    fn parse(&self) -> Result<FormValues> {
        let tone = if self.tone.trim().is_empty() {
            Tone::default()
        } else {
            self.tone.parse()?
        };
        let creativity = if self.creativity.trim().is_empty() {
            Creativity::DEFAULT
        } else {
            self.creativity.parse::<Creativity>()?.value()
        };
        Ok(FormValues {
            description: self.description.clone(),
            tone,
            creativity,
        })
    }

    /// Best-effort values to echo back after a parse failure.
    fn echo(&self) -> FormValues {
        FormValues {
            description: self.description.clone(),
            tone: self.tone.parse().unwrap_or_default(),
            creativity: self
                .creativity
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .unwrap_or(Creativity::DEFAULT),
        }
    }
}

fn error_page(form: &FormValues, status: StatusCode, err: &Error) -> (StatusCode, Html<String>) {
    let message = err.to_string();
    (
        status,
        Html(render::page(Some(form), Some(Notice::Error(&message)), None)),
    )
}

async fn generate_page(
    State(state): State<AppState>,
    Form(raw): Form<PageForm>,
) -> (StatusCode, Html<String>) {
    let form = match raw.parse() {
        Ok(form) => form,
        Err(e) => return error_page(&raw.echo(), StatusCode::BAD_REQUEST, &e),
    };

    match run_generation(&state, &form).await {
        Ok(None) => (
            StatusCode::OK,
            Html(render::page(Some(&form), Some(Notice::Info(EMPTY_CAPTION)), None)),
        ),
        Ok(Some(report)) => (
            StatusCode::OK,
            Html(render::page(Some(&form), None, Some(&report.to_html()))),
        ),
        Err(e) => error_page(&form, status_for(&e, StatusCode::BAD_REQUEST), &e),
    }
}

#[derive(Debug, Deserialize)]
struct ApiGenerateRequest {
    description: String,
    #[serde(default)]
    tone: Tone,
    #[serde(default = "default_creativity")]
    creativity: f64,
}

fn default_creativity() -> f64 {
    Creativity::DEFAULT
}

#[derive(Debug, Serialize)]
struct ApiGenerateResponse {
    id: Uuid,
    copy: String,
    parsed: ParsedCopy,
    warnings: Vec<String>,
    images: Vec<String>,
    image_error: Option<String>,
    copy_file_name: &'static str,
}

impl From<Report> for ApiGenerateResponse {
    fn from(report: Report) -> Self {
        let images = report.image_data_uris();
        Self {
            id: report.id,
            copy: report.copy_text,
            parsed: report.parsed,
            warnings: report.warnings,
            images,
            image_error: report.images.err(),
            copy_file_name: COPY_FILE_NAME,
        }
    }
}

struct ApiErr {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

async fn generate_api(
    State(state): State<AppState>,
    Json(req): Json<ApiGenerateRequest>,
) -> std::result::Result<Json<ApiGenerateResponse>, ApiErr> {
    let form = FormValues {
        description: req.description,
        tone: req.tone,
        creativity: req.creativity,
    };

    match run_generation(&state, &form).await {
        Ok(Some(report)) => Ok(Json(report.into())),
        Ok(None) => Err(ApiErr {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "product description must not be empty".to_string(),
        }),
        Err(e) => Err(ApiErr {
            status: status_for(&e, StatusCode::UNPROCESSABLE_ENTITY),
            message: e.to_string(),
        }),
    }
}
