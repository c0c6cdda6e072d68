//! HTTP validation service.
//!
//! Every validation runs the rigorous keyword gate first; the classifier is
//! only consulted for texts that pass it, and both must agree on "valid".

use std::any::Any;
use std::sync::Arc;

use agrodoc_ai::{ModelError, ModelHandle};
use agrodoc_core::{FeatureExtractor, FeatureSchema};
use agrodoc_ocr::OcrPipeline;
use agrodoc_store::DataLayout;
use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::train::{TrainOptions, train_and_persist};

/// Returned when the rigorous gate rejects a text.
pub const REJECTED_REASON: &str =
    "document does not meet the rigorous criteria for rural property or warehouse certificate";

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const ENDPOINTS: [&str; 5] = ["/", "/health", "/validate-document", "/validate-text", "/train-model"];

#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<FeatureExtractor>,
    pub ocr: Arc<OcrPipeline>,
    pub model: ModelHandle,
    pub layout: DataLayout,
    pub seed: u64,
    /// Dataset size generated by `/train-model` when none is on disk.
    pub samples_if_missing: usize,
    train_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        extractor: FeatureExtractor,
        ocr: OcrPipeline,
        model: ModelHandle,
        layout: DataLayout,
        seed: u64,
        samples_if_missing: usize,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            ocr: Arc::new(ocr),
            model,
            layout,
            seed,
            samples_if_missing,
            train_lock: Arc::new(Mutex::new(())),
        }
    }
}

// ── Errors ──

pub enum ApiError {
    ModelUnavailable,
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::ModelUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "model not loaded; train one with POST /train-model".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(e) => {
                warn!(error = %format!("{e:#}"), "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        ApiError::Internal(e.into())
    }
}

// ── Payloads ──

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ValidationResponse {
    pub is_valid: bool,
    pub confidence: f64,
    pub extracted_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rigorous_validation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_method: Option<String>,
    pub processed_at: String,
}

impl ValidationResponse {
    fn rejected(text: String, reason: String, ocr_method: Option<String>) -> Self {
        Self {
            is_valid: false,
            confidence: 0.0,
            extracted_text: text,
            reason: Some(reason),
            rigorous_validation: None,
            ocr_method,
            processed_at: now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub success: bool,
    pub message: String,
    pub model_type: String,
    pub accuracy: f64,
    pub model_path: String,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ── Router ──

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/validate-document", post(validate_document))
        .route("/validate-text", post(validate_text))
        .route("/train-model", post(train_model));
    with_layers(routes).with_state(state)
}

/// Shared middleware. The last layer added is the outermost.
fn with_layers(routes: Router<AppState>) -> Router<AppState> {
    routes
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

/// A handler panic becomes a 500 with the usual `{"detail": ...}` body.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %message, "handler panicked");
    ApiError::Internal(anyhow::anyhow!("internal error: {message}")).into_response()
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(addr = %listener.local_addr()?, "validation service listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("serving HTTP")
}

// ── Handlers ──

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "agrodoc document validator",
        "status": "running",
        "model_loaded": state.model.is_loaded().await,
        "endpoints": ENDPOINTS,
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "model_loaded": state.model.is_loaded().await,
        "timestamp": now(),
    }))
}

async fn validate_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ValidationResponse>, ApiError> {
    if !state.model.is_loaded().await {
        return Err(ApiError::ModelUnavailable);
    }

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            upload = Some(bytes);
            break;
        }
    }
    let bytes = upload.ok_or_else(|| ApiError::BadRequest("file is required".into()))?;
    info!(bytes = bytes.len(), "document upload received");

    let outcome = state.ocr.process(&bytes).await;
    if !outcome.success {
        let reason = outcome.error.unwrap_or_else(|| "OCR failed".to_string());
        return Ok(Json(ValidationResponse::rejected(
            outcome.text,
            reason,
            Some(outcome.method),
        )));
    }
    classify(&state, outcome.text, Some(outcome.method)).await.map(Json)
}

async fn validate_text(
    State(state): State<AppState>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<ValidationResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if !state.model.is_loaded().await {
        return Err(ApiError::ModelUnavailable);
    }
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text is required".into()));
    }
    classify(&state, req.text, None).await.map(Json)
}

/// Rigorous gate, then the classifier on the inference-schema vector.
async fn classify(
    state: &AppState,
    text: String,
    ocr_method: Option<String>,
) -> Result<ValidationResponse, ApiError> {
    let assessment = state.extractor.assess(&text);
    if !assessment.is_valid() {
        debug!(report = ?assessment.report, "rigorous gate rejected text");
        return Ok(ValidationResponse::rejected(text, REJECTED_REASON.to_string(), ocr_method));
    }

    let pipeline = state.model.current().await.ok_or(ApiError::ModelUnavailable)?;
    let prediction = pipeline.predict_features(&assessment.features)?;
    info!(
        label = prediction.is_valid,
        confidence = prediction.confidence,
        "classifier verdict"
    );
    Ok(ValidationResponse {
        is_valid: prediction.is_valid && assessment.is_valid(),
        confidence: prediction.confidence,
        extracted_text: text,
        reason: None,
        rigorous_validation: Some(true),
        ocr_method,
        processed_at: now(),
    })
}

async fn train_model(State(state): State<AppState>) -> Result<Json<TrainResponse>, ApiError> {
    let _guard = state.train_lock.lock().await;
    info!("training requested");

    let layout = state.layout.clone();
    let extractor = state.extractor.clone();
    let opts = TrainOptions {
        dataset: layout.dataset_csv(),
        schema: FeatureSchema::Inference,
        seed: state.seed,
        generate_if_missing: Some(state.samples_if_missing),
    };
    let outcome = tokio::task::spawn_blocking(move || train_and_persist(&layout, &extractor, &opts))
        .await
        .context("training task panicked")??;

    let model_type = outcome.metadata.model_type.clone();
    let accuracy = outcome.metadata.accuracy;
    let model_path = outcome.model_path.display().to_string();
    state.model.replace(outcome.pipeline).await;

    Ok(Json(TrainResponse {
        success: true,
        message: "model trained".to_string(),
        model_type,
        accuracy,
        model_path,
    }))
}
