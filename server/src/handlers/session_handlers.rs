use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Json, Path},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use poster_fusion_cli::{FusionError, Language, SessionController, SessionSnapshot, ASPECT_RATIOS};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

pub type ApiError = (StatusCode, Json<Value>);

#[derive(Deserialize)]
pub struct RatioPayload {
    pub value: String,
}

#[derive(Deserialize)]
pub struct PromptPayload {
    pub prompt: String,
}

#[derive(Deserialize)]
pub struct TranslatePayload {
    pub language: Language,
}

pub fn status_for(err: &FusionError) -> StatusCode {
    match err {
        FusionError::InvalidFileType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        FusionError::MissingInput | FusionError::UnknownRatio(_) | FusionError::Decode(_) => {
            StatusCode::BAD_REQUEST
        }
        FusionError::NothingToDownload => StatusCode::NOT_FOUND,
        FusionError::Busy => StatusCode::CONFLICT,
        FusionError::BackgroundRemoval(_)
        | FusionError::PosterGeneration(_)
        | FusionError::Translation
        | FusionError::Remote { .. }
        | FusionError::Http(_) => StatusCode::BAD_GATEWAY,
        FusionError::Config(_) | FusionError::Io(_) | FusionError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// Every action answers with the session as it stands afterwards; failures
// carry it too so the client can render the recorded error.
async fn respond<T>(
    session: &SessionController,
    result: Result<T, FusionError>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = session.snapshot().await;
    match result {
        Ok(_) => Ok(Json(snapshot)),
        Err(e) => {
            let message = match &e {
                FusionError::Busy => e.to_string(),
                _ => snapshot.error.clone().unwrap_or_else(|| e.to_string()),
            };
            Err((
                status_for(&e),
                Json(json!({ "message": message, "session": snapshot })),
            ))
        }
    }
}

// Remote actions run on their own task so they complete, and the session
// records their outcome, even when the client goes away mid-request.
async fn detached<T, F>(action: F) -> Result<Result<T, FusionError>, ApiError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, FusionError>> + Send + 'static,
{
    tokio::spawn(action).await.map_err(|e| {
        error!(error = %e, "session action task failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "The request could not be completed." })),
        )
    })
}

/// GET /api/session
pub async fn get_session(
    Extension(session): Extension<Arc<SessionController>>,
) -> Json<SessionSnapshot> {
    Json(session.snapshot().await)
}

/// GET /api/ratios
pub async fn get_ratios() -> Json<Value> {
    Json(json!({ "ratios": ASPECT_RATIOS }))
}

/// POST /api/session/upload, raw image body
pub async fn upload(
    Extension(session): Extension<Arc<SessionController>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    debug!(%media_type, size = body.len(), "upload received");

    let worker = session.clone();
    let result = detached(async move { worker.upload(body.to_vec(), &media_type).await }).await?;
    respond(&session, result).await
}

/// POST /api/session/ratio
pub async fn select_ratio(
    Extension(session): Extension<Arc<SessionController>>,
    Json(payload): Json<RatioPayload>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let result = session.select_ratio(&payload.value).await;
    respond(&session, result).await
}

/// POST /api/session/prompt
pub async fn set_prompt(
    Extension(session): Extension<Arc<SessionController>>,
    Json(payload): Json<PromptPayload>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let result = session.set_prompt(payload.prompt).await;
    respond(&session, result).await
}

/// POST /api/session/generate
pub async fn generate(
    Extension(session): Extension<Arc<SessionController>>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let worker = session.clone();
    let result = detached(async move { worker.generate().await }).await?;
    respond(&session, result).await
}

/// POST /api/session/translate
pub async fn translate(
    Extension(session): Extension<Arc<SessionController>>,
    Json(payload): Json<TranslatePayload>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let worker = session.clone();
    let result = detached(async move { worker.translate(payload.language).await }).await?;
    respond(&session, result).await
}

/// POST /api/session/posters/{posterId}/activate
pub async fn activate_poster(
    Extension(session): Extension<Arc<SessionController>>,
    Path(poster_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let result = session.select_poster(&poster_id).await;
    respond(&session, result).await
}

/// GET /api/session/download
pub async fn download(
    Extension(session): Extension<Arc<SessionController>>,
) -> Result<Response, ApiError> {
    let poster = session.download().await.map_err(|e| {
        (status_for(&e), Json(json!({ "message": e.to_string() })))
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&poster.src.mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    let disposition = format!("attachment; filename=\"{}\"", poster.file_name());
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((headers, poster.src.bytes).into_response())
}
