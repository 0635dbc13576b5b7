use std::time::Instant;

use apex_core::documents::{
    analyze_document, classify_document, extract_cms1500, schemas_document, suggest_codes,
    Cms1500Extraction, DocumentAnalysisResult, UploadedDocument,
};
use apex_core::errors::{ApplicationError, DomainError};
use axum::{
    extract::{Multipart, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{correlation_id, error_response, ApiError, ApiResult};
use crate::bootstrap::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeParams {
    #[serde(default)]
    pub organization_id: String,
    pub document_type_hint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestCodesParams {
    #[serde(default)]
    pub clinical_text: String,
}

struct Upload {
    filename: String,
    size_bytes: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/extract/cms1500", post(extract_cms1500_form))
        .route("/classify", post(classify))
        .route("/suggest-codes", post(suggest_medical_codes))
        .route("/schemas", get(schemas))
}

/// Reads the multipart `file` field. Content is only measured, never kept.
async fn read_upload(
    mut multipart: Multipart,
    correlation_id: &str,
) -> Result<Upload, (StatusCode, Json<ApiError>)> {
    let missing_file =
        || error_response(DomainError::MissingInput("file".to_string()).into(), correlation_id);

    while let Some(field) = multipart.next_field().await.map_err(|_| missing_file())? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await.map_err(|_| missing_file())?;
        if filename.trim().is_empty() {
            return Err(missing_file());
        }
        return Ok(Upload { filename, size_bytes: content.len() });
    }
    Err(missing_file())
}

pub async fn analyze(
    Query(params): Query<AnalyzeParams>,
    multipart: Multipart,
) -> ApiResult<DocumentAnalysisResult> {
    let correlation_id = correlation_id();
    let started = Instant::now();
    let upload = read_upload(multipart, &correlation_id).await?;

    info!(
        event_name = "api.documents.analyze_started",
        correlation_id = %correlation_id,
        organization_id = %params.organization_id,
        size_bytes = upload.size_bytes,
        document_type_hint = params.document_type_hint.as_deref().unwrap_or("none"),
        "analyzing document"
    );

    let document = UploadedDocument {
        filename: &upload.filename,
        size_bytes: upload.size_bytes,
        document_type_hint: params.document_type_hint.as_deref(),
    };
    let mut result = analyze_document(&document, Utc::now())
        .map_err(|error| error_response(ApplicationError::from(error), &correlation_id))?;
    result.processing_time_ms = started.elapsed().as_millis() as u64;
    Ok(Json(result))
}

pub async fn extract_cms1500_form(multipart: Multipart) -> ApiResult<Cms1500Extraction> {
    read_upload(multipart, &correlation_id()).await?;
    Ok(Json(extract_cms1500()))
}

pub async fn classify(multipart: Multipart) -> ApiResult<Value> {
    read_upload(multipart, &correlation_id()).await?;
    Ok(Json(classify_document()))
}

pub async fn suggest_medical_codes(Query(params): Query<SuggestCodesParams>) -> ApiResult<Value> {
    suggest_codes(&params.clinical_text)
        .map(Json)
        .map_err(|error| error_response(ApplicationError::from(error), &correlation_id()))
}

pub async fn schemas() -> Json<Value> {
    Json(schemas_document())
}
