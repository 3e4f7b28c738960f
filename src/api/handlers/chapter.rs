use crate::api::types::{ApiResponse, AppError, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use manga_reader_common::models::{ChapterContent, ChapterMetadata, NewChapter};
use serde::Deserialize;

fn parse_chapter_number(raw: &str) -> Result<f64, AppError> {
    match raw.trim().parse::<f64>() {
        Ok(number) if number.is_finite() && number >= 0.0 => Ok(number),
        _ => Err(AppError::BadRequest(format!("Invalid chapter number: {raw}"))),
    }
}

pub async fn get_chapter(
    State(state): State<AppState>,
    Path((slug, chapter)): Path<(String, String)>,
) -> Result<Json<ApiResponse<ChapterContent>>, AppError> {
    let number = parse_chapter_number(&chapter)?;

    match state.storage.get_chapter_content(&slug, number).await {
        Ok(Some(content)) => Ok(ApiResponse::data(content)),
        Ok(None) => Err(AppError::NotFound(format!("Chapter {chapter} of {slug} not found"))),
        Err(e) => {
            tracing::error!("Failed to get chapter {} of {}: {:?}", chapter, slug, e);
            Err(AppError::InternalServerError("Failed to fetch chapter".to_string()))
        }
    }
}

#[derive(Deserialize)]
pub struct CreateChapterRequest {
    pub number: f64,
    pub title: Option<String>,
    pub release_date: Option<i64>,
    #[serde(default)]
    pub pages: Vec<String>,
}

pub async fn create_chapter(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    payload: Result<Json<CreateChapterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ChapterMetadata>>), AppError> {
    let Json(payload) = payload?;

    if !payload.number.is_finite() || payload.number < 0.0 {
        return Err(AppError::BadRequest(format!("Invalid chapter number: {}", payload.number)));
    }

    let pages: Vec<String> = payload
        .pages
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if pages.is_empty() {
        return Err(AppError::BadRequest("Please add the chapter's page images".to_string()));
    }

    let params = NewChapter {
        number: payload.number,
        title: payload
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
        release_date: payload.release_date,
        pages,
    };

    match state.storage.ingest_chapter(&slug, params).await {
        Ok(Some(chapter)) => Ok((StatusCode::CREATED, ApiResponse::data(chapter))),
        Ok(None) => Err(AppError::NotFound(format!("No manga found with slug: {slug}"))),
        Err(e) => {
            tracing::error!("Failed to ingest chapter for {}: {:?}", slug, e);
            Err(AppError::InternalServerError("Failed to upload chapter".to_string()))
        }
    }
}
