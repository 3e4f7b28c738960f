use crate::api::types::{ApiResponse, AppError, AppState};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use manga_reader_common::catalog::{slugify, CatalogParams, CatalogQuery};
use manga_reader_common::models::{NewTitle, TitleDetails, TitleStatus, TitleSummary};
use serde::{Deserialize, Serialize};

pub async fn list_mangas(
    State(state): State<AppState>,
    params: Result<Query<CatalogParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<TitleSummary>>>, AppError> {
    let Query(params) = params?;
    let query = CatalogQuery::from(params);
    tracing::debug!(?query, "Listing titles");

    match state.storage.list_titles(&query).await {
        Ok(titles) => Ok(ApiResponse::list(titles)),
        Err(e) => {
            tracing::error!("Failed to list titles: {:?}", e);
            Err(AppError::InternalServerError("Failed to fetch the manga list".to_string()))
        }
    }
}

pub async fn get_manga(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<TitleDetails>>, AppError> {
    match state.storage.get_title(&slug).await {
        Ok(Some(details)) => Ok(ApiResponse::data(details)),
        Ok(None) => Err(AppError::NotFound(format!("No manga found with slug: {slug}"))),
        Err(e) => {
            tracing::error!("Failed to get title {}: {:?}", slug, e);
            Err(AppError::InternalServerError("Failed to fetch manga details".to_string()))
        }
    }
}

#[derive(Deserialize)]
pub struct CreateMangaRequest {
    pub slug: Option<String>,
    #[serde(default)]
    pub title_native: String,
    pub title_alt: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TitleStatus,
    #[serde(default, rename = "type")]
    pub kind: String,
    pub author: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Serialize)]
pub struct CreatedManga {
    pub slug: String,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateMangaRequest {
    fn into_new_title(self) -> Result<NewTitle, AppError> {
        let title_native = self.title_native.trim().to_string();
        if title_native.is_empty() {
            return Err(AppError::BadRequest("title_native is required".to_string()));
        }
        let kind = self.kind.trim().to_string();
        if kind.is_empty() {
            return Err(AppError::BadRequest("type is required".to_string()));
        }

        let title_alt = trimmed(self.title_alt);
        let slug = match trimmed(self.slug) {
            Some(slug) => slugify(&slug),
            None => slugify(title_alt.as_deref().unwrap_or(&title_native)),
        };
        if slug.is_empty() {
            return Err(AppError::BadRequest(
                "Could not derive a slug, please provide one".to_string(),
            ));
        }

        Ok(NewTitle {
            slug,
            title_native,
            title_alt,
            cover_url: trimmed(self.cover_url),
            description: trimmed(self.description),
            status: self.status,
            kind,
            author: trimmed(self.author),
            genres: self
                .genres
                .into_iter()
                .filter_map(|g| trimmed(Some(g)))
                .collect(),
        })
    }
}

pub async fn create_manga(
    State(state): State<AppState>,
    payload: Result<Json<CreateMangaRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedManga>>), AppError> {
    let Json(payload) = payload?;
    let params = payload.into_new_title()?;
    let slug = params.slug.clone();

    match state.storage.create_title(params).await {
        Ok(Some(slug)) => Ok((StatusCode::CREATED, ApiResponse::data(CreatedManga { slug }))),
        Ok(None) => Err(AppError::Conflict(format!("A manga with slug {slug} already exists"))),
        Err(e) => {
            tracing::error!("Failed to create title {}: {:?}", slug, e);
            Err(AppError::InternalServerError("Failed to create manga".to_string()))
        }
    }
}
