use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TitleStatus {
    #[default]
    Ongoing,
    Completed,
}

/// A manga or manhwa work without its chapters.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Title {
    pub slug: String,
    pub title_native: String,
    pub title_alt: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub status: TitleStatus,
    #[serde(rename = "type")]
    pub kind: String,
    pub author: Option<String>,
    pub views: i64,
    pub genres: Vec<String>,
    pub created_at: i64,
}

/// Number and release time of a chapter, enough to pick the latest one.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ChapterStamp {
    pub number: f64,
    pub release_date: i64,
}

/// Chapter fields shown on a title's page. Page references are left out.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct ChapterMetadata {
    pub number: f64,
    pub title: Option<String>,
    pub release_date: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TitleSummary {
    pub slug: String,
    pub title_native: String,
    pub title_alt: Option<String>,
    pub cover_url: Option<String>,
    pub status: TitleStatus,
    #[serde(rename = "type")]
    pub kind: String,
    pub author: Option<String>,
    pub views: i64,
    pub genres: Vec<String>,
    pub created_at: i64,
    pub latest_chapter: f64,
    pub latest_chapter_date: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TitleDetails {
    #[serde(flatten)]
    pub title: Title,
    pub chapters: Vec<ChapterMetadata>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChapterNavigation {
    pub prev_chapter: Option<f64>,
    pub next_chapter: Option<f64>,
}

/// Everything the reader needs to display one chapter.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterContent {
    pub manga_title: String,
    pub chapter_number: f64,
    pub chapter_title: Option<String>,
    pub pages: Vec<String>,
    pub navigation: ChapterNavigation,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewTitle {
    pub slug: String,
    pub title_native: String,
    pub title_alt: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub status: TitleStatus,
    pub kind: String,
    pub author: Option<String>,
    pub genres: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewChapter {
    pub number: f64,
    pub title: Option<String>,
    /// Unix seconds; `None` means "now".
    pub release_date: Option<i64>,
    pub pages: Vec<String>,
}
