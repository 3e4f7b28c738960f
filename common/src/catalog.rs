use crate::models::{ChapterMetadata, ChapterStamp, Title, TitleSummary};
use serde::{Deserialize, Serialize};

/// Maximum number of titles returned by a catalog listing.
pub const LIST_LIMIT: usize = 30;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Newest titles first.
    #[default]
    Recency,
    /// Highest view counter first.
    Popularity,
    /// Most recently released chapter first.
    ChapterActivity,
    /// Highest chapter number first.
    LatestChapter,
}

impl SortKey {
    /// Unknown or missing values fall back to [`SortKey::Recency`].
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("views") => SortKey::Popularity,
            Some("chapters") => SortKey::ChapterActivity,
            Some("latest_chapter") => SortKey::LatestChapter,
            _ => SortKey::Recency,
        }
    }
}

/// Store-agnostic predicate over titles. Every predicate of a query must hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleFilter {
    /// Literal substring of the native or alternate name, ignoring ASCII case.
    NameContains(String),
    KindEquals(String),
    HasGenre(String),
}

impl TitleFilter {
    pub fn matches(&self, title: &Title) -> bool {
        match self {
            TitleFilter::NameContains(needle) => {
                let needle = needle.to_ascii_lowercase();
                std::iter::once(title.title_native.as_str())
                    .chain(title.title_alt.as_deref())
                    .any(|name| name.to_ascii_lowercase().contains(&needle))
            }
            TitleFilter::KindEquals(kind) => &title.kind == kind,
            TitleFilter::HasGenre(genre) => title.genres.iter().any(|g| g == genre),
        }
    }
}

/// Raw query-string parameters of the listing endpoint.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CatalogParams {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub genre: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub kind: Option<String>,
    pub genre: Option<String>,
    pub sort: SortKey,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<CatalogParams> for CatalogQuery {
    fn from(params: CatalogParams) -> Self {
        Self {
            sort: SortKey::from_param(params.sort.as_deref()),
            search: non_blank(params.search),
            kind: non_blank(params.kind),
            genre: non_blank(params.genre),
        }
    }
}

impl CatalogQuery {
    pub fn filters(&self) -> Vec<TitleFilter> {
        let mut filters = Vec::new();
        if let Some(search) = &self.search {
            filters.push(TitleFilter::NameContains(search.clone()));
        }
        if let Some(kind) = &self.kind {
            filters.push(TitleFilter::KindEquals(kind.clone()));
        }
        if let Some(genre) = &self.genre {
            filters.push(TitleFilter::HasGenre(genre.clone()));
        }
        filters
    }

    pub fn matches(&self, title: &Title) -> bool {
        self.filters().iter().all(|f| f.matches(title))
    }
}

/// The chapter with the highest number, whatever its release date.
pub fn latest_chapter(chapters: &[ChapterStamp]) -> Option<&ChapterStamp> {
    chapters
        .iter()
        .max_by(|a, b| a.number.total_cmp(&b.number))
}

impl TitleSummary {
    pub fn from_parts(title: Title, chapters: &[ChapterStamp]) -> Self {
        let (latest_chapter, latest_chapter_date) = match latest_chapter(chapters) {
            Some(stamp) => (stamp.number, stamp.release_date),
            None => (0.0, title.created_at),
        };

        Self {
            slug: title.slug,
            title_native: title.title_native,
            title_alt: title.title_alt,
            cover_url: title.cover_url,
            status: title.status,
            kind: title.kind,
            author: title.author,
            views: title.views,
            genres: title.genres,
            created_at: title.created_at,
            latest_chapter,
            latest_chapter_date,
        }
    }
}

/// Returns the chapters ordered by number, highest first. The input is left untouched.
pub fn newest_first(chapters: &[ChapterMetadata]) -> Vec<ChapterMetadata> {
    let mut sorted = chapters.to_vec();
    sorted.sort_by(|a, b| b.number.total_cmp(&a.number));
    sorted
}

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
