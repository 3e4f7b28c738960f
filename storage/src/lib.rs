use anyhow::{Context, Result};

use manga_reader_common::catalog::{newest_first, CatalogQuery, SortKey, TitleFilter, LIST_LIMIT};
use manga_reader_common::models;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, Pool, QueryBuilder, Sqlite};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;

/// How long a writer waits for another writer's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct Storage {
    pub pool: Pool<Sqlite>,
}

#[derive(Debug, FromRow)]
struct TitleRow {
    id: String,
    slug: String,
    title_native: String,
    title_alt: Option<String>,
    cover_url: Option<String>,
    description: Option<String>,
    status: models::TitleStatus,
    kind: String,
    author: Option<String>,
    views: i64,
    genres: String,
    created_at: i64,
}

impl TitleRow {
    fn into_title(self) -> Result<(String, models::Title)> {
        let genres: Vec<String> = serde_json::from_str(&self.genres)
            .with_context(|| format!("corrupt genre list for title {}", self.slug))?;
        Ok((
            self.id,
            models::Title {
                slug: self.slug,
                title_native: self.title_native,
                title_alt: self.title_alt,
                cover_url: self.cover_url,
                description: self.description,
                status: self.status,
                kind: self.kind,
                author: self.author,
                views: self.views,
                genres,
                created_at: self.created_at,
            },
        ))
    }
}

#[derive(Debug, FromRow)]
struct StampRow {
    title_id: String,
    number: f64,
    release_date: i64,
}

impl Storage {
    pub async fn new(data_dir: &str, max_connections: u32) -> Result<Self> {
        let path = PathBuf::from(data_dir);
        if !path.exists() {
            fs::create_dir_all(&path).await?;
        }

        let db_path = path.join("manga.db");
        let db_url = format!("sqlite://{}", db_path.to_string_lossy());
        Self::connect(&db_url, max_connections).await
    }

    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    /// A private database living as long as the returned handle.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        // Every connection to `:memory:` is a separate database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    async fn migrate(&self) -> Result<()> {
        // Titles. Genres are a JSON array of strings.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS titles (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                title_native TEXT NOT NULL,
                title_alt TEXT,
                cover_url TEXT,
                description TEXT,
                status TEXT NOT NULL,
                kind TEXT NOT NULL,
                author TEXT,
                views INTEGER NOT NULL DEFAULT 0,
                genres TEXT NOT NULL DEFAULT '[]',
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chapters (
                title_id TEXT NOT NULL,
                number REAL NOT NULL,
                title TEXT,
                release_date INTEGER NOT NULL,
                PRIMARY KEY (title_id, number),
                FOREIGN KEY(title_id) REFERENCES titles(id) ON DELETE CASCADE
            )",
        )
        .execute(&self.pool)
        .await?;

        // Page references keep their upload order through sequence_index.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS pages (
                title_id TEXT NOT NULL,
                chapter_number REAL NOT NULL,
                sequence_index INTEGER NOT NULL,
                url TEXT NOT NULL,
                PRIMARY KEY (title_id, chapter_number, sequence_index),
                FOREIGN KEY(title_id, chapter_number)
                    REFERENCES chapters(title_id, number) ON DELETE CASCADE
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Escapes `LIKE` wildcards so search text is matched literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: &[TitleFilter]) {
    for (i, filter) in filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        match filter {
            // SQLite LIKE folds ASCII case only, same as TitleFilter::matches.
            TitleFilter::NameContains(needle) => {
                let pattern = like_pattern(needle);
                qb.push("(t.title_native LIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\' OR t.title_alt LIKE ")
                    .push_bind(pattern)
                    .push(" ESCAPE '\\')");
            }
            TitleFilter::KindEquals(kind) => {
                qb.push("t.kind = ").push_bind(kind.clone());
            }
            TitleFilter::HasGenre(genre) => {
                qb.push("EXISTS (SELECT 1 FROM json_each(t.genres) g WHERE g.value = ")
                    .push_bind(genre.clone())
                    .push(")");
            }
        }
    }
}

fn order_clause(sort: SortKey) -> &'static str {
    match sort {
        SortKey::Recency => " ORDER BY t.created_at DESC, t.slug ASC",
        SortKey::Popularity => " ORDER BY t.views DESC, t.created_at DESC, t.slug ASC",
        // Titles without chapters sort last: NULL is the smallest value in SQLite.
        SortKey::ChapterActivity => {
            " ORDER BY (SELECT MAX(c.release_date) FROM chapters c WHERE c.title_id = t.id) DESC, \
             t.created_at DESC, t.slug ASC"
        }
        SortKey::LatestChapter => {
            " ORDER BY COALESCE((SELECT MAX(c.number) FROM chapters c WHERE c.title_id = t.id), 0) \
             DESC, t.created_at DESC, t.slug ASC"
        }
    }
}

impl Storage {
    pub async fn list_titles(&self, query: &CatalogQuery) -> Result<Vec<models::TitleSummary>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT t.* FROM titles t");
        push_filters(&mut qb, &query.filters());
        qb.push(order_clause(query.sort));
        qb.push(" LIMIT ").push_bind(LIST_LIMIT as i64);

        let rows = qb.build_query_as::<TitleRow>().fetch_all(&self.pool).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut stamps = self
            .chapter_stamps(rows.iter().map(|r| r.id.as_str()))
            .await?;

        rows.into_iter()
            .map(|row| {
                let (id, title) = row.into_title()?;
                let chapters = stamps.remove(&id).unwrap_or_default();
                Ok(models::TitleSummary::from_parts(title, &chapters))
            })
            .collect()
    }

    async fn chapter_stamps<'a>(
        &self,
        title_ids: impl Iterator<Item = &'a str>,
    ) -> Result<HashMap<String, Vec<models::ChapterStamp>>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT title_id, number, release_date FROM chapters WHERE title_id IN (",
        );
        let mut ids = qb.separated(", ");
        for id in title_ids {
            ids.push_bind(id.to_string());
        }
        ids.push_unseparated(")");

        let rows = qb.build_query_as::<StampRow>().fetch_all(&self.pool).await?;

        let mut stamps: HashMap<String, Vec<models::ChapterStamp>> = HashMap::new();
        for row in rows {
            stamps
                .entry(row.title_id)
                .or_default()
                .push(models::ChapterStamp {
                    number: row.number,
                    release_date: row.release_date,
                });
        }
        Ok(stamps)
    }

    async fn find_title(&self, slug: &str) -> Result<Option<(String, models::Title)>> {
        let row = sqlx::query_as::<_, TitleRow>("SELECT * FROM titles WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TitleRow::into_title).transpose()
    }

    pub async fn get_title(&self, slug: &str) -> Result<Option<models::TitleDetails>> {
        let (id, title) = match self.find_title(slug).await? {
            Some(found) => found,
            None => return Ok(None),
        };

        let chapters = sqlx::query_as::<_, models::ChapterMetadata>(
            "SELECT number, title, release_date FROM chapters WHERE title_id = ?",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(models::TitleDetails {
            title,
            chapters: newest_first(&chapters),
        }))
    }

    pub async fn get_chapter_content(
        &self,
        slug: &str,
        number: f64,
    ) -> Result<Option<models::ChapterContent>> {
        let (id, title) = match self.find_title(slug).await? {
            Some(found) => found,
            None => return Ok(None),
        };

        let chapter = sqlx::query_as::<_, models::ChapterMetadata>(
            "SELECT number, title, release_date FROM chapters WHERE title_id = ? AND number = ?",
        )
        .bind(&id)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        let Some(chapter) = chapter else {
            return Ok(None);
        };

        let pages = sqlx::query_scalar::<_, String>(
            "SELECT url FROM pages WHERE title_id = ? AND chapter_number = ? \
             ORDER BY sequence_index ASC",
        )
        .bind(&id)
        .bind(chapter.number)
        .fetch_all(&self.pool)
        .await?;

        let numbers = sqlx::query_scalar::<_, f64>("SELECT number FROM chapters WHERE title_id = ?")
            .bind(&id)
            .fetch_all(&self.pool)
            .await?;

        Ok(Some(models::ChapterContent {
            manga_title: title.title_native,
            chapter_number: chapter.number,
            chapter_title: chapter.title,
            pages,
            navigation: models::ChapterNavigation::resolve(&numbers, chapter.number),
        }))
    }
}

impl Storage {
    /// Returns the slug of the new title, or `None` when the slug is already taken.
    pub async fn create_title(&self, params: models::NewTitle) -> Result<Option<String>> {
        self.insert_title(params, chrono::Utc::now().timestamp()).await
    }

    pub(crate) async fn insert_title(
        &self,
        params: models::NewTitle,
        created_at: i64,
    ) -> Result<Option<String>> {
        let id = uuid::Uuid::new_v4().to_string();
        let genres = serde_json::to_string(&params.genres)?;

        // The slug check and the insert are one statement so racing creates cannot both pass.
        let inserted = sqlx::query(
            "INSERT INTO titles (id, slug, title_native, title_alt, cover_url, description, \
             status, kind, author, views, genres, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?) \
             ON CONFLICT(slug) DO NOTHING",
        )
        .bind(&id)
        .bind(&params.slug)
        .bind(&params.title_native)
        .bind(&params.title_alt)
        .bind(&params.cover_url)
        .bind(&params.description)
        .bind(params.status)
        .bind(&params.kind)
        .bind(&params.author)
        .bind(genres)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            tracing::info!("Title already exists: {}", params.slug);
            return Ok(None);
        }

        tracing::info!("Created title {} ({})", params.slug, id);
        Ok(Some(params.slug))
    }

    /// Stores a chapter and its page references under the title `slug`.
    ///
    /// Uploading a chapter number that already exists replaces its title,
    /// release date and pages. Returns `None` when the title is unknown.
    pub async fn ingest_chapter(
        &self,
        slug: &str,
        params: models::NewChapter,
    ) -> Result<Option<models::ChapterMetadata>> {
        let release_date = params
            .release_date
            .unwrap_or_else(|| chrono::Utc::now().timestamp());

        // Writers queue on the busy timeout here instead of failing on lock upgrade.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let title_id = sqlx::query_scalar::<_, String>("SELECT id FROM titles WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(title_id) = title_id else {
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO chapters (title_id, number, title, release_date) VALUES (?, ?, ?, ?) \
             ON CONFLICT(title_id, number) DO UPDATE \
             SET title = excluded.title, release_date = excluded.release_date",
        )
        .bind(&title_id)
        .bind(params.number)
        .bind(&params.title)
        .bind(release_date)
        .execute(&mut *tx)
        .await?;

        let replaced = sqlx::query("DELETE FROM pages WHERE title_id = ? AND chapter_number = ?")
            .bind(&title_id)
            .bind(params.number)
            .execute(&mut *tx)
            .await?;

        if replaced.rows_affected() > 0 {
            tracing::info!("Replacing pages of chapter {} of {}", params.number, slug);
        }

        for (index, url) in params.pages.iter().enumerate() {
            sqlx::query(
                "INSERT INTO pages (title_id, chapter_number, sequence_index, url) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&title_id)
            .bind(params.number)
            .bind(index as i64)
            .bind(url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Stored chapter {} of {} with {} pages",
            params.number,
            slug,
            params.pages.len()
        );

        Ok(Some(models::ChapterMetadata {
            number: params.number,
            title: params.title,
            release_date,
        }))
    }
}

#[cfg(test)]
mod tests;
