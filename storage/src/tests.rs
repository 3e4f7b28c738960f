use super::*;
use manga_reader_common::catalog::CatalogParams;
use manga_reader_common::models::{NewChapter, NewTitle, TitleStatus};

fn new_title(slug: &str, native: &str, alt: Option<&str>, kind: &str) -> NewTitle {
    NewTitle {
        slug: slug.to_string(),
        title_native: native.to_string(),
        title_alt: alt.map(str::to_string),
        cover_url: Some(format!("/covers/{slug}.jpg")),
        description: None,
        status: TitleStatus::Ongoing,
        kind: kind.to_string(),
        author: Some("Chugong".to_string()),
        genres: vec!["action".to_string()],
    }
}

fn chapter(number: f64, release_date: i64, pages: &[&str]) -> NewChapter {
    NewChapter {
        number,
        title: Some(format!("Chapter {number}")),
        release_date: Some(release_date),
        pages: pages.iter().map(|p| p.to_string()).collect(),
    }
}

async fn seeded() -> Storage {
    let storage = Storage::in_memory().await.unwrap();

    let titles = [
        ("solo-leveling", "سولو ليفلينج", Some("Solo Leveling"), "Manhwa", 100),
        ("one-piece", "ون بيس", Some("One Piece"), "Manga", 200),
        ("one-punch-man", "ONE PUNCH MAN", None, "Manga", 300),
        ("tower-of-god", "برج الإله", Some("Tower of God"), "Manhwa", 400),
    ];
    for (slug, native, alt, kind, created_at) in titles {
        storage
            .insert_title(new_title(slug, native, alt, kind), created_at)
            .await
            .unwrap();
    }

    let views = [
        ("solo-leveling", 4_500),
        ("one-piece", 3_200),
        ("tower-of-god", 2_800),
    ];
    for (slug, views) in views {
        sqlx::query("UPDATE titles SET views = ? WHERE slug = ?")
            .bind(views)
            .bind(slug)
            .execute(&storage.pool)
            .await
            .unwrap();
    }

    storage
        .ingest_chapter("solo-leveling", chapter(1.0, 1_000, &["s1-1", "s1-2"]))
        .await
        .unwrap();
    storage
        .ingest_chapter("solo-leveling", chapter(200.0, 2_000, &["s200-1"]))
        .await
        .unwrap();
    storage
        .ingest_chapter("one-piece", chapter(1100.0, 5_000, &["op-1"]))
        .await
        .unwrap();
    // Back-filled: lower number, later release.
    storage
        .ingest_chapter("one-piece", chapter(7.0, 9_000, &["op-7"]))
        .await
        .unwrap();

    storage
}

fn query(sort: Option<&str>, search: Option<&str>, kind: Option<&str>) -> CatalogQuery {
    CatalogQuery::from(CatalogParams {
        search: search.map(str::to_string),
        kind: kind.map(str::to_string),
        genre: None,
        sort: sort.map(str::to_string),
    })
}

fn slugs(summaries: &[models::TitleSummary]) -> Vec<&str> {
    summaries.iter().map(|s| s.slug.as_str()).collect()
}

#[tokio::test]
async fn default_listing_is_newest_first() {
    let storage = seeded().await;
    let titles = storage.list_titles(&CatalogQuery::default()).await.unwrap();
    assert_eq!(
        slugs(&titles),
        vec!["tower-of-god", "one-punch-man", "one-piece", "solo-leveling"]
    );
}

#[tokio::test]
async fn listing_is_capped() {
    let storage = Storage::in_memory().await.unwrap();
    for i in 0..(LIST_LIMIT + 5) {
        let slug = format!("title-{i}");
        storage
            .insert_title(new_title(&slug, &slug, None, "Manga"), i as i64)
            .await
            .unwrap();
    }

    let titles = storage.list_titles(&CatalogQuery::default()).await.unwrap();
    assert_eq!(titles.len(), LIST_LIMIT);
    assert_eq!(titles[0].slug, format!("title-{}", LIST_LIMIT + 4));
}

#[tokio::test]
async fn search_matches_both_names_case_insensitively() {
    let storage = seeded().await;
    let titles = storage
        .list_titles(&query(None, Some("One"), None))
        .await
        .unwrap();
    assert_eq!(slugs(&titles), vec!["one-punch-man", "one-piece"]);

    let titles = storage
        .list_titles(&query(None, Some("ليفلينج"), None))
        .await
        .unwrap();
    assert_eq!(slugs(&titles), vec!["solo-leveling"]);
}

#[tokio::test]
async fn search_text_is_literal() {
    let storage = seeded().await;
    for needle in ["%", "_", ".*"] {
        let titles = storage
            .list_titles(&query(None, Some(needle), None))
            .await
            .unwrap();
        assert!(titles.is_empty(), "{needle} matched {:?}", slugs(&titles));
    }
}

#[tokio::test]
async fn type_filter_is_exact() {
    let storage = seeded().await;
    let titles = storage
        .list_titles(&query(None, None, Some("Manhwa")))
        .await
        .unwrap();
    assert_eq!(slugs(&titles), vec!["tower-of-god", "solo-leveling"]);

    let titles = storage
        .list_titles(&query(None, None, Some("manhwa")))
        .await
        .unwrap();
    assert!(titles.is_empty());
}

#[tokio::test]
async fn genre_filter() {
    let storage = seeded().await;
    let mut drama = new_title("witch-hat", "المشعوذة", Some("Witch Hat Atelier"), "Manga");
    drama.genres = vec!["fantasy".to_string(), "drama".to_string()];
    storage.insert_title(drama, 500).await.unwrap();

    let titles = storage
        .list_titles(&CatalogQuery {
            genre: Some("drama".to_string()),
            ..CatalogQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(slugs(&titles), vec!["witch-hat"]);
    assert_eq!(titles[0].genres, vec!["fantasy", "drama"]);
}

#[tokio::test]
async fn sort_by_views() {
    let storage = seeded().await;
    let titles = storage
        .list_titles(&query(Some("views"), None, None))
        .await
        .unwrap();
    assert_eq!(
        slugs(&titles),
        vec!["solo-leveling", "one-piece", "tower-of-god", "one-punch-man"]
    );
}

#[tokio::test]
async fn sort_by_chapter_activity_puts_empty_titles_last() {
    let storage = seeded().await;
    let titles = storage
        .list_titles(&query(Some("chapters"), None, None))
        .await
        .unwrap();
    assert_eq!(
        slugs(&titles),
        vec!["one-piece", "solo-leveling", "tower-of-god", "one-punch-man"]
    );
}

#[tokio::test]
async fn sort_by_latest_chapter_number() {
    let storage = seeded().await;
    let titles = storage
        .list_titles(&query(Some("latest_chapter"), None, None))
        .await
        .unwrap();
    assert_eq!(
        slugs(&titles),
        vec!["one-piece", "solo-leveling", "tower-of-god", "one-punch-man"]
    );
}

#[tokio::test]
async fn summaries_carry_highest_numbered_chapter() {
    let storage = seeded().await;
    let titles = storage.list_titles(&CatalogQuery::default()).await.unwrap();

    let one_piece = titles.iter().find(|t| t.slug == "one-piece").unwrap();
    assert_eq!(one_piece.latest_chapter, 1100.0);
    assert_eq!(one_piece.latest_chapter_date, 5_000);

    let tower = titles.iter().find(|t| t.slug == "tower-of-god").unwrap();
    assert_eq!(tower.latest_chapter, 0.0);
    assert_eq!(tower.latest_chapter_date, 400);
}

#[tokio::test]
async fn empty_match_is_not_an_error() {
    let storage = seeded().await;
    let titles = storage
        .list_titles(&query(None, Some("does not exist"), None))
        .await
        .unwrap();
    assert!(titles.is_empty());
}

#[tokio::test]
async fn detail_sorts_chapters_descending() {
    let storage = seeded().await;
    storage
        .ingest_chapter("solo-leveling", chapter(150.5, 1_500, &["x"]))
        .await
        .unwrap();

    let details = storage.get_title("solo-leveling").await.unwrap().unwrap();
    let numbers: Vec<f64> = details.chapters.iter().map(|c| c.number).collect();
    assert_eq!(numbers, vec![200.0, 150.5, 1.0]);
    assert_eq!(details.title.title_alt.as_deref(), Some("Solo Leveling"));
}

#[tokio::test]
async fn detail_of_unknown_slug_is_none() {
    let storage = seeded().await;
    assert!(storage.get_title("naruto").await.unwrap().is_none());
}

#[tokio::test]
async fn chapter_content_resolves_neighbours_by_number() {
    let storage = Storage::in_memory().await.unwrap();
    storage
        .insert_title(new_title("gaps", "Gaps", None, "Manga"), 1)
        .await
        .unwrap();
    // Uploaded out of order on purpose.
    for (number, released) in [(7.0, 10), (1.0, 30), (5.0, 20)] {
        storage
            .ingest_chapter("gaps", chapter(number, released, &["a", "b", "c"]))
            .await
            .unwrap();
    }

    let content = storage.get_chapter_content("gaps", 5.0).await.unwrap().unwrap();
    assert_eq!(content.manga_title, "Gaps");
    assert_eq!(content.chapter_number, 5.0);
    assert_eq!(content.chapter_title.as_deref(), Some("Chapter 5"));
    assert_eq!(content.pages, vec!["a", "b", "c"]);
    assert_eq!(content.navigation.prev_chapter, Some(1.0));
    assert_eq!(content.navigation.next_chapter, Some(7.0));

    let first = storage.get_chapter_content("gaps", 1.0).await.unwrap().unwrap();
    assert_eq!(first.navigation.prev_chapter, None);
    assert_eq!(first.navigation.next_chapter, Some(5.0));
}

#[tokio::test]
async fn chapter_content_not_found() {
    let storage = seeded().await;
    assert!(storage
        .get_chapter_content("solo-leveling", 2.0)
        .await
        .unwrap()
        .is_none());
    assert!(storage
        .get_chapter_content("naruto", 1.0)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn reupload_replaces_pages() {
    let storage = seeded().await;
    storage
        .ingest_chapter("solo-leveling", chapter(1.0, 3_000, &["new-1", "new-2", "new-3"]))
        .await
        .unwrap();

    let content = storage
        .get_chapter_content("solo-leveling", 1.0)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(content.pages, vec!["new-1", "new-2", "new-3"]);

    let details = storage.get_title("solo-leveling").await.unwrap().unwrap();
    assert_eq!(details.chapters.len(), 2);
}

#[tokio::test]
async fn ingest_into_unknown_title_is_none() {
    let storage = seeded().await;
    let stored = storage
        .ingest_chapter("naruto", chapter(1.0, 1, &["p"]))
        .await
        .unwrap();
    assert!(stored.is_none());
}

#[tokio::test]
async fn duplicate_slug_is_rejected() {
    let storage = seeded().await;
    let created = storage
        .create_title(new_title("one-piece", "x", None, "Manga"))
        .await
        .unwrap();
    assert!(created.is_none());

    let created = storage
        .create_title(new_title("naruto", "ناروتو", Some("Naruto"), "Manga"))
        .await
        .unwrap();
    assert_eq!(created.as_deref(), Some("naruto"));
}

#[test]
fn like_pattern_escapes_wildcards() {
    assert_eq!(like_pattern("a%b_c\\"), "%a\\%b\\_c\\\\%");
}

#[tokio::test]
async fn sql_filters_agree_with_in_memory_predicates() {
    let storage = seeded().await;

    let extra = [
        ("okami", "Ōkami", Some("ŌKAMI Den"), "Manga", 500, vec!["drama"]),
        ("perfect-girl", "100% Perfect Girl", None, "Manhwa", 600, vec!["romance"]),
        (
            "snake-case",
            "snake_case tales",
            Some("Snake Case"),
            "Manga",
            700,
            vec!["drama", "comedy"],
        ),
    ];
    for (slug, native, alt, kind, created_at, genres) in extra {
        let mut title = new_title(slug, native, alt, kind);
        title.genres = genres.into_iter().map(str::to_string).collect();
        storage.insert_title(title, created_at).await.unwrap();
    }

    let all = storage.list_titles(&CatalogQuery::default()).await.unwrap();
    let mut titles = Vec::new();
    for summary in &all {
        let details = storage.get_title(&summary.slug).await.unwrap().unwrap();
        titles.push(details.title);
    }

    let searches = [
        "one", "ONE", "pIeCe", "ōkami", "Ōkami", "den", "ليفلينج", "%", "100%", "_", "e_c", "%_",
    ];
    let mut queries: Vec<CatalogQuery> = searches
        .iter()
        .map(|s| query(None, Some(*s), None))
        .collect();
    queries.push(CatalogQuery {
        genre: Some("drama".to_string()),
        ..CatalogQuery::default()
    });
    queries.push(CatalogQuery {
        search: Some("case".to_string()),
        kind: Some("Manga".to_string()),
        genre: Some("comedy".to_string()),
        ..CatalogQuery::default()
    });
    queries.push(query(None, Some("o"), Some("Manhwa")));

    for q in queries {
        let expected: Vec<&str> = titles
            .iter()
            .filter(|t| q.matches(t))
            .map(|t| t.slug.as_str())
            .collect();
        let listed = storage.list_titles(&q).await.unwrap();
        assert_eq!(slugs(&listed), expected, "query {q:?}");
    }
}

async fn file_backed(dir: &tempfile::TempDir) -> Storage {
    let path = dir.path().to_str().expect("utf-8 temp path");
    Storage::new(path, 8).await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_creates_yield_one_title_and_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let storage = file_backed(&dir).await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let storage = storage.clone();
            tokio::spawn(async move {
                storage
                    .create_title(new_title("dup", "Dup", None, "Manga"))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(Some(_)) => created += 1,
            Ok(None) => conflicts += 1,
            Err(e) => panic!("store error on concurrent create: {e:?}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let storage = file_backed(&dir).await;
    storage
        .create_title(new_title("busy", "Busy", None, "Manga"))
        .await
        .unwrap();

    // Same chapter number from every task, then distinct chapters.
    let same: Vec<_> = (0..16)
        .map(|i| {
            let storage = storage.clone();
            tokio::spawn(async move {
                let page = format!("same-{i}");
                storage
                    .ingest_chapter("busy", chapter(1.0, i, &[page.as_str()]))
                    .await
            })
        })
        .collect();
    for handle in same {
        assert!(handle.await.unwrap().unwrap().is_some());
    }

    let distinct: Vec<_> = (2..22)
        .map(|n| {
            let storage = storage.clone();
            tokio::spawn(async move {
                storage
                    .ingest_chapter("busy", chapter(n as f64, n, &["p1", "p2"]))
                    .await
            })
        })
        .collect();
    let readers: Vec<_> = (0..8)
        .map(|_| {
            let storage = storage.clone();
            tokio::spawn(async move { storage.get_title("busy").await })
        })
        .collect();

    for handle in distinct {
        assert!(handle.await.unwrap().unwrap().is_some());
    }
    for handle in readers {
        assert!(handle.await.unwrap().unwrap().is_some());
    }

    let details = storage.get_title("busy").await.unwrap().unwrap();
    assert_eq!(details.chapters.len(), 21);

    let first = storage.get_chapter_content("busy", 1.0).await.unwrap().unwrap();
    assert_eq!(first.pages.len(), 1);
}
