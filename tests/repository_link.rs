//! PostgreSQL repository tests. `#[sqlx::test]` creates a scratch database per
//! test and applies `./migrations`; run with `cargo test -- --ignored`.

use sqlx::PgPool;
use std::sync::Arc;

use link_relay::domain::entities::NewShortUrl;
use link_relay::domain::repositories::{LinkRepository, RepositoryError};
use link_relay::infrastructure::persistence::PgLinkRepository;

fn new_url(code: &str, url: &str) -> NewShortUrl {
    NewShortUrl {
        short_code: code.to_string(),
        original_url: url.to_string(),
        owner_id: None,
    }
}

#[sqlx::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_create_link(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    let record = repo
        .create(NewShortUrl {
            owner_id: Some("alice".to_string()),
            ..new_url("abc123", "https://example.com")
        })
        .await
        .unwrap();

    assert_eq!(record.short_code, "abc123");
    assert_eq!(record.original_url, "https://example.com");
    assert_eq!(record.access_count, 0);
    assert_eq!(record.owner_id.as_deref(), Some("alice"));
    assert_eq!(record.created_at, record.updated_at);
}

#[sqlx::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_create_duplicate_code(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    repo.create(new_url("dup001", "https://a.example")).await.unwrap();
    let result = repo.create(new_url("dup001", "https://b.example")).await;

    assert!(matches!(result, Err(RepositoryError::DuplicateCode)));
    let kept = repo.find_by_code("dup001").await.unwrap().unwrap();
    assert_eq!(kept.original_url, "https://a.example");
}

#[sqlx::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_find_by_code(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));
    repo.create(new_url("find01", "https://example.com")).await.unwrap();

    let found = repo.find_by_code("find01").await.unwrap();
    assert_eq!(found.unwrap().original_url, "https://example.com");

    assert!(repo.find_by_code("absent").await.unwrap().is_none());
}

#[sqlx::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_update_url_keeps_count(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));
    let created = repo.create(new_url("upd001", "https://old.example")).await.unwrap();
    repo.increment_access_count("upd001").await.unwrap();

    let updated = repo.update_url("upd001", "https://new.example").await.unwrap();

    assert_eq!(updated.original_url, "https://new.example");
    assert_eq!(updated.access_count, 1);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);
}

#[sqlx::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_update_missing(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    let result = repo.update_url("nope01", "https://example.com").await;

    assert!(matches!(result, Err(RepositoryError::NotFound)));
}

#[sqlx::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_delete(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));
    repo.create(new_url("del001", "https://example.com")).await.unwrap();

    repo.delete_by_code("del001").await.unwrap();

    assert!(repo.find_by_code("del001").await.unwrap().is_none());
    assert!(matches!(
        repo.delete_by_code("del001").await,
        Err(RepositoryError::NotFound)
    ));
}

#[sqlx::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_increments_are_not_lost(pool: PgPool) {
    let repo = Arc::new(PgLinkRepository::new(Arc::new(pool)));
    let created = repo.create(new_url("inc001", "https://example.com")).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let repo = repo.clone();
        tasks.push(tokio::spawn(async move {
            repo.increment_access_count("inc001").await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let record = repo.find_by_code("inc001").await.unwrap().unwrap();
    assert_eq!(record.access_count, 20);
    assert_eq!(record.updated_at, created.updated_at);
}

#[sqlx::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_increment_missing(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    let result = repo.increment_access_count("nope01").await;

    assert!(matches!(result, Err(RepositoryError::NotFound)));
}

#[sqlx::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_ping(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    assert!(repo.ping().await.is_ok());
}
