use chrono::{Duration, Utc};
use sqlx::any::AnyPoolOptions;

use super::Database;
use crate::error::ApiError;
use crate::token;

/// In-memory store for tests. A single connection, since every `:memory:`
/// connection is its own database.
async fn test_db() -> Database {
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let db = Database { pool };
    db.migrate().await.unwrap();
    db
}

async fn count_rows(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&db.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn add_then_get_round_trips() {
    let db = test_db().await;

    let paste = db.add_paste("hello world", true, None, 4).await.unwrap();
    assert_eq!(paste.token.len(), 4);

    let loaded = db.get_paste_by_token(&paste.token).await.unwrap();
    assert_eq!(loaded.id, paste.id);
    assert_eq!(loaded.document, "hello world");
    assert!(loaded.public);
    assert!(loaded.deleted_at.is_none());
}

#[tokio::test]
async fn anonymous_paste_is_always_public() {
    let db = test_db().await;
    let paste = db.add_paste("secret?", false, None, 4).await.unwrap();
    assert!(paste.public);
}

#[tokio::test]
async fn owned_paste_can_be_private() {
    let db = test_db().await;
    let owner = db.signup("alice", "pw").await.unwrap();
    let paste = db
        .add_paste("mine", false, Some(owner.id), 4)
        .await
        .unwrap();
    assert!(!paste.public);
    assert_eq!(paste.owner_id, Some(owner.id));
}

#[tokio::test]
async fn soft_delete_hides_but_retains_the_row() {
    let db = test_db().await;
    let paste = db.add_paste("doomed", true, None, 4).await.unwrap();

    db.soft_delete_paste(paste.id).await.unwrap();

    assert!(matches!(
        db.get_paste_by_id(paste.id).await,
        Err(ApiError::NotFound)
    ));
    assert!(matches!(
        db.get_paste_by_token(&paste.token).await,
        Err(ApiError::NotFound)
    ));
    // physically still there
    assert_eq!(count_rows(&db, "paste").await, 1);

    // a second delete is NotFound, not a double delete
    assert!(matches!(
        db.soft_delete_paste(paste.id).await,
        Err(ApiError::NotFound)
    ));
}

#[tokio::test]
async fn visibility_policy() {
    let db = test_db().await;
    let alice = db.signup("alice", "pw").await.unwrap();
    let bob = db.signup("bob", "pw").await.unwrap();

    let private = db
        .add_paste("alice only", false, Some(alice.id), 4)
        .await
        .unwrap();

    assert!(!private.readable_by(None));
    assert!(!private.readable_by(Some(bob.id)));
    assert!(private.readable_by(Some(alice.id)));

    assert!(!private.owned_by(Some(bob.id)));
    assert!(private.owned_by(Some(alice.id)));

    // anonymous pastes are never writable, even by accident
    let anon = db.add_paste("anyone", true, None, 4).await.unwrap();
    assert!(!anon.owned_by(Some(alice.id)));
}

#[tokio::test]
async fn update_visibility_is_idempotent_and_bumps_updated_at() {
    let db = test_db().await;
    let owner = db.signup("alice", "pw").await.unwrap();
    let paste = db
        .add_paste("flip", false, Some(owner.id), 4)
        .await
        .unwrap();
    assert!(!paste.public);

    db.update_paste_visibility(paste.id, true).await.unwrap();
    let first = db.get_paste_by_id(paste.id).await.unwrap();
    assert!(first.public);
    assert!(first.updated_at > paste.updated_at);

    db.update_paste_visibility(paste.id, true).await.unwrap();
    let second = db.get_paste_by_id(paste.id).await.unwrap();
    assert!(second.public);
    assert!(second.updated_at > first.updated_at);
}

#[tokio::test]
async fn update_document_replaces_content() {
    let db = test_db().await;
    let paste = db.add_paste("v1", true, None, 4).await.unwrap();

    db.update_paste_document(paste.id, "v2").await.unwrap();
    let loaded = db.get_paste_by_id(paste.id).await.unwrap();
    assert_eq!(loaded.document, "v2");
    assert!(loaded.updated_at > paste.updated_at);

    assert!(matches!(
        db.update_paste_document(paste.id + 1000, "v3").await,
        Err(ApiError::NotFound)
    ));
}

#[tokio::test]
async fn list_by_owner_orders_and_limits() {
    let db = test_db().await;
    let owner = db.signup("alice", "pw").await.unwrap();

    let a = db.add_paste("a", true, Some(owner.id), 4).await.unwrap();
    let b = db.add_paste("b", true, Some(owner.id), 4).await.unwrap();
    let c = db.add_paste("c", true, Some(owner.id), 4).await.unwrap();
    db.add_paste("not mine", true, None, 4).await.unwrap();

    // touching `a` moves it to the front
    db.update_paste_document(a.id, "a2").await.unwrap();

    let listed = db.list_pastes_by_owner(owner.id, 10).await.unwrap();
    let ids: Vec<i64> = listed.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![a.id, c.id, b.id]);

    let limited = db.list_pastes_by_owner(owner.id, 2).await.unwrap();
    assert_eq!(limited.len(), 2);

    db.soft_delete_paste(c.id).await.unwrap();
    let after_delete = db.list_pastes_by_owner(owner.id, 10).await.unwrap();
    assert!(after_delete.iter().all(|p| p.id != c.id));
}

#[tokio::test]
async fn token_space_exhaustion() {
    let db = test_db().await;

    // occupy the entire length-1 token space
    let now = Utc::now();
    for &c in token::CHARACTERS {
        sqlx::query(
            "INSERT INTO paste (token, public, document, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind((c as char).to_string())
        .bind(true)
        .bind("filler")
        .bind(now)
        .bind(now)
        .execute(&db.pool)
        .await
        .unwrap();
    }

    assert!(matches!(
        db.add_paste("no room", true, None, 1).await,
        Err(ApiError::IdExhaustion)
    ));

    // soft-deleted rows release their tokens for reallocation
    sqlx::query("UPDATE paste SET deleted_at = ?")
        .bind(Utc::now())
        .execute(&db.pool)
        .await
        .unwrap();
    let paste = db.add_paste("room again", true, None, 1).await.unwrap();
    assert_eq!(paste.token.len(), 1);
}

#[tokio::test]
async fn lazy_signup_creates_once() {
    let db = test_db().await;

    let created = db.get_auth("alice", "pw1").await.unwrap();
    assert_eq!(created.account_id, "alice");

    // same credentials resolve to the same account
    let again = db.get_auth("alice", "pw1").await.unwrap();
    assert_eq!(again.id, created.id);

    // wrong password fails closed and creates nothing
    assert!(matches!(
        db.get_auth("alice", "pw2").await,
        Err(ApiError::InvalidCredentials)
    ));
    assert_eq!(count_rows(&db, "account").await, 1);
}

#[tokio::test]
async fn signup_conflict_on_duplicate_handle() {
    let db = test_db().await;
    db.signup("alice", "pw").await.unwrap();
    assert!(matches!(
        db.signup("alice", "other").await,
        Err(ApiError::AccountConflict)
    ));
}

#[tokio::test]
async fn signin_fails_closed() {
    let db = test_db().await;
    assert!(matches!(
        db.signin("nobody", "pw").await,
        Err(ApiError::NotFound)
    ));

    db.signup("alice", "pw").await.unwrap();
    assert!(matches!(
        db.signin("alice", "wrong").await,
        Err(ApiError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn purge_respects_the_retention_window() {
    let db = test_db().await;
    let old = db.add_paste("old", true, None, 4).await.unwrap();
    let recent = db.add_paste("recent", true, None, 4).await.unwrap();

    db.soft_delete_paste(old.id).await.unwrap();
    db.soft_delete_paste(recent.id).await.unwrap();

    // age the first deletion beyond the window
    sqlx::query("UPDATE paste SET deleted_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::seconds(7200))
        .bind(old.id)
        .execute(&db.pool)
        .await
        .unwrap();

    let purged = db.purge_deleted_pastes(3600).await.unwrap();
    assert_eq!(purged, 1);
    assert_eq!(count_rows(&db, "paste").await, 1);
}
