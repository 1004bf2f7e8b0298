//! `PgStore` against a live PostgreSQL database.
//!
//! Run with `TEST_DATABASE_URL=postgres://... cargo test --test pg_store_tests -- --ignored`.
//! Every test signs up its own users and deletes them again.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use chrono::NaiveDate;
use deadpool_diesel::postgres::{Manager, Pool};
use pretty_assertions::assert_eq;
use todo_back::{
    error::StoreError,
    models::{CategoryChanges, NewCategory, NewTodo, NewUser, Priority, TodoChanges, User},
    store::{PgStore, Store},
};
use tokio::sync::Mutex;

static MIGRATED: Mutex<bool> = Mutex::const_new(false);
static NEXT_USER: AtomicUsize = AtomicUsize::new(0);

async fn store() -> PgStore {
    dotenvy::dotenv().ok();
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let manager = Manager::new(url, deadpool_diesel::Runtime::Tokio1);
    let store = PgStore::new(Pool::builder(manager).max_size(2).build().unwrap());

    let mut migrated = MIGRATED.lock().await;
    if !*migrated {
        store.migrate().await.unwrap();
        *migrated = true;
    }
    store
}

async fn user(store: &PgStore, name: &str) -> User {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let n = NEXT_USER.fetch_add(1, Ordering::Relaxed);
    store
        .create_user(NewUser {
            username: format!("{name}-{nanos}-{n}"),
            email: String::new(),
            password_hash: "$argon2id$unused".into(),
        })
        .await
        .unwrap()
}

async fn category(store: &PgStore, user_id: i32, name: &str) -> i32 {
    store
        .insert_category(NewCategory { name: name.into(), color: "#00ff00".into(), user_id })
        .await
        .unwrap()
        .id
}

fn todo(user_id: i32, category_id: Option<i32>) -> NewTodo {
    NewTodo {
        title: "file taxes".into(),
        description: String::new(),
        completed: false,
        priority: Priority::default(),
        due_date: NaiveDate::from_ymd_opt(2025, 4, 15).unwrap(),
        category_id,
        user_id,
    }
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database in TEST_DATABASE_URL"]
async fn migrations_are_idempotent() {
    let store = store().await;
    assert_eq!(store.migrate().await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database in TEST_DATABASE_URL"]
async fn database_assigns_defaults() {
    let store = store().await;
    let ann = user(&store, "ann").await;

    let saved = store.insert_todo(todo(ann.id, None)).await.unwrap();

    assert_eq!(saved.priority, Priority::Medium);
    assert_eq!(saved.user_id, ann.id);
    assert!(saved.created_at <= chrono::Utc::now());

    store.delete_user(ann.id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database in TEST_DATABASE_URL"]
async fn deleting_a_category_nulls_todo_references() {
    let store = store().await;
    let ann = user(&store, "ann").await;
    let work = category(&store, ann.id, "Work").await;
    let saved = store.insert_todo(todo(ann.id, Some(work))).await.unwrap();

    assert!(store.delete_category(ann.id, work).await.unwrap());

    let reloaded = store.get_todo(ann.id, saved.id).await.unwrap().unwrap();
    assert_eq!(reloaded.category_id, None);
    assert_eq!(reloaded.title, saved.title);

    store.delete_user(ann.id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database in TEST_DATABASE_URL"]
async fn deleting_a_user_cascades_to_owned_records() {
    let store = store().await;
    let ann = user(&store, "ann").await;
    let bob = user(&store, "bob").await;
    let work = category(&store, ann.id, "Work").await;
    store.insert_todo(todo(ann.id, Some(work))).await.unwrap();
    let bobs = store.insert_todo(todo(bob.id, Some(work))).await.unwrap();

    assert!(store.delete_user(ann.id).await.unwrap());

    assert!(store.find_user(ann.id).await.unwrap().is_none());
    assert!(store.list_categories(ann.id).await.unwrap().is_empty());
    assert!(store.list_todos(ann.id).await.unwrap().is_empty());

    let reloaded = store.get_todo(bob.id, bobs.id).await.unwrap().unwrap();
    assert_eq!(reloaded.category_id, None);

    assert!(!store.delete_user(ann.id).await.unwrap());
    store.delete_user(bob.id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database in TEST_DATABASE_URL"]
async fn duplicate_username_is_taken() {
    let store = store().await;
    let ann = user(&store, "ann").await;

    let err = store
        .create_user(NewUser {
            username: ann.username.clone(),
            email: String::new(),
            password_hash: "$argon2id$unused".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::UsernameTaken(name) if name == ann.username));
    store.delete_user(ann.id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database in TEST_DATABASE_URL"]
async fn unknown_category_is_reported_on_insert_and_update() {
    let store = store().await;
    let ann = user(&store, "ann").await;
    let saved = store.insert_todo(todo(ann.id, None)).await.unwrap();

    let err = store.insert_todo(todo(ann.id, Some(i32::MAX))).await.unwrap_err();
    assert!(matches!(err, StoreError::UnknownCategory(i32::MAX)));

    let changes = TodoChanges { category_id: Some(Some(i32::MAX)), ..Default::default() };
    let err = store.update_todo(ann.id, saved.id, changes).await.unwrap_err();
    assert!(matches!(err, StoreError::UnknownCategory(i32::MAX)));

    store.delete_user(ann.id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database in TEST_DATABASE_URL"]
async fn missing_owner_is_not_an_unknown_category() {
    let store = store().await;
    let ann = user(&store, "ann").await;
    let work = category(&store, ann.id, "Work").await;

    let err = store.insert_todo(todo(i32::MAX, Some(work))).await.unwrap_err();

    assert!(matches!(err, StoreError::Query(_)), "got {err:?}");
    store.delete_user(ann.id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database in TEST_DATABASE_URL"]
async fn records_are_scoped_to_their_owner() {
    let store = store().await;
    let ann = user(&store, "ann").await;
    let bob = user(&store, "bob").await;
    let work = category(&store, ann.id, "Work").await;
    let home = category(&store, ann.id, "Home").await;

    assert!(store.get_category(bob.id, work).await.unwrap().is_none());
    assert!(store
        .update_category(bob.id, work, CategoryChanges { name: Some("Mine".into()), color: None })
        .await
        .unwrap()
        .is_none());
    assert!(!store.delete_category(bob.id, work).await.unwrap());

    let ids: Vec<i32> = store
        .list_categories(ann.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec![work, home]);

    let unchanged = store
        .update_category(ann.id, work, CategoryChanges::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.name, "Work");

    store.delete_user(ann.id).await.unwrap();
    store.delete_user(bob.id).await.unwrap();
}
