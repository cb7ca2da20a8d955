use storage::repository::{KeyValueStore, Storage, put_json, take_json};
use storage::sqlite::SqliteRepository;

async fn repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_put_replaces_and_get_reads_back() {
    let repo = repo("memdb_kv_put").await;

    repo.put("study_MTH101_2019", r#"{"timestamp":1}"#).await.unwrap();
    repo.put("study_MTH101_2019", r#"{"timestamp":2}"#).await.unwrap();

    let value = repo.get("study_MTH101_2019").await.unwrap();
    assert_eq!(value.as_deref(), Some(r#"{"timestamp":2}"#));
    assert_eq!(repo.get("missing").await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_take_consumes_once() {
    let repo = repo("memdb_kv_take").await;
    repo.put("exam_handoff", "{}").await.unwrap();

    assert_eq!(repo.take("exam_handoff").await.unwrap().as_deref(), Some("{}"));
    assert_eq!(repo.take("exam_handoff").await.unwrap(), None);
    assert_eq!(repo.get("exam_handoff").await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_remove_reports_presence() {
    let repo = repo("memdb_kv_remove").await;
    repo.put("k", "v").await.unwrap();

    assert!(repo.remove("k").await.unwrap());
    assert!(!repo.remove("k").await.unwrap());
}

#[tokio::test]
async fn sqlite_prefix_listing_is_case_sensitive_and_literal() {
    let repo = repo("memdb_kv_prefix").await;
    for key in ["study_a", "STUDY_b", "studyXc", "mock_a", "study_b"] {
        repo.put(key, "").await.unwrap();
    }

    let keys = repo.keys_with_prefix("study_").await.unwrap();
    assert_eq!(keys, vec!["study_a".to_owned(), "study_b".to_owned()]);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = repo("memdb_kv_migrate").await;
    repo.migrate().await.expect("second migrate");
    repo.put("k", "v").await.unwrap();
    assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn storage_handle_uses_json_helpers() {
    let storage = Storage::sqlite("sqlite:file:memdb_kv_storage?mode=memory&cache=shared")
        .await
        .expect("storage");

    put_json(storage.kv.as_ref(), "answers", &vec![2_u32, 1, 4])
        .await
        .unwrap();
    let back: Option<Vec<u32>> = take_json(storage.kv.as_ref(), "answers").await.unwrap();
    assert_eq!(back, Some(vec![2, 1, 4]));
}
