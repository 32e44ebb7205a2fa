use core_store::{
    DayRange, EventUpdate, Identity, JsonFileStore, NewCategory, NewEvent, RemoteStore, StoreError,
};

fn who() -> Identity {
    Identity::new("u1").unwrap()
}

async fn seeded(path: &std::path::Path) -> (JsonFileStore, String) {
    let store = JsonFileStore::open(path).await.unwrap();
    store.ensure_user(&who()).await.unwrap();
    let cat = store
        .insert_category(
            &who(),
            NewCategory {
                name: "work".into(),
                color: "teal".into(),
            },
        )
        .await
        .unwrap();
    (store, cat.id)
}

#[tokio::test]
async fn writes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store.json");
    let (store, category_id) = seeded(&path).await;
    let event = store
        .insert_event(
            &who(),
            NewEvent {
                category_id: category_id.clone(),
                title: "Offsite".into(),
                start_date: "2026-02-05".into(),
                end_date: "2026-02-08".into(),
                description: None,
            },
        )
        .await
        .unwrap();
    store
        .update_event(
            &who(),
            &event.id,
            EventUpdate {
                title: Some("Retreat".into()),
                ..EventUpdate::default()
            },
        )
        .await
        .unwrap();
    drop(store);

    let reopened = JsonFileStore::open(&path).await.unwrap();
    let events = reopened
        .list_events(&who(), DayRange::year(2026).unwrap())
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Retreat");
    assert_eq!(events[0].category_id, category_id);
    assert!(reopened.ensure_user(&who()).await.unwrap_err().is_duplicate());
}

#[tokio::test]
async fn rejected_write_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let (store, _) = seeded(&path).await;
    let before = std::fs::read_to_string(&path).unwrap();

    let err = store.delete_event(&who(), "missing").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { table: "events", .. }));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn deleting_a_category_keeps_its_events() {
    let dir = tempfile::tempdir().unwrap();
    let (store, category_id) = seeded(&dir.path().join("store.json")).await;
    store
        .insert_event(
            &who(),
            NewEvent {
                category_id: category_id.clone(),
                title: "Standup".into(),
                start_date: "2026-03-02".into(),
                end_date: "2026-03-02".into(),
                description: Some("daily".into()),
            },
        )
        .await
        .unwrap();
    store.delete_category(&who(), &category_id).await.unwrap();

    assert!(store.list_categories(&who()).await.unwrap().is_empty());
    let events = store
        .list_events(&who(), DayRange::year(2026).unwrap())
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn corrupt_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = JsonFileStore::open(&path).await.unwrap_err();
    assert!(matches!(err, StoreError::Serde(_)));
}
