//! Integration tests for the base service
//!
//! The service builds entities from payloads before creating them and edits
//! by loading, merging and saving.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::{NoteService, pool, repository};
use crudbase::{Actor, Criteria, FieldMap, FindOptions, ListOptions, SqlValue};

async fn service() -> NoteService {
    let pool = pool().await;
    NoteService::new(Arc::new(repository(&pool)))
}

#[tokio::test]
async fn test_create_single_from_payload() {
    let service = service().await;

    let payload = FieldMap::new()
        .with("title", " Shopping  list ")
        .with("body", "milk")
        .with("tags", serde_json::json!(["home"]));
    let created = service.create_single(payload, &Actor::from(5i64)).await.unwrap();

    assert_eq!(created.title, "Shopping list");
    assert_eq!(created.body.as_deref(), Some("milk"));
    assert_eq!(created.tags, vec!["home"]);
    assert_eq!(created.base.creator.as_deref(), Some("5"));
}

#[tokio::test]
async fn test_create_multiple() {
    let service = service().await;

    let created = service
        .create_multiple(
            vec![
                FieldMap::new().with("title", "one"),
                FieldMap::new().with("title", "two"),
            ],
            &Actor::System,
        )
        .await
        .unwrap();

    assert_eq!(created.len(), 2);
    assert_eq!(service.list(ListOptions::new()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_edit_merges_payload_onto_loaded_record() {
    let service = service().await;

    let created = service
        .create_single(
            FieldMap::new().with("title", "Draft").with("body", "keep me"),
            &Actor::from("author"),
        )
        .await
        .unwrap();
    let id = created.base.id.clone().unwrap();

    let edited = service
        .edit(
            FindOptions::by_id(&id),
            FieldMap::new().with("title", "Final"),
            &Actor::from("editor"),
        )
        .await
        .unwrap()
        .expect("record exists");

    assert_eq!(edited.title, "Final");
    assert_eq!(edited.body.as_deref(), Some("keep me"));
    assert_eq!(edited.base.creator.as_deref(), Some("author"));
    assert_eq!(edited.base.updater.as_deref(), Some("editor"));
    assert_eq!(edited.base.created_at, created.base.created_at);
}

#[tokio::test]
async fn test_edit_can_clear_a_field() {
    let service = service().await;

    let created = service
        .create_single(
            FieldMap::new().with("title", "t").with("body", "b"),
            &Actor::System,
        )
        .await
        .unwrap();
    let id = created.base.id.unwrap();

    let edited = service
        .edit(
            FindOptions::by_id(&id),
            FieldMap::new().with("body", SqlValue::Null),
            &Actor::System,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(edited.body, None);
}

#[tokio::test]
async fn test_edit_missing_record_is_none() {
    let service = service().await;

    let result = service
        .edit(
            FindOptions::by_id("missing"),
            FieldMap::new().with("title", "x"),
            &Actor::System,
        )
        .await
        .unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
async fn test_pass_throughs() {
    let service = service().await;

    let created = service
        .create_single(FieldMap::new().with("title", "note"), &Actor::System)
        .await
        .unwrap();
    let id = created.base.id.unwrap();

    assert!(service.set_status(&Criteria::id(&id), 0, &Actor::System).await.unwrap());
    assert_eq!(
        service.detail(FindOptions::by_id(&id)).await.unwrap().map(|n| n.base.status),
        Some(0)
    );

    let page = service.list_with_paging(ListOptions::new()).await.unwrap();
    assert_eq!(page.total_count(), 1);

    assert!(service.remove(&Criteria::id(&id), &Actor::System).await.unwrap());
    assert_eq!(service.detail(FindOptions::by_id(&id)).await.unwrap(), None);
    assert_eq!(service.repository().searchable_fields(), ["title", "body"]);
}
