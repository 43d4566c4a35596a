mod common;

use common::{page, Script};
use notion_df::api::{RetrievePage, UpdatePage};
use notion_df::backup::BackupDir;
use notion_df::core::Snapshot;
use notion_df::model::{PageAttrs, PropertyValue};
use notion_df::{Entity, NotionId, PageKind, Span};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_every_id_form_yields_the_same_entity() {
    let client = Script::new().client();
    let dashed = common::id(7);
    let undashed = dashed.replace('-', "");
    let url = format!("https://www.notion.so/workspace/Reading-List-{}?pvs=4", undashed);

    let a = client.get_or_create::<PageKind>(&dashed).unwrap();
    let b = client.get_or_create::<PageKind>(&undashed).unwrap();
    let c = client.get_or_create::<PageKind>(&url).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &c));
    assert_eq!(client.identity_map().len(), 1);
    assert!(client.get_or_create::<PageKind>("no id here").is_err());
}

#[test]
fn test_execute_stores_the_snapshot_as_latest() {
    let script = Script::new().reply(200, page(0, "Reading"));
    let client = script.client();
    let entity = client.get_or_create::<PageKind>(&common::id(0)).unwrap();
    assert!(entity.latest().is_none());

    let returned = client.execute(&RetrievePage::new(entity.id())).unwrap();
    let latest = entity.latest().unwrap();
    assert!(Arc::ptr_eq(returned.snapshot(), &latest));
    assert!(Arc::ptr_eq(returned.entity(), &entity));

    // held snapshots answer data() without another call
    assert_eq!(entity.data(&client).unwrap().attrs().title().as_deref(), Some("Reading"));
    assert_eq!(script.calls(), 1);
}

#[test]
fn test_data_fetches_lazily() {
    let id = common::id(3);
    let script = Script::new().route(format!("pages/{}", id), 200, page(3, "Lazy"));
    let client = script.client();
    let entity = client.get_or_create::<PageKind>(&id).unwrap();
    assert_eq!(script.calls(), 0);
    assert_eq!(entity.data(&client).unwrap().attrs().title().as_deref(), Some("Lazy"));
    assert_eq!(entity.data(&client).unwrap().attrs().title().as_deref(), Some("Lazy"));
    assert_eq!(script.calls(), 1);
}

#[test]
fn test_stale_snapshot_is_dropped() {
    let client = Script::new().client();
    let entity: Arc<Entity<PageKind>> = client.get_or_create(&common::id(0)).unwrap();

    let older = Arc::new(Snapshot::<PageKind>::from_json(&page(0, "older")).unwrap());
    let newer = Arc::new(Snapshot::<PageKind>::from_json(&page(0, "newer")).unwrap());
    assert!(newer.timestamp() > older.timestamp());

    assert!(entity.set_latest(Arc::clone(&newer)));
    assert!(!entity.set_latest(older));
    assert_eq!(entity.latest().unwrap().attrs().title().as_deref(), Some("newer"));
}

#[test]
fn test_update_response_is_coalesced_with_restored_preview() {
    let dir = std::env::temp_dir().join(format!("notion-df-it-{}", uuid::Uuid::new_v4()));
    let backup = BackupDir::open(&dir).unwrap();
    let id = NotionId::parse(&common::id(0)).unwrap();
    backup
        .save(&Snapshot::<PageKind>::from_json(&page(0, "Backed up")).unwrap())
        .unwrap();

    // a partial answer without "url" and "properties"
    let script = Script::new().reply(200, json!({"object": "page", "id": common::id(0), "archived": true}));
    let client = script.client();
    let entity = backup
        .restore_preview::<PageKind>(client.identity_map(), id)
        .unwrap();

    let updated = client.execute(&UpdatePage::new(id).archived(true)).unwrap();
    let attrs: &PageAttrs = updated.attrs();
    assert_eq!(attrs.archived, Some(true));
    assert_eq!(attrs.title().as_deref(), Some("Backed up"));
    assert!(attrs.url.is_some());
    assert!(Arc::ptr_eq(&entity.latest().unwrap(), updated.snapshot()));
    // raw keeps the server's answer verbatim
    assert_eq!(updated.raw()["archived"], json!(true));
    assert!(updated.raw().get("url").is_none());

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_refresh_all_preserves_input_order() {
    let mut script = Script::new();
    for n in 0..8 {
        script = script.route(format!("pages/{}", common::id(n)), 200, page(n, &format!("Page {}", n)));
    }
    let client = script.client();
    let entities: Vec<_> = (0..8)
        .map(|n| client.get_or_create::<PageKind>(&common::id(n)).unwrap())
        .collect();

    let titles: Vec<String> = client
        .refresh_all(&entities)
        .into_iter()
        .map(|result| result.unwrap().attrs().title().unwrap())
        .collect();
    let expected: Vec<String> = (0..8).map(|n| format!("Page {}", n)).collect();
    assert_eq!(titles, expected);
    assert_eq!(script.calls(), 8);
    assert!(entities.iter().all(|entity| entity.latest().is_some()));
}

#[test]
fn test_executed_snapshot_is_found_without_holding_the_entity() {
    let id = common::id(4);
    let script = Script::new().route(format!("pages/{}", id), 200, page(4, "Inbox"));
    let client = script.client();

    let returned = client.execute(&RetrievePage::new(NotionId::parse(&id).unwrap())).unwrap();
    let entity = client.get_or_create::<PageKind>(&id).unwrap();
    let latest = entity.latest().unwrap();
    assert!(Arc::ptr_eq(&latest, returned.snapshot()));
    assert_eq!(entity.data(&client).unwrap().attrs().title().as_deref(), Some("Inbox"));
    assert_eq!(script.calls(), 1);
}

#[test]
fn test_listed_pages_stay_registered_while_held() {
    let script = Script::new().reply(200, common::list_page(vec![page(0, "A"), page(1, "B")], None));
    let client = script.client();
    let rows: Vec<_> = client
        .paginate(notion_df::api::QueryDatabase::new(NotionId::parse(&common::id(9)).unwrap()), None)
        .collect::<Result<_, _>>()
        .unwrap();

    for (n, title) in [(0, "A"), (1, "B")] {
        let entity = client.get_or_create::<PageKind>(&common::id(n)).unwrap();
        assert_eq!(entity.data(&client).unwrap().attrs().title().as_deref(), Some(title));
    }
    assert_eq!(script.calls(), 1);
    assert_eq!(client.identity_map().len(), 2);
    drop(rows);
    assert!(client.identity_map().is_empty());
}

#[test]
fn test_entities_are_only_kept_while_referenced() {
    let script = Script::new().reply(200, page(5, "Week 12"));
    let client = script.client();
    let builder = notion_df::api::CreatePage::new(notion_df::Parent::Workspace)
        .property("Name", PropertyValue::title(vec![Span::text("Week 12")]));

    let created = client.execute(&builder).unwrap();
    assert_eq!(
        script.requests()[0].body.as_ref().unwrap()["parent"],
        json!({"type": "workspace", "workspace": true})
    );
    let id = created.id();
    assert!(client.identity_map().get::<PageKind>(id).is_some());

    drop(created);
    assert!(client.identity_map().get::<PageKind>(id).is_none());
    assert_eq!(client.identity_map().purge(), 0);
    assert!(client.identity_map().is_empty());
}
