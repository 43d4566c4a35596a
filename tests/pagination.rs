mod common;

use common::{block, list_page, page, Script};
use notion_df::api::{QueryDatabase, RetrieveBlockChildren, Search};
use notion_df::core::Method;
use notion_df::{AppError, NotionId};
use pretty_assertions::assert_eq;
use serde_json::json;

fn database_id() -> NotionId {
    NotionId::parse("1f0b7c3e2d4a4c6b8e9fa0b1c2d3e4f5").unwrap()
}

fn pages(range: std::ops::Range<usize>) -> Vec<serde_json::Value> {
    range.map(|n| page(n, &format!("Row {}", n))).collect()
}

/// Three pages of 100, 100 and 37 rows.
fn three_page_script() -> Script {
    Script::new()
        .reply(200, list_page(pages(0..100), Some("cursor-1")))
        .reply(200, list_page(pages(100..200), Some("cursor-2")))
        .reply(200, list_page(pages(200..237), None))
}

#[test]
fn test_query_walks_every_page_in_order() {
    let script = three_page_script();
    let client = script.client();

    let rows: Vec<_> = client
        .paginate(QueryDatabase::new(database_id()), None)
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(rows.len(), 237);
    assert_eq!(script.calls(), 3);
    let titles: Vec<String> = rows
        .iter()
        .map(|row| row.attrs().title().unwrap())
        .take(3)
        .collect();
    assert_eq!(titles, vec!["Row 0", "Row 1", "Row 2"]);
    assert_eq!(rows[236].id(), NotionId::parse(&common::id(236)).unwrap());

    let bodies: Vec<_> = script
        .requests()
        .into_iter()
        .map(|request| {
            assert_eq!(request.method, Method::Post);
            assert!(request.query.is_empty());
            request.body.unwrap()
        })
        .collect();
    assert_eq!(
        bodies,
        vec![
            json!({"page_size": 100}),
            json!({"page_size": 100, "start_cursor": "cursor-1"}),
            json!({"page_size": 100, "start_cursor": "cursor-2"}),
        ]
    );
}

#[test]
fn test_limit_shrinks_last_page() {
    let script = Script::new()
        .reply(200, list_page(pages(0..100), Some("cursor-1")))
        .reply(200, list_page(pages(100..150), Some("cursor-2")));
    let client = script.client();

    let rows: Vec<_> = client
        .paginate(QueryDatabase::new(database_id()), Some(150))
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(rows.len(), 150);
    assert_eq!(script.calls(), 2);
    assert_eq!(script.requests()[1].body.as_ref().unwrap()["page_size"], json!(50));
}

#[test]
fn test_get_random_access() {
    let script = three_page_script();
    let client = script.client();
    let mut rows = client.paginate(QueryDatabase::new(database_id()), None);

    let streamed = rows.next().unwrap().unwrap();
    assert_eq!(rows.calls(), 1);
    let first = rows.get(0).unwrap();
    assert_eq!(first.id(), streamed.id());
    assert_eq!(rows.get(99).unwrap().attrs().title().as_deref(), Some("Row 99"));
    assert_eq!(rows.calls(), 1);

    let last = rows.get(-1).unwrap();
    assert_eq!(last.attrs().title().as_deref(), Some("Row 236"));
    assert_eq!(rows.calls(), 3);
    assert!(rows.is_exhausted());

    match rows.get(237) {
        Err(AppError::OutOfRange { index, len }) => assert_eq!((index, len), (237, 237)),
        other => panic!("expected OutOfRange, got {:?}", other.map(|row| row.id())),
    }
    assert!(matches!(rows.get(-238), Err(AppError::OutOfRange { .. })));
    assert_eq!(script.calls(), 3);
}

#[test]
fn test_children_cursor_goes_in_query() {
    let parent = NotionId::parse(&common::id(999)).unwrap();
    let script = Script::new()
        .reply(200, list_page(vec![block(0, "first")], Some("next")))
        .reply(200, list_page(vec![block(1, "second")], None));
    let client = script.client();

    let texts: Vec<String> = client
        .paginate(RetrieveBlockChildren::new(parent), None)
        .map(|child| child.unwrap().attrs().text().unwrap())
        .collect();
    assert_eq!(texts, vec!["first", "second"]);

    let requests = script.requests();
    assert_eq!(requests[0].method, Method::Get);
    assert_eq!(requests[0].body, None);
    assert_eq!(
        requests[1].query,
        vec![
            ("page_size".to_string(), "100".to_string()),
            ("start_cursor".to_string(), "next".to_string()),
        ]
    );
}

#[test]
fn test_empty_result_stops() {
    let script = Script::new().reply(200, list_page(vec![], None));
    let client = script.client();
    assert_eq!(client.paginate(Search::default(), None).count(), 0);
    assert_eq!(script.calls(), 1);
}

#[test]
fn test_zero_limit_makes_no_call() {
    let script = Script::new();
    let client = script.client();
    assert_eq!(client.paginate(Search::default(), Some(0)).count(), 0);
    assert_eq!(script.calls(), 0);
}

#[test]
fn test_bad_element_reports_its_index() {
    let mut broken = page(1, "broken");
    broken["properties"]["Name"]["title"] = json!("not a list");
    let script = Script::new().reply(200, list_page(vec![page(0, "ok"), broken], None));
    let client = script.client();

    let err = client
        .paginate(QueryDatabase::new(database_id()), None)
        .collect::<Result<Vec<_>, _>>()
        .unwrap_err();
    let err = match err {
        AppError::Serialization(inner) => inner,
        other => panic!("expected a serialization error, got {other}"),
    };
    assert!(err.path_string().starts_with("results[1].properties.Name"));
}
