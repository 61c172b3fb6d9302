mod common;

use cf_client::uaa::groups::Group;
use cf_client::{LimiterMapping, PathSelector};
use cf_stub_server::{Interaction, StubResponse};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

fn groups_limit(limit: i64) -> LimiterMapping {
    LimiterMapping::builder()
        .name("test")
        .time_base(1)
        .limit(limit)
        .path_selector(PathSelector::starts_with("/Groups"))
        .build()
        .unwrap()
}

fn group(id: &str) -> Interaction {
    Interaction::get(
        &format!("/Groups/{id}"),
        StubResponse::json(
            200,
            json!({
                "id": id,
                "displayName": format!("group-{id}"),
                "zoneId": "uaa",
                "members": [],
                "schemas": ["urn:scim:schemas:core:1.0"],
                "meta": { "version": 0 }
            }),
        ),
    )
}

#[tokio::test]
async fn test_third_request_in_window_is_delayed() {
    let stub = common::stub(vec![
        group("a"),
        group("b"),
        group("c"),
    ])
    .await;
    let uaa = common::uaa(&stub, vec![groups_limit(2)]);

    let start = Instant::now();
    let requests = ["a", "b", "c"].into_iter().zip([0u64, 100, 300]).map(|(id, offset)| {
        let groups = uaa.groups();
        async move {
            tokio::time::sleep(Duration::from_millis(offset)).await;
            groups.get(id).await
        }
    });
    let results: Vec<Group> = futures::future::try_join_all(requests).await.unwrap();

    assert_eq!(
        results.iter().map(|group| group.id.as_str()).collect::<Vec<_>>(),
        ["a", "b", "c"]
    );
    let throttle = uaa.context().throttle();
    assert!(throttle.delay_count() >= 1);
    // The third call waits for the first permit to expire
    assert!(start.elapsed() >= Duration::from_millis(900));

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(throttle.verify_all_queues_empty());
}

#[tokio::test]
async fn test_spread_out_requests_are_not_delayed() {
    let stub = common::stub(vec![
        group("a"),
        group("b"),
        group("c"),
    ])
    .await;
    let uaa = common::uaa(&stub, vec![groups_limit(2)]);

    let requests = ["a", "b", "c"].into_iter().zip([0u64, 100, 1500]).map(|(id, offset)| {
        let groups = uaa.groups();
        async move {
            tokio::time::sleep(Duration::from_millis(offset)).await;
            groups.get(id).await
        }
    });
    futures::future::try_join_all(requests).await.unwrap();

    assert_eq!(uaa.context().throttle().delay_count(), 0);
}

#[tokio::test]
async fn test_client_stays_under_server_rate_limit() {
    let ids = ["a", "b", "c", "d", "e", "f", "g", "h"];
    let stub = common::limited_stub(
        ids.iter().map(|id| group(id)).collect(),
        vec![groups_limit(2)],
    )
    .await;
    let uaa = common::uaa(&stub, vec![groups_limit(2)]);

    let requests = ids.into_iter().enumerate().map(|(index, id)| {
        let groups = uaa.groups();
        async move {
            tokio::time::sleep(Duration::from_millis(index as u64 * 50)).await;
            groups.get(id).await
        }
    });
    let results = futures::future::join_all(requests).await;

    let rejected: Vec<_> = results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .filter(|error| error.status() == Some(429))
        .collect();
    assert!(rejected.is_empty(), "rejected by the server: {rejected:?}");
    assert!(results.iter().all(Result::is_ok));
    assert!(uaa.context().throttle().delay_count() >= 1);
    assert_eq!(stub.metrics().rejected_requests.load(Ordering::Relaxed), 0);
    assert_eq!(stub.metrics().matched_requests.load(Ordering::Relaxed), 8);
}

#[tokio::test]
async fn test_unlimited_mapping_never_delays() {
    let stub = common::stub(vec![group("a")]).await;
    let uaa = common::uaa(&stub, vec![groups_limit(-1)]);

    for _ in 0..10 {
        uaa.groups().get("a").await.unwrap();
    }
    assert_eq!(uaa.context().throttle().delay_count(), 0);
    assert!(!uaa.context().throttle().check_delay_needed_and_resume("/Groups/a"));
}

#[tokio::test]
async fn test_unmatched_paths_pass_through() {
    let stub = common::stub(vec![Interaction::get(
        "/token_key",
        StubResponse::json(200, json!({ "kid": "key-1", "alg": "RS256", "value": "pem" })),
    )])
    .await;
    let uaa = common::uaa(&stub, vec![groups_limit(1)]);

    for _ in 0..5 {
        let key = uaa.tokens().get_key().await.unwrap();
        assert_eq!(key.kid.as_deref(), Some("key-1"));
    }
    assert_eq!(uaa.context().throttle().delay_count(), 0);
}

#[tokio::test]
async fn test_contexts_throttle_independently() {
    let stub = common::stub(vec![group("a")]).await;
    let first = common::uaa(&stub, vec![groups_limit(1)]);
    let second = common::uaa(&stub, vec![groups_limit(1)]);

    first.groups().get("a").await.unwrap();
    second.groups().get("a").await.unwrap();

    assert_eq!(first.context().throttle().delay_count(), 0);
    assert_eq!(second.context().throttle().delay_count(), 0);
    assert!(first.context().throttle().check_delay_needed_and_resume("/Groups/a"));
}

#[tokio::test]
async fn test_failed_requests_still_count() {
    let stub = common::stub(vec![Interaction::get(
        "/Groups/missing",
        StubResponse::json(
            404,
            json!({ "error": "scim_resource_not_found", "error_description": "Group missing does not exist" }),
        ),
    )])
    .await;
    let uaa = common::uaa(&stub, vec![groups_limit(1)]);

    let error = uaa.groups().get("missing").await.unwrap_err();
    assert!(error.is_not_found());
    assert!(
        uaa.context()
            .throttle()
            .check_delay_needed_and_resume("/Groups/missing")
    );
}
