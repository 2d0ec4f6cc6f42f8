mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use campus::client::{ClientError, Resource};
use campus::domain::{FilterField, ListQuery};
use campus::hooks::{use_item, use_tags};
use campus_api_types::Tag;
use serde_json::json;
use support::FakeApi;

fn names(tags: &[Tag]) -> Vec<&str> {
    tags.iter().map(|tag| tag.name.as_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn equivalent_hooks_share_one_request() {
    let api = FakeApi::with_tags(3);
    let ctx = api.context();

    let first = use_tags(
        &ctx,
        ListQuery::new()
            .filter(FilterField::Tag, "")
            .filter(FilterField::Search, "")
            .page(1),
    );
    let second = use_tags(&ctx, ListQuery::new());

    let (a, b) = tokio::join!(first.resolve(), second.resolve());
    let (a, b) = (a.expect("first"), b.expect("second"));

    assert_eq!(api.call_count(), 1);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.total_count, 3);
}

#[tokio::test(start_paused = true)]
async fn filter_order_does_not_change_the_request() {
    let api = FakeApi::with_tags(3);
    let ctx = api.context();

    let first = use_tags(
        &ctx,
        ListQuery::new()
            .filter(FilterField::Tag, "math")
            .filter(FilterField::Year, "2024"),
    );
    let second = use_tags(
        &ctx,
        ListQuery::new()
            .filter(FilterField::Year, "2024")
            .filter(FilterField::Tag, "math"),
    );
    first.resolve().await.expect("first");
    second.resolve().await.expect("second");

    assert_eq!(api.calls(), vec!["tags?page=1&tag=math&year=2024"]);
}

#[tokio::test(start_paused = true)]
async fn remount_within_deduping_interval_reuses_value() {
    let api = FakeApi::with_tags(3);
    let ctx = api.context();

    let hook = use_tags(&ctx, ListQuery::new());
    hook.resolve().await.expect("first");
    drop(hook);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let again = use_tags(&ctx, ListQuery::new());
    assert!(again.state().data.is_some());
    assert!(!again.state().is_validating);
    assert_eq!(api.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn stale_value_is_served_while_revalidating() {
    let api = FakeApi::with_tags(3);
    let ctx = api.context();

    let hook = use_tags(&ctx, ListQuery::new());
    let old = hook.resolve().await.expect("first");
    drop(hook);
    api.push_tag("fresh");

    tokio::time::sleep(Duration::from_secs(3)).await;
    let hook = use_tags(&ctx, ListQuery::new());
    let state = hook.state();
    assert!(Arc::ptr_eq(state.data.as_ref().expect("stale data"), &old));
    assert!(state.is_validating);
    assert!(!state.is_loading);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let refreshed = hook.state().data.expect("refreshed");
    assert_eq!(refreshed.total_count, 4);
    assert_eq!(api.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn late_result_for_abandoned_key_is_ignored() {
    let api = FakeApi::with_tags(25);
    api.delay("page=1&search=tag-2", Duration::from_millis(500));
    let ctx = api.context();

    let hook = use_tags(&ctx, ListQuery::new().filter(FilterField::Search, "tag-2"));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _listener = hook.on_change(move |state| {
        if let Some(data) = &state.data {
            let names: Vec<String> = data.items.iter().map(|tag: &Tag| tag.name.clone()).collect();
            sink.lock().expect("seen").push(names);
        }
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(hook.set_query(ListQuery::new().filter(FilterField::Search, "tag-1")));
    let current = hook.resolve().await.expect("current key");
    assert!(names(&current.items).iter().all(|name| name.contains("tag-1")));

    // Let the abandoned request finish.
    tokio::time::sleep(Duration::from_secs(1)).await;

    let data = hook.state().data.expect("data");
    assert!(Arc::ptr_eq(&data, &current));
    for page in seen.lock().expect("seen").iter() {
        assert!(page.iter().all(|name| name.contains("tag-1")), "saw {page:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn immediate_mutates_converge() {
    let api = FakeApi::with_tags(3);
    let ctx = api.context();
    let hook = use_tags(&ctx, ListQuery::new());
    hook.resolve().await.expect("initial");
    api.push_tag("added");

    let (_, second) = tokio::join!(hook.mutate(), hook.mutate());
    let settled = hook.state();

    assert_eq!(second.data.as_ref().expect("data").total_count, 4);
    assert!(Arc::ptr_eq(
        settled.data.as_ref().expect("data"),
        second.data.as_ref().expect("data")
    ));
    assert!(!settled.is_validating);
    assert_eq!(api.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn errors_keep_last_good_data() {
    let api = FakeApi::with_tags(3);
    let ctx = api.context();
    let hook = use_tags(&ctx, ListQuery::new());
    let good = hook.resolve().await.expect("initial");

    api.fail_with(Some(ClientError::Server { status: 503 }));
    let state = hook.mutate().await;
    assert!(state.is_error());
    assert_eq!(state.error, Some(ClientError::Server { status: 503 }));
    assert!(Arc::ptr_eq(state.data.as_ref().expect("kept"), &good));

    api.fail_with(None);
    let state = hook.mutate().await;
    assert!(!state.is_error());
}

#[tokio::test(start_paused = true)]
async fn item_hook_reports_not_found() {
    let api = FakeApi::with_tags(3);
    let ctx = api.context();

    let hook = use_item::<Tag>(&ctx, Resource::Tags, "2");
    assert_eq!(hook.resolve().await.expect("tag").name, "tag-2");

    let missing = use_item::<Tag>(&ctx, Resource::Tags, "99");
    let err = missing.resolve().await.expect_err("missing");
    assert!(err.is_not_found());
    assert!(missing.state().is_error());
    assert!(missing.state().data.is_none());
}

#[tokio::test(start_paused = true)]
async fn after_write_refetches_mounted_hooks() {
    let api = FakeApi::with_tags(3);
    let ctx = api.context();
    let hook = use_tags(&ctx, ListQuery::new());
    hook.resolve().await.expect("initial");

    let created: Tag = ctx
        .api()
        .create(Resource::Tags, &json!({ "name": "robotique" }))
        .await
        .expect("create");
    assert_eq!(created.id, 4);
    assert_eq!(ctx.after_write(Resource::Tags), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let data = hook.state().data.expect("data");
    assert!(names(&data.items).contains(&"robotique"));
    assert_eq!(
        api.calls(),
        vec!["tags?page=1", "POST tags", "tags?page=1"]
    );
}

#[tokio::test(start_paused = true)]
async fn dropping_the_last_hook_releases_its_subscription() {
    let api = FakeApi::with_tags(3);
    let ctx = api.context();
    let hook = use_tags(&ctx, ListQuery::new());
    let clone = hook.clone();
    let key = hook.key();
    hook.resolve().await.expect("initial");

    assert_eq!(ctx.store().get(&key).expect("entry").subscribers, 1);
    drop(hook);
    assert_eq!(ctx.store().get(&key).expect("entry").subscribers, 1);
    drop(clone);
    assert_eq!(ctx.store().get(&key).expect("entry").subscribers, 0);
}
