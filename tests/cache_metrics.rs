use std::collections::HashSet;
use std::time::Duration;

use campus::cache::{CacheConfig, CacheStore, ResourceKey};
use campus::client::Resource;
use campus::domain::{FilterField, ListQuery};
use metrics_util::debugging::DebuggingRecorder;

fn key(search: &str) -> ResourceKey {
    ResourceKey::collection(
        Resource::Tags,
        &ListQuery::new().filter(FilterField::Search, search),
    )
}

#[tokio::test(start_paused = true)]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let store = CacheStore::new(CacheConfig {
        max_entries: 1,
        ..Default::default()
    });

    // miss + join on one key, hit right after it settles
    let shared = key("a");
    let (first, second) = tokio::join!(
        store.fetch_or_join(&shared, || async { Ok(1_u32) }),
        store.fetch_or_join(&shared, || async { Ok(2_u32) }),
    );
    assert_eq!(*first.expect("first"), 1);
    assert_eq!(*second.expect("joined"), 1);
    assert_eq!(
        *store
            .fetch_or_join(&key("a"), || async { Ok(3_u32) })
            .await
            .expect("hit"),
        1
    );

    // a second key pushes the first out of a one-entry cache
    store
        .fetch_or_join(&key("b"), || async { Ok(4_u32) })
        .await
        .expect("b");
    assert!(store.get(&key("a")).is_none());

    // invalidating an in-flight request discards its result
    let slow = store.revalidate(&key("c"), || async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(5_u32)
    });
    assert!(slow.is_none());
    assert!(store.invalidate(&key("c")));
    tokio::time::sleep(Duration::from_millis(200)).await;

    // idle entries are pruned once past the idle TTL
    tokio::time::sleep(store.config().idle_ttl()).await;
    assert!(store.prune_idle() > 0);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "campus_cache_hit_total",
        "campus_cache_miss_total",
        "campus_cache_join_total",
        "campus_cache_evict_total",
        "campus_cache_discarded_total",
        "campus_cache_entries",
        "campus_fetch_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
