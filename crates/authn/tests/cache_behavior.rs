#![allow(clippy::expect_used, clippy::panic)]
//! Cache-level behavior: expiry, sweeping, tamper detection, and contention.

use std::time::Duration;

use keygate_authn::{CacheConfig, CipherError, Lookup, PrincipalCache, testutil::read_only_principal};

fn manual_sweep_cache() -> PrincipalCache {
    // Long sweep interval so the background task never interferes with
    // assertions about lazy eviction.
    PrincipalCache::with_config(CacheConfig {
        entry_ttl: Duration::from_secs(3600),
        sweep_interval: Duration::from_secs(3600),
    })
}

#[tokio::test]
async fn entry_survives_until_its_ttl() {
    let cache = manual_sweep_cache();
    let principal = read_only_principal("u1");
    cache.put("key", &principal, Duration::from_millis(200)).expect("put");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cache.get("key").expect("get"), Lookup::Hit(principal));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(cache.get("key").expect("get"), Lookup::Miss);
}

#[tokio::test]
async fn expired_entries_linger_until_swept() {
    let cache = manual_sweep_cache();
    for i in 0..5 {
        cache
            .put(format!("stale-{i}"), &read_only_principal("u1"), Duration::from_millis(30))
            .expect("put");
    }
    cache.put("live", &read_only_principal("u2"), Duration::from_secs(3600)).expect("put");

    tokio::time::sleep(Duration::from_millis(80)).await;

    // No gets issued: nothing has been lazily evicted yet.
    assert_eq!(cache.entry_count(), 6);

    let evicted = cache.sweep();

    assert_eq!(evicted, 5);
    assert_eq!(cache.entry_count(), 1);
    assert!(cache.contains_key("live"));
    assert_eq!(cache.metrics().sweep_evictions, 5);
}

#[tokio::test]
async fn sweep_on_empty_cache_is_a_noop() {
    let cache = manual_sweep_cache();
    assert_eq!(cache.sweep(), 0);
}

#[tokio::test]
async fn tampering_is_detected_and_isolated() {
    let cache = manual_sweep_cache();
    cache.put("good", &read_only_principal("u1"), Duration::from_secs(3600)).expect("put");
    cache.put("bad", &read_only_principal("u2"), Duration::from_secs(3600)).expect("put");

    assert!(cache.corrupt_entry("bad"));

    let bad = cache.get("bad");
    assert!(matches!(bad, Err(CipherError::AuthenticationTagMismatch)));

    // The sibling entry is untouched.
    assert!(matches!(cache.get("good"), Ok(Lookup::Hit(_))));
}

#[tokio::test]
async fn corrupt_entry_on_absent_key_reports_false() {
    let cache = manual_sweep_cache();
    assert!(!cache.corrupt_entry("missing"));
}

#[tokio::test]
async fn overwrite_replaces_payload_and_expiry() {
    let cache = manual_sweep_cache();
    cache.put("key", &read_only_principal("old"), Duration::from_millis(30)).expect("put");
    cache.put("key", &read_only_principal("new"), Duration::from_secs(3600)).expect("put");

    tokio::time::sleep(Duration::from_millis(80)).await;

    match cache.get("key").expect("get") {
        Lookup::Hit(principal) => assert_eq!(principal.identity.as_str(), "new"),
        Lookup::Miss => panic!("overwrite should have extended the TTL"),
    }
}

#[tokio::test]
async fn metrics_track_hits_and_misses() {
    let cache = manual_sweep_cache();
    cache.put("key", &read_only_principal("u1"), Duration::from_secs(3600)).expect("put");

    cache.get("key").expect("hit");
    cache.get("key").expect("hit");
    cache.get("absent").expect("miss");

    let metrics = cache.metrics();
    assert_eq!(metrics.hits, 2);
    assert_eq!(metrics.misses, 1);
    assert_eq!(metrics.decrypt_failures, 0);
}

#[tokio::test]
async fn contended_readers_and_writers_never_observe_corruption() {
    let cache = manual_sweep_cache();
    let mut handles = Vec::new();

    for writer in 0..4 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for seq in 0..100 {
                let principal = read_only_principal(&format!("w{writer}-{seq}"));
                cache
                    .put(format!("slot-{}", seq % 8), &principal, Duration::from_secs(60))
                    .expect("put");
            }
        }));
    }
    for _ in 0..4 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for seq in 0..100 {
                // A concurrent overwrite must yield either a clean hit or a
                // miss, never a decryption error.
                cache
                    .get(&format!("slot-{}", seq % 8))
                    .expect("reads must never surface a cipher error");
            }
        }));
    }

    for handle in handles {
        handle.await.expect("task");
    }
}
