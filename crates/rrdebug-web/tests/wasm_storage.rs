#![cfg(target_arch = "wasm32")]
#![forbid(unsafe_code)]

use rrdebug_core::cache::{PayloadCache, StringTier, StructuredTier};
use rrdebug_core::config::HandoffConfig;
use rrdebug_web::{IndexedDbTier, SessionStorageTier};
use serde_json::json;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

fn test_config(database: &str) -> HandoffConfig {
    HandoffConfig {
        database: database.to_string(),
        ..HandoffConfig::default()
    }
}

#[wasm_bindgen_test]
fn session_storage_round_trips_text() {
    let tier = SessionStorageTier::new();
    tier.set_item("rrdebug-test", "[1,2]").expect("set");
    assert_eq!(
        tier.get_item("rrdebug-test").expect("get").as_deref(),
        Some("[1,2]")
    );
    tier.remove_item("rrdebug-test").expect("remove");
    assert_eq!(tier.get_item("rrdebug-test").expect("get"), None);
}

#[wasm_bindgen_test]
async fn indexed_db_creates_store_and_reads_back() {
    let config = test_config("rrdebug-test-put");
    let tier = IndexedDbTier::new(&config);
    let payload = json!([{"type": 4, "data": {"href": "https://a.test", "width": 800}}]);

    tier.put(&config.key, &payload).await.expect("put");
    assert_eq!(tier.get(&config.key).await.expect("get"), Some(payload));

    tier.delete(&config.key).await.expect("delete");
    assert_eq!(tier.get(&config.key).await.expect("get"), None);
}

#[wasm_bindgen_test]
async fn handoff_cache_reads_primary_then_fallback() {
    let config = test_config("rrdebug-test-cache");
    let cache = PayloadCache::with_config(
        IndexedDbTier::new(&config),
        SessionStorageTier::new(),
        &config,
    );
    cache.store(&json!({"nested": [[], {}]})).await.expect("store");
    assert_eq!(
        cache.retrieve().await.expect("retrieve"),
        Some(json!({"nested": [[], {}]}))
    );

    cache.primary().delete(&config.key).await.expect("delete");
    assert_eq!(
        cache.retrieve().await.expect("fallback"),
        Some(json!({"nested": [[], {}]}))
    );

    cache.secondary().remove_item(&config.key).expect("remove");
    assert_eq!(cache.retrieve().await.expect("empty"), None);
    assert!(!cache.contains().await);
}
