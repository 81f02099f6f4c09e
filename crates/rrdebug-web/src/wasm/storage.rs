#![forbid(unsafe_code)]

//! Browser storage tiers for the handoff cache.
//!
//! IndexedDB is callback based; every request and transaction is bridged to
//! a future with [`Settle`]. The database is opened per operation, matching
//! the lifetime of a page that stores once or reads once.

use rrdebug_core::cache::{StringTier, StructuredTier, TierError};
use rrdebug_core::config::HandoffConfig;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{IdbDatabase, IdbOpenDbRequest, IdbRequest, IdbTransaction, IdbTransactionMode};

use super::dom::{js_message, window};
use super::settle::Settle;

/// Structured tier on IndexedDB.
#[derive(Debug, Clone)]
pub struct IndexedDbTier {
    database: String,
    version: u32,
    object_store: String,
}

impl IndexedDbTier {
    #[must_use]
    pub fn new(config: &HandoffConfig) -> Self {
        Self {
            database: config.database.clone(),
            version: config.database_version,
            object_store: config.object_store.clone(),
        }
    }

    async fn open(&self) -> Result<IdbDatabase, TierError> {
        let factory = window()
            .map_err(TierError::Unavailable)?
            .indexed_db()
            .map_err(|err| TierError::Unavailable(js_message(&err)))?
            .ok_or_else(|| TierError::Unavailable("indexedDB is not supported".to_string()))?;
        let request = factory
            .open_with_u32(&self.database, self.version)
            .map_err(|err| TierError::Unavailable(js_message(&err)))?;

        let store_name = self.object_store.clone();
        let on_upgrade = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
            let Some(db) = event
                .target()
                .and_then(|target| target.dyn_into::<IdbOpenDbRequest>().ok())
                .and_then(|request| request.result().ok())
                .and_then(|result| result.dyn_into::<IdbDatabase>().ok())
            else {
                return;
            };
            if db.object_store_names().contains(&store_name) {
                return;
            }
            match db.create_object_store(&store_name) {
                Ok(_) => debug!(store = %store_name, "created object store"),
                Err(err) => warn!(store = %store_name, error = %js_message(&err), "could not create object store"),
            }
        });
        request.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));

        let mut done = Settle::new();
        request.set_onsuccess(Some(done.ok()));
        request.set_onerror(Some(done.err()));
        let opened = done.wait().await;
        request.set_onupgradeneeded(None);
        request.set_onsuccess(None);
        request.set_onerror(None);

        if !opened {
            return Err(TierError::Unavailable(request_error(&request)));
        }
        request
            .result()
            .map_err(|err| TierError::Unavailable(js_message(&err)))?
            .dyn_into::<IdbDatabase>()
            .map_err(|_| TierError::Unavailable("open request did not yield a database".to_string()))
    }

    fn transaction(
        &self,
        db: &IdbDatabase,
        mode: IdbTransactionMode,
    ) -> Result<(IdbTransaction, web_sys::IdbObjectStore), TierError> {
        let tx = db
            .transaction_with_str_and_mode(&self.object_store, mode)
            .map_err(|err| TierError::Rejected(js_message(&err)))?;
        let store = tx
            .object_store(&self.object_store)
            .map_err(|err| TierError::Rejected(js_message(&err)))?;
        Ok((tx, store))
    }
}

impl StructuredTier for IndexedDbTier {
    async fn put(&self, key: &str, payload: &Value) -> Result<(), TierError> {
        let value = payload
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|err| TierError::Rejected(err.to_string()))?;
        let db = self.open().await?;
        let (tx, store) = self.transaction(&db, IdbTransactionMode::Readwrite)?;
        store
            .put_with_key(&value, &JsValue::from_str(key))
            .map_err(|err| TierError::Rejected(js_message(&err)))?;
        let result = complete(&tx).await;
        db.close();
        result
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, TierError> {
        let db = self.open().await?;
        let (_tx, store) = self.transaction(&db, IdbTransactionMode::Readonly)?;
        let request = store
            .get(&JsValue::from_str(key))
            .map_err(|err| TierError::Rejected(js_message(&err)))?;
        let result = settle_request(&request).await;
        db.close();
        let value = result?;
        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }
        serde_wasm_bindgen::from_value(value)
            .map(Some)
            .map_err(|err| TierError::Rejected(err.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), TierError> {
        let db = self.open().await?;
        let (tx, store) = self.transaction(&db, IdbTransactionMode::Readwrite)?;
        store
            .delete(&JsValue::from_str(key))
            .map_err(|err| TierError::Rejected(js_message(&err)))?;
        let result = complete(&tx).await;
        db.close();
        result
    }
}

/// Resolve with the request's result once it succeeds.
async fn settle_request(request: &IdbRequest) -> Result<JsValue, TierError> {
    let mut done = Settle::new();
    request.set_onsuccess(Some(done.ok()));
    request.set_onerror(Some(done.err()));
    let succeeded = done.wait().await;
    request.set_onsuccess(None);
    request.set_onerror(None);
    if !succeeded {
        return Err(TierError::Rejected(request_error(request)));
    }
    request
        .result()
        .map_err(|err| TierError::Rejected(js_message(&err)))
}

/// Wait for a write transaction to commit.
async fn complete(tx: &IdbTransaction) -> Result<(), TierError> {
    let mut done = Settle::new();
    tx.set_oncomplete(Some(done.ok()));
    tx.set_onerror(Some(done.err()));
    tx.set_onabort(Some(done.err()));
    let committed = done.wait().await;
    tx.set_oncomplete(None);
    tx.set_onerror(None);
    tx.set_onabort(None);
    if committed {
        return Ok(());
    }
    let reason = tx
        .error()
        .map(|err| err.message())
        .unwrap_or_else(|| "transaction aborted".to_string());
    Err(TierError::Rejected(reason))
}

fn request_error(request: &IdbRequest) -> String {
    match request.error() {
        Ok(Some(err)) => err.message(),
        Ok(None) => "request failed".to_string(),
        Err(err) => js_message(&err),
    }
}

/// String tier on `sessionStorage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStorageTier;

impl SessionStorageTier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn storage() -> Result<web_sys::Storage, TierError> {
        window()
            .map_err(TierError::Unavailable)?
            .session_storage()
            .map_err(|err| TierError::Unavailable(js_message(&err)))?
            .ok_or_else(|| TierError::Unavailable("sessionStorage is not available".to_string()))
    }
}

impl StringTier for SessionStorageTier {
    fn set_item(&self, key: &str, value: &str) -> Result<(), TierError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|err| TierError::Rejected(js_message(&err)))
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, TierError> {
        Self::storage()?
            .get_item(key)
            .map_err(|err| TierError::Rejected(js_message(&err)))
    }

    fn remove_item(&self, key: &str) -> Result<(), TierError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|err| TierError::Rejected(js_message(&err)))
    }
}
