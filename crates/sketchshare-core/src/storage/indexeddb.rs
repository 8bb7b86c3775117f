//! IndexedDB shape store for WebAssembly.
//!
//! Reads the object store the sketch editor writes its shapes into.

use super::{BoxFuture, ShapeStore, StoreError, StoreResult};
use crate::model::ShapeRecord;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{IdbDatabase, IdbObjectStore, IdbRequest, IdbTransactionMode};

/// IndexedDB-backed shape store.
///
/// Either attached to a connection the page already opened, or opened
/// lazily by database name on first use.
pub struct IndexedDbShapeStore {
    db_name: Option<String>,
    store_name: String,
    /// Cached database connection.
    db: Rc<RefCell<Option<IdbDatabase>>>,
}

impl IndexedDbShapeStore {
    /// Use a connection the host page already holds.
    pub fn attached(db: IdbDatabase, store_name: &str) -> Self {
        Self {
            db_name: None,
            store_name: store_name.to_string(),
            db: Rc::new(RefCell::new(Some(db))),
        }
    }

    /// Open `db_name` on first query.
    pub fn named(db_name: &str, store_name: &str) -> Self {
        Self {
            db_name: Some(db_name.to_string()),
            store_name: store_name.to_string(),
            db: Rc::new(RefCell::new(None)),
        }
    }

    /// Attach to `window.db` if the page exposes an open database there.
    pub fn from_window(store_name: &str) -> Option<Self> {
        let window = web_sys::window()?;
        let value = js_sys::Reflect::get(&window, &JsValue::from_str("db")).ok()?;
        let db = value.dyn_into::<IdbDatabase>().ok()?;
        Some(Self::attached(db, store_name))
    }

    async fn get_db(&self) -> StoreResult<IdbDatabase> {
        if let Some(db) = self.db.borrow().as_ref() {
            return Ok(db.clone());
        }

        let name = self
            .db_name
            .as_deref()
            .ok_or_else(|| StoreError::Other("No database connection".to_string()))?;

        let window = web_sys::window()
            .ok_or_else(|| StoreError::Other("No window object".to_string()))?;

        let idb_factory = window
            .indexed_db()
            .map_err(|e| StoreError::Other(format!("IndexedDB error: {:?}", e)))?
            .ok_or_else(|| StoreError::Other("IndexedDB not available".to_string()))?;

        // No version: never triggers an upgrade of the editor's schema.
        let open_request = idb_factory
            .open(name)
            .map_err(|e| StoreError::Other(format!("Failed to open DB: {:?}", e)))?;

        let db = await_idb_request::<IdbDatabase>(&open_request).await?;
        *self.db.borrow_mut() = Some(db.clone());
        Ok(db)
    }

    fn get_store(&self, db: &IdbDatabase) -> StoreResult<IdbObjectStore> {
        if !db.object_store_names().contains(&self.store_name) {
            return Err(StoreError::NotFound(self.store_name.clone()));
        }

        let transaction = db
            .transaction_with_str_and_mode(&self.store_name, IdbTransactionMode::Readonly)
            .map_err(|e| StoreError::Other(format!("Transaction error: {:?}", e)))?;

        transaction
            .object_store(&self.store_name)
            .map_err(|e| StoreError::Other(format!("Store error: {:?}", e)))
    }
}

impl ShapeStore for IndexedDbShapeStore {
    fn get_all(&self) -> BoxFuture<'_, StoreResult<Vec<ShapeRecord>>> {
        Box::pin(async move {
            let db = self.get_db().await?;
            let store = self.get_store(&db)?;

            let request = store
                .get_all()
                .map_err(|e| StoreError::Other(format!("GetAll error: {:?}", e)))?;

            let result = await_idb_request::<JsValue>(&request).await?;

            // Same deep copy the page would make: JSON.stringify, then parse.
            let json: String = js_sys::JSON::stringify(&result)
                .map_err(|e| StoreError::Serialization(format!("{:?}", e)))?
                .into();
            let records: Vec<ShapeRecord> = serde_json::from_str(&json)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            Ok(records)
        })
    }
}

/// Await an IndexedDB request through a Promise.
async fn await_idb_request<T: JsCast>(request: &IdbRequest) -> StoreResult<T> {
    use wasm_bindgen_futures::JsFuture;

    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        let onsuccess = Closure::once(Box::new(move |event: web_sys::Event| {
            let result = event
                .target()
                .and_then(|target| target.dyn_into::<IdbRequest>().ok())
                .and_then(|request| request.result().ok())
                .unwrap_or(JsValue::UNDEFINED);
            let _ = resolve.call1(&JsValue::NULL, &result);
        }) as Box<dyn FnOnce(_)>);

        let onerror = Closure::once(Box::new(move |_event: web_sys::Event| {
            let _ = reject.call1(&JsValue::NULL, &JsValue::from_str("IndexedDB request failed"));
        }) as Box<dyn FnOnce(_)>);

        request.set_onsuccess(Some(onsuccess.as_ref().unchecked_ref()));
        request.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        onsuccess.forget();
        onerror.forget();
    });

    JsFuture::from(promise)
        .await
        .map_err(|e| StoreError::Other(format!("IndexedDB request failed: {:?}", e)))?
        .dyn_into::<T>()
        .map_err(|_| StoreError::Other("Type conversion failed".to_string()))
}
