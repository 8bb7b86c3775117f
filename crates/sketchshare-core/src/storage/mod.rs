//! Read access to the sketch editor's persisted shapes.
//!
//! The editor owns its store; the exporter only ever asks it for every shape
//! record it holds, in key order.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

#[cfg(target_arch = "wasm32")]
mod indexeddb;

pub use memory::MemoryShapeStore;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileShapeStore;

#[cfg(target_arch = "wasm32")]
pub use indexeddb::IndexedDbShapeStore;

use crate::model::ShapeRecord;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Persistent shape store of the host editor.
pub trait ShapeStore {
    /// Every stored shape record, in key order.
    fn get_all(&self) -> BoxFuture<'_, StoreResult<Vec<ShapeRecord>>>;
}
