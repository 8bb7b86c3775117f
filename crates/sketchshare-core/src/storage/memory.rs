//! In-memory shape store.

use super::{BoxFuture, ShapeStore, StoreResult};
use crate::model::ShapeRecord;

/// In-memory store for testing and hosts without persistence.
///
/// Records come back in the order they were given.
#[derive(Default)]
pub struct MemoryShapeStore {
    records: Vec<ShapeRecord>,
}

impl MemoryShapeStore {
    pub fn with_records(records: impl IntoIterator<Item = ShapeRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }
}

impl ShapeStore for MemoryShapeStore {
    fn get_all(&self) -> BoxFuture<'_, StoreResult<Vec<ShapeRecord>>> {
        let records = self.records.clone();
        Box::pin(async move { Ok(records) })
    }
}
