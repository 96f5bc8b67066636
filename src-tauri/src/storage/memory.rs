use crate::error::AppResult;
use crate::storage::{Collection, RecordStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-local store for tests and throwaway sessions
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn read_all(&self, collection: Collection) -> Vec<Value> {
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections.get(&collection).cloned().unwrap_or_default()
    }

    fn write_all(&self, collection: Collection, records: &[Value]) -> AppResult<()> {
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections.insert(collection, records.to_vec());
        Ok(())
    }
}
