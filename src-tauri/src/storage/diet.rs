use crate::error::AppResult;
use crate::health::DietItem;
use crate::storage::legacy::{migrate_collection, try_migrate_legacy_diet};
use crate::storage::{load, modify_records, Collection, RecordStore};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

fn record_id(record: &Value) -> Option<Uuid> {
    record.get("id")?.as_str()?.parse().ok()
}

pub struct DietRepository {
    store: Arc<dyn RecordStore>,
    write_lock: Mutex<()>,
}

impl DietRepository {
    /// Open the diet collection, giving ids to items saved before they had one
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let repo = Self {
            store,
            write_lock: Mutex::new(()),
        };
        {
            let _guard = repo.lock();
            migrate_collection(repo.store.as_ref(), Collection::Diet, try_migrate_legacy_diet);
        }
        repo
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn list(&self) -> Vec<DietItem> {
        load(self.store.as_ref(), Collection::Diet)
    }

    pub fn add(&self, item: DietItem) -> AppResult<DietItem> {
        let value = serde_json::to_value(&item)?;
        let _guard = self.lock();
        modify_records(self.store.as_ref(), Collection::Diet, |records| {
            records.push(value);
            Ok(true)
        })?;
        Ok(item)
    }

    pub fn delete(&self, id: Uuid) -> AppResult<bool> {
        let _guard = self.lock();
        modify_records(self.store.as_ref(), Collection::Diet, |records| {
            let before = records.len();
            records.retain(|record| record_id(record) != Some(id));
            Ok(records.len() != before)
        })
    }
}
