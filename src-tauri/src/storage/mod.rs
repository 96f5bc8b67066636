mod diet;
mod entries;
mod legacy;
mod local;
mod memory;
mod reminders;

use crate::error::AppResult;
use log::warn;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use diet::DietRepository;
pub use entries::EntryRepository;
pub use local::JsonFileStore;
pub use memory::MemoryStore;
pub use reminders::ReminderRepository;

/// Independently stored record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Entries,
    Reminders,
    Diet,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Entries, Collection::Reminders, Collection::Diet];

    /// Storage key, shared with data written by earlier versions of the app
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Entries => "ht_entries",
            Collection::Reminders => "ht_meds",
            Collection::Diet => "ht_diet",
        }
    }
}

/// Durable mapping from a collection to an ordered list of flat records.
///
/// Reads fail soft: a missing or corrupt collection reads as empty. A write replaces the
/// whole collection and is never observable half done.
pub trait RecordStore: Send + Sync {
    fn read_all(&self, collection: Collection) -> Vec<Value>;

    fn write_all(&self, collection: Collection, records: &[Value]) -> AppResult<()>;

    /// Keep a copy of `records` before a format migration rewrites them
    fn backup(&self, _collection: Collection, _records: &[Value]) -> AppResult<()> {
        Ok(())
    }
}

/// Read a collection as typed records, skipping any record that no longer decodes
pub fn load<T: DeserializeOwned>(store: &dyn RecordStore, collection: Collection) -> Vec<T> {
    store
        .read_all(collection)
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<T>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    "Skipping unreadable record {} in {}: {}",
                    index,
                    collection.key(),
                    e
                );
                None
            }
        })
        .collect()
}

/// Apply `change` to the raw records of `collection`, writing them back only when it
/// reports a modification. Records this version cannot decode pass through untouched.
///
/// Callers serialize read-modify-write with their repository's write lock.
fn modify_records<F>(store: &dyn RecordStore, collection: Collection, change: F) -> AppResult<bool>
where
    F: FnOnce(&mut Vec<Value>) -> AppResult<bool>,
{
    let mut records = store.read_all(collection);
    if !change(&mut records)? {
        return Ok(false);
    }
    store.write_all(collection, &records)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        title: String,
    }

    #[test]
    fn test_collection_keys_are_distinct() {
        let mut keys: Vec<_> = Collection::ALL.iter().map(|c| c.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), Collection::ALL.len());
    }

    #[test]
    fn test_load_skips_undecodable_records() {
        let store = MemoryStore::new();
        store
            .write_all(
                Collection::Diet,
                &[json!({"title": "Oats"}), json!(42), json!({"title": "Rice"})],
            )
            .unwrap();

        let items: Vec<Item> = load(&store, Collection::Diet);
        assert_eq!(
            items,
            vec![
                Item { title: "Oats".to_string() },
                Item { title: "Rice".to_string() }
            ]
        );
    }

    #[test]
    fn test_modify_records_passes_unknown_records_through() {
        let store = MemoryStore::new();
        store
            .write_all(Collection::Diet, &[json!(42), json!({"title": "Oats"})])
            .unwrap();

        let changed = modify_records(&store, Collection::Diet, |records| {
            records.push(json!({"title": "Rice"}));
            Ok(true)
        })
        .unwrap();

        assert!(changed);
        assert_eq!(
            store.read_all(Collection::Diet),
            vec![json!(42), json!({"title": "Oats"}), json!({"title": "Rice"})]
        );
    }

    #[test]
    fn test_modify_records_skips_write_when_unchanged() {
        let store = MemoryStore::new();
        let changed = modify_records(&store, Collection::Entries, |records| {
            records.push(json!({"date": "2024-01-01"}));
            Ok(false)
        })
        .unwrap();

        assert!(!changed);
        assert!(store.read_all(Collection::Entries).is_empty());
    }
}
