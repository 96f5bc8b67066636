use crate::error::AppResult;
use crate::health::{diseases, DateRange, DiseaseRecord, HealthEntry};
use crate::storage::{load, modify_records, Collection, RecordStore};
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::{Arc, Mutex};

fn record_date(record: &Value) -> Option<NaiveDate> {
    record.get("date")?.as_str()?.parse().ok()
}

/// Health entries keyed by calendar day
pub struct EntryRepository {
    store: Arc<dyn RecordStore>,
    write_lock: Mutex<()>,
}

impl EntryRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn list(&self) -> Vec<HealthEntry> {
        load(self.store.as_ref(), Collection::Entries)
    }

    /// Insert the entry, replacing any existing entry for the same date in place
    pub fn upsert(&self, entry: HealthEntry) -> AppResult<HealthEntry> {
        let entry = entry.validated()?;
        let value = serde_json::to_value(&entry)?;
        let _guard = self.lock();

        modify_records(self.store.as_ref(), Collection::Entries, |records| {
            match records.iter_mut().find(|r| record_date(r) == Some(entry.date)) {
                Some(existing) => *existing = value,
                None => records.push(value),
            }
            Ok(true)
        })?;
        Ok(entry)
    }

    pub fn delete(&self, date: NaiveDate) -> AppResult<bool> {
        let _guard = self.lock();
        modify_records(self.store.as_ref(), Collection::Entries, |records| {
            let before = records.len();
            records.retain(|record| record_date(record) != Some(date));
            Ok(records.len() != before)
        })
    }

    pub fn latest(&self) -> Option<HealthEntry> {
        self.list().into_iter().max_by_key(|e| e.date)
    }

    /// Entries within `range`, newest first
    pub fn history(&self, range: DateRange) -> Vec<HealthEntry> {
        let mut entries: Vec<_> = self
            .list()
            .into_iter()
            .filter(|e| range.contains(e.date))
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries
    }

    pub fn diseases(&self) -> Vec<DiseaseRecord> {
        diseases(&self.list())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn repo() -> EntryRepository {
        EntryRepository::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_upsert_replaces_same_day() {
        let repo = repo();
        let mut first = HealthEntry::new(day(1));
        first.water = Some(1000.0);
        repo.upsert(first).unwrap();
        repo.upsert(HealthEntry::new(day(2))).unwrap();

        let mut again = HealthEntry::new(day(1));
        again.water = Some(1800.0);
        repo.upsert(again).unwrap();

        let entries = repo.list();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, day(1));
        assert_eq!(entries[0].water, Some(1800.0));
    }

    #[test]
    fn test_upsert_rejects_invalid_entry() {
        let repo = repo();
        let mut bad = HealthEntry::new(day(1));
        bad.weight = Some(f64::NAN);

        assert!(repo.upsert(bad).is_err());
        assert!(repo.list().is_empty());
    }

    #[test]
    fn test_delete_by_date() {
        let repo = repo();
        repo.upsert(HealthEntry::new(day(1))).unwrap();
        repo.upsert(HealthEntry::new(day(2))).unwrap();

        assert!(repo.delete(day(1)).unwrap());
        assert!(!repo.delete(day(9)).unwrap());
        assert_eq!(repo.list().len(), 1);
    }

    #[test]
    fn test_history_filters_and_sorts_descending() {
        let repo = repo();
        for d in [3, 1, 5, 2] {
            repo.upsert(HealthEntry::new(day(d))).unwrap();
        }

        let range = DateRange {
            from: Some(day(2)),
            to: Some(day(4)),
        };
        let dates: Vec<_> = repo.history(range).into_iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![day(3), day(2)]);

        assert_eq!(repo.latest().map(|e| e.date), Some(day(5)));
    }

    #[test]
    fn test_undecodable_entries_survive_upsert_and_delete() {
        let store = Arc::new(MemoryStore::new());
        let odd = json!({"date": "2024-01-04", "weight": "seventy"});
        store.write_all(Collection::Entries, &[odd.clone()]).unwrap();

        let repo = EntryRepository::new(store.clone());
        repo.upsert(HealthEntry::new(day(1))).unwrap();
        repo.upsert(HealthEntry::new(day(2))).unwrap();
        assert!(repo.delete(day(2)).unwrap());

        let raw = store.read_all(Collection::Entries);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0], odd);
        assert_eq!(repo.list().len(), 1);
    }
}
