use crate::error::AppResult;
use crate::reminder::{NewReminder, OccurrenceStamp, Reminder, ReminderId};
use crate::storage::legacy::{migrate_collection, try_migrate_legacy_reminders};
use crate::storage::{load, modify_records, Collection, RecordStore};
use log::info;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Typed view over the reminders collection.
///
/// The scheduler thread stamps `lastFired` while UI commands add and delete, so every
/// read-modify-write runs under `write_lock`.
pub struct ReminderRepository {
    store: Arc<dyn RecordStore>,
    write_lock: Mutex<()>,
}

fn record_id(record: &Value) -> Option<ReminderId> {
    record.get("id")?.as_str()?.parse().ok()
}

impl ReminderRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let repo = Self {
            store,
            write_lock: Mutex::new(()),
        };
        repo.migrate_legacy();
        repo
    }

    fn migrate_legacy(&self) {
        let _guard = self.lock();
        migrate_collection(
            self.store.as_ref(),
            Collection::Reminders,
            try_migrate_legacy_reminders,
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn modify<F>(&self, change: F) -> AppResult<bool>
    where
        F: FnOnce(&mut Vec<Value>) -> AppResult<bool>,
    {
        let _guard = self.lock();
        modify_records(self.store.as_ref(), Collection::Reminders, change)
    }

    /// All reminders in insertion order
    pub fn list(&self) -> Vec<Reminder> {
        load(self.store.as_ref(), Collection::Reminders)
    }

    /// All reminders ordered by time of day, ties kept in insertion order
    pub fn list_by_time(&self) -> Vec<Reminder> {
        let mut reminders = self.list();
        reminders.sort_by_key(|r| r.time);
        reminders
    }

    pub fn get(&self, id: ReminderId) -> Option<Reminder> {
        self.list().into_iter().find(|r| r.id == id)
    }

    pub fn add(&self, new: NewReminder) -> AppResult<Reminder> {
        let reminder = new.into_reminder()?;
        let value = serde_json::to_value(&reminder)?;
        self.modify(|records| {
            records.push(value);
            Ok(true)
        })?;
        info!("Added reminder {} ({}) at {}", reminder.name, reminder.id, reminder.time);
        Ok(reminder)
    }

    /// Remove the reminder with `id`. Unknown ids are a no-op returning `false`.
    pub fn delete(&self, id: ReminderId) -> AppResult<bool> {
        self.modify(|records| {
            let before = records.len();
            records.retain(|record| record_id(record) != Some(id));
            Ok(records.len() != before)
        })
    }

    /// Record that the occurrence `stamp` was notified.
    ///
    /// Only moves `lastFired` forward. Returns `false` when the reminder is gone or
    /// already carries this or a later stamp.
    pub fn mark_fired(&self, id: ReminderId, stamp: OccurrenceStamp) -> AppResult<bool> {
        self.modify(|records| {
            let Some(record) = records.iter_mut().find(|r| record_id(r) == Some(id)) else {
                return Ok(false);
            };
            let mut reminder: Reminder = serde_json::from_value(record.clone())?;
            if reminder.last_fired.is_some_and(|last| last >= stamp) {
                return Ok(false);
            }
            reminder.last_fired = Some(stamp);
            *record = serde_json::to_value(&reminder)?;
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::Repeat;
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;
    use serde_json::json;

    fn repo() -> ReminderRepository {
        ReminderRepository::new(Arc::new(MemoryStore::new()))
    }

    fn new_reminder(name: &str, time: &str) -> NewReminder {
        NewReminder::new(name, time.parse().unwrap(), Repeat::Daily)
    }

    fn stamp(day: u32, hour: u32, minute: u32) -> OccurrenceStamp {
        OccurrenceStamp {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            hour,
            minute,
        }
    }

    #[test]
    fn test_list_keeps_insertion_order() {
        let repo = repo();
        repo.add(new_reminder("Evening", "20:00")).unwrap();
        repo.add(new_reminder("Morning", "08:00")).unwrap();

        let names: Vec<_> = repo.list().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Evening", "Morning"]);

        let by_time: Vec<_> = repo.list_by_time().into_iter().map(|r| r.name).collect();
        assert_eq!(by_time, vec!["Morning", "Evening"]);
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let repo = repo();
        repo.add(new_reminder("Aspirin", "09:00")).unwrap();

        assert!(!repo.delete(ReminderId::generate()).unwrap());
        assert_eq!(repo.list().len(), 1);
    }

    #[test]
    fn test_delete_does_not_disturb_others() {
        let repo = repo();
        let first = repo.add(new_reminder("First", "08:00")).unwrap();
        let second = repo.add(new_reminder("Second", "09:00")).unwrap();

        assert!(repo.delete(first.id).unwrap());
        assert!(repo.mark_fired(second.id, stamp(1, 9, 0)).unwrap());

        let remaining = repo.list();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second.id);
        assert_eq!(remaining[0].last_fired, Some(stamp(1, 9, 0)));
    }

    #[test]
    fn test_mark_fired_after_delete_stamps_nothing() {
        let repo = repo();
        let gone = repo.add(new_reminder("Gone", "08:00")).unwrap();
        let kept = repo.add(new_reminder("Kept", "08:00")).unwrap();
        repo.delete(gone.id).unwrap();

        assert!(!repo.mark_fired(gone.id, stamp(1, 8, 0)).unwrap());
        assert_eq!(repo.get(kept.id).unwrap().last_fired, None);
    }

    #[test]
    fn test_mark_fired_never_regresses() {
        let repo = repo();
        let r = repo.add(new_reminder("Aspirin", "09:00")).unwrap();

        assert!(repo.mark_fired(r.id, stamp(2, 9, 0)).unwrap());
        assert!(!repo.mark_fired(r.id, stamp(1, 9, 0)).unwrap());
        assert!(!repo.mark_fired(r.id, stamp(2, 9, 0)).unwrap());

        assert_eq!(repo.get(r.id).unwrap().last_fired, Some(stamp(2, 9, 0)));
    }

    #[test]
    fn test_recreated_reminder_starts_without_history() {
        let repo = repo();
        let original = repo.add(new_reminder("Aspirin", "09:00")).unwrap();
        repo.mark_fired(original.id, stamp(1, 9, 0)).unwrap();
        repo.delete(original.id).unwrap();

        let recreated = repo.add(new_reminder("Aspirin", "09:00")).unwrap();
        assert_ne!(recreated.id, original.id);
        assert_eq!(repo.get(recreated.id).unwrap().last_fired, None);
    }

    #[test]
    fn test_legacy_records_are_migrated_on_open() {
        let store = Arc::new(MemoryStore::new());
        store
            .write_all(
                Collection::Reminders,
                &[json!({
                    "name": "Aspirin",
                    "time": "09:00",
                    "dose": "100mg",
                    "repeat": "daily",
                    "start": null,
                    "lastNotified": "2024-01-01 09:00"
                })],
            )
            .unwrap();

        let repo = ReminderRepository::new(store.clone());
        let reminders = repo.list();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].last_fired, Some(stamp(1, 9, 0)));

        // Persisted with an id, so reopening keeps the same identity
        let reopened = ReminderRepository::new(store);
        assert_eq!(reopened.list()[0].id, reminders[0].id);
    }

    #[test]
    fn test_undecodable_records_survive_mutations() {
        let store = Arc::new(MemoryStore::new());
        store
            .write_all(Collection::Reminders, &[json!({"id": "not-a-uuid"})])
            .unwrap();

        let repo = ReminderRepository::new(store.clone());
        repo.add(new_reminder("Aspirin", "09:00")).unwrap();

        assert_eq!(repo.list().len(), 1);
        assert_eq!(store.read_all(Collection::Reminders).len(), 2);
    }
}
