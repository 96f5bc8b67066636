use crate::health::DietItem;
use crate::reminder::{blank_date_as_none, OccurrenceStamp, Reminder, ReminderId, Repeat, TimeOfDay};
use crate::storage::{Collection, RecordStore};
use chrono::NaiveDate;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Reminder record written before reminders had ids.
/// The dedupe marker was a `YYYY-MM-DD HH:MM` string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyReminder {
    pub name: String,
    pub time: TimeOfDay,
    #[serde(default)]
    pub dose: Option<String>,
    #[serde(default)]
    pub repeat: Repeat,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub last_notified: Option<String>,
}

/// Diet item written before diet items had ids
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyDietItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub item: String,
}

fn is_legacy(record: &Value) -> bool {
    record.is_object() && record.get("id").is_none()
}

/// Migrate a legacy reminder to the current format
pub fn migrate_legacy_reminder(legacy: LegacyReminder) -> Reminder {
    Reminder {
        id: ReminderId::generate(),
        name: legacy.name.trim().to_string(),
        time: legacy.time,
        dose: legacy
            .dose
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        repeat: legacy.repeat,
        start: legacy.start,
        last_fired: legacy
            .last_notified
            .as_deref()
            .and_then(OccurrenceStamp::parse_legacy),
    }
}

pub fn migrate_legacy_diet_item(legacy: LegacyDietItem) -> DietItem {
    DietItem {
        id: Uuid::new_v4(),
        title: legacy.title.trim().to_string(),
        item: legacy.item.trim().to_string(),
    }
}

/// Upgrade any legacy records, keeping their positions.
///
/// Returns `None` when every record is already current. Legacy records that cannot be
/// decoded are left untouched for the typed loader to skip.
fn migrate_records<L, T>(records: &[Value], upgrade: fn(L) -> T) -> Option<Vec<Value>>
where
    L: DeserializeOwned,
    T: Serialize,
{
    if !records.iter().any(is_legacy) {
        return None;
    }

    let migrated = records
        .iter()
        .map(|record| {
            if !is_legacy(record) {
                return record.clone();
            }
            serde_json::from_value::<L>(record.clone())
                .ok()
                .map(upgrade)
                .and_then(|current| serde_json::to_value(current).ok())
                .unwrap_or_else(|| record.clone())
        })
        .collect();

    Some(migrated)
}

pub fn try_migrate_legacy_reminders(records: &[Value]) -> Option<Vec<Value>> {
    migrate_records(records, migrate_legacy_reminder)
}

pub fn try_migrate_legacy_diet(records: &[Value]) -> Option<Vec<Value>> {
    migrate_records(records, migrate_legacy_diet_item)
}

/// Rewrite `collection` in the current format, keeping a backup of what was there.
/// Failures are logged; the typed loaders still skip whatever stays unreadable.
pub fn migrate_collection(
    store: &dyn RecordStore,
    collection: Collection,
    migrate: fn(&[Value]) -> Option<Vec<Value>>,
) {
    let raw = store.read_all(collection);
    let Some(migrated) = migrate(&raw) else {
        return;
    };
    if migrated == raw {
        return;
    }

    info!(
        "Detected legacy {} format, migrating {} records",
        collection.key(),
        raw.len()
    );
    if let Err(e) = store.backup(collection, &raw) {
        warn!("Failed to back up legacy {}: {}", collection.key(), e);
    }
    if let Err(e) = store.write_all(collection, &migrated) {
        warn!("Failed to save migrated {}: {}", collection.key(), e);
    }
}
