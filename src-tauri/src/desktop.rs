//! Tauri integration, compiled with the `desktop` feature.
//!
//! The host application registers `tauri_plugin_notification::init()` and
//! `tauri_plugin_dialog::init()` before [`init`], the tracker needs both on setup.

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::health::{DateRange, Dashboard, DietItem, DiseaseRecord, HealthEntry};
use crate::notification::{FallbackAlert, NativeNotifier, NotificationSink, PermissionState};
use crate::reminder::{NewReminder, Reminder, ReminderId};
use crate::storage::JsonFileStore;
use crate::HealthTracker;
use chrono::NaiveDate;
use log::{info, warn};
use std::sync::Arc;
use tauri::plugin::{Builder, PermissionState as TauriPermission, TauriPlugin};
use tauri::{AppHandle, Manager, Runtime, State};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tauri_plugin_notification::NotificationExt;
use uuid::Uuid;

fn from_tauri(state: TauriPermission) -> PermissionState {
    match state {
        TauriPermission::Granted => PermissionState::Granted,
        TauriPermission::Denied => PermissionState::Denied,
        _ => PermissionState::Unknown,
    }
}

/// System notifications through `tauri-plugin-notification`
pub struct TauriNotifier<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> NativeNotifier for TauriNotifier<R> {
    fn permission_state(&self) -> PermissionState {
        match self.app.notification().permission_state() {
            Ok(state) => from_tauri(state),
            Err(e) => {
                warn!("Notification permission query failed: {}", e);
                PermissionState::Unsupported
            }
        }
    }

    fn request_permission(&self) -> PermissionState {
        match self.app.notification().request_permission() {
            Ok(state) => from_tauri(state),
            Err(e) => {
                warn!("Notification permission request failed: {}", e);
                PermissionState::Denied
            }
        }
    }

    fn show(&self, title: &str, body: &str) -> AppResult<()> {
        self.app
            .notification()
            .builder()
            .title(title)
            .body(body)
            .show()
            .map_err(|e| AppError::notification(e.to_string()))
    }
}

/// Message dialog fallback. `show` returns immediately, so the scheduler thread never
/// waits for the user to dismiss it.
pub struct DialogAlert<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> FallbackAlert for DialogAlert<R> {
    fn alert(&self, title: &str, body: &str) {
        self.app
            .dialog()
            .message(body)
            .title(title)
            .kind(MessageDialogKind::Info)
            .show(|_| {});
    }
}

fn open_tracker<R: Runtime>(app: &AppHandle<R>) -> AppResult<HealthTracker> {
    let base = app
        .path()
        .app_local_data_dir()
        .map_err(|e| AppError::config(e.to_string()))?;
    std::fs::create_dir_all(&base)?;

    let settings = Settings::load(&base);
    let data_dir = settings.data_dir.clone().unwrap_or(base);
    let store = JsonFileStore::open(&data_dir)?;
    info!("Health tracker storing data in {}", data_dir.display());

    let sink = NotificationSink::new(
        Some(Box::new(TauriNotifier { app: app.clone() })),
        Box::new(DialogAlert { app: app.clone() }),
    );
    Ok(HealthTracker::open(settings, Arc::new(store), sink))
}

#[tauri::command]
fn list_reminders(tracker: State<'_, HealthTracker>) -> Result<Vec<Reminder>, String> {
    Ok(tracker.reminders_by_time())
}

#[tauri::command]
fn add_reminder(
    tracker: State<'_, HealthTracker>,
    reminder: NewReminder,
) -> Result<Reminder, String> {
    Ok(tracker.add_reminder(reminder)?)
}

#[tauri::command]
fn delete_reminder(tracker: State<'_, HealthTracker>, id: ReminderId) -> Result<bool, String> {
    Ok(tracker.delete_reminder(id)?)
}

#[tauri::command]
fn check_reminders_now(tracker: State<'_, HealthTracker>) -> Result<usize, String> {
    Ok(tracker.check_now().fired.len())
}

#[tauri::command]
fn get_notification_permission(
    tracker: State<'_, HealthTracker>,
) -> Result<PermissionState, String> {
    Ok(tracker.notification_permission())
}

#[tauri::command]
fn save_entry(
    tracker: State<'_, HealthTracker>,
    entry: HealthEntry,
) -> Result<HealthEntry, String> {
    Ok(tracker.save_entry(entry)?)
}

#[tauri::command]
fn delete_entry(tracker: State<'_, HealthTracker>, date: NaiveDate) -> Result<bool, String> {
    Ok(tracker.delete_entry(date)?)
}

#[tauri::command]
fn get_history(
    tracker: State<'_, HealthTracker>,
    range: Option<DateRange>,
) -> Result<Vec<HealthEntry>, String> {
    Ok(tracker.history(range.unwrap_or_default()))
}

#[tauri::command]
fn get_diseases(tracker: State<'_, HealthTracker>) -> Result<Vec<DiseaseRecord>, String> {
    Ok(tracker.diseases())
}

#[tauri::command]
fn get_dashboard(tracker: State<'_, HealthTracker>) -> Result<Dashboard, String> {
    Ok(tracker.dashboard())
}

#[tauri::command]
fn get_entry_template() -> Result<HealthEntry, String> {
    Ok(HealthEntry::today_template())
}

#[tauri::command]
fn list_diet_items(tracker: State<'_, HealthTracker>) -> Result<Vec<DietItem>, String> {
    Ok(tracker.diet_items())
}

#[tauri::command]
fn add_diet_item(
    tracker: State<'_, HealthTracker>,
    title: String,
    item: String,
) -> Result<DietItem, String> {
    Ok(tracker.add_diet_item(&title, &item)?)
}

#[tauri::command]
fn delete_diet_item(tracker: State<'_, HealthTracker>, id: Uuid) -> Result<bool, String> {
    Ok(tracker.delete_diet_item(id)?)
}

/// Plugin that opens the tracker in the app-local data dir and starts the scheduler
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("health-tracker")
        .invoke_handler(tauri::generate_handler![
            list_reminders,
            add_reminder,
            delete_reminder,
            check_reminders_now,
            get_notification_permission,
            save_entry,
            delete_entry,
            get_history,
            get_diseases,
            get_dashboard,
            get_entry_template,
            list_diet_items,
            add_diet_item,
            delete_diet_item,
        ])
        .setup(|app, _api| {
            let tracker = open_tracker(app)?;
            tracker.start()?;
            app.manage(tracker);
            Ok(())
        })
        .build()
}
