pub mod config;
pub mod due;
pub mod error;
pub mod health;
pub mod notification;
pub mod reminder;
pub mod scheduler;
pub mod storage;

#[cfg(feature = "desktop")]
pub mod desktop;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDate;
use config::Settings;
use error::AppResult;
use health::{DateRange, Dashboard, DietItem, DiseaseRecord, HealthEntry};
use log::{info, warn};
use notification::{NotificationSink, PermissionState};
use reminder::{NewReminder, Reminder, ReminderId};
use scheduler::{Scheduler, TickReport};
use storage::{DietRepository, EntryRepository, JsonFileStore, RecordStore, ReminderRepository};
use uuid::Uuid;

/// Composition root: owns the repositories and the one reminder scheduler of the process.
pub struct HealthTracker {
    settings: Settings,
    reminders: Arc<ReminderRepository>,
    entries: EntryRepository,
    diet: DietRepository,
    permission: PermissionState,
    scheduler: Mutex<Scheduler>,
}

impl HealthTracker {
    pub fn open(settings: Settings, store: Arc<dyn RecordStore>, sink: NotificationSink) -> Self {
        let settings = settings.normalized();
        let reminders = Arc::new(ReminderRepository::new(store.clone()));
        let permission = sink.permission();

        let scheduler = Scheduler::new(
            reminders.clone(),
            Arc::new(sink),
            Duration::from_secs(settings.poll_interval_secs),
        )
        .with_catch_up(settings.catch_up_minutes);

        Self {
            entries: EntryRepository::new(store.clone()),
            diet: DietRepository::new(store),
            reminders,
            permission,
            scheduler: Mutex::new(scheduler),
            settings,
        }
    }

    /// Open the tracker on the user's data directory with console notifications
    pub fn open_default() -> AppResult<Self> {
        let (data_dir, settings) = config::resolve()?;
        let store = JsonFileStore::open(data_dir)?;
        Ok(Self::open(settings, Arc::new(store), NotificationSink::headless()))
    }

    /// Lock the scheduler, recovering from poison if needed
    fn lock_scheduler(&self) -> MutexGuard<'_, Scheduler> {
        self.scheduler.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn notification_permission(&self) -> PermissionState {
        self.permission
    }

    pub fn start(&self) -> AppResult<()> {
        self.lock_scheduler().start()
    }

    pub fn stop(&self) {
        self.lock_scheduler().stop()
    }

    pub fn is_running(&self) -> bool {
        self.lock_scheduler().is_running()
    }

    /// Evaluate reminders immediately instead of waiting for the next tick
    pub fn check_now(&self) -> TickReport {
        self.lock_scheduler().tick()
    }

    pub fn reminders(&self) -> Vec<Reminder> {
        self.reminders.list()
    }

    pub fn reminders_by_time(&self) -> Vec<Reminder> {
        self.reminders.list_by_time()
    }

    /// Store a new reminder and restart the scheduler so the next tick sees it.
    ///
    /// The reminder is stored even if the restart fails; a running worker reads the
    /// repository on every tick anyway.
    pub fn add_reminder(&self, new: NewReminder) -> AppResult<Reminder> {
        let reminder = self.reminders.add(new)?;
        if let Err(e) = self.lock_scheduler().restart() {
            warn!("Reminder {} saved but the scheduler did not restart: {}", reminder.id, e);
        }
        Ok(reminder)
    }

    pub fn delete_reminder(&self, id: ReminderId) -> AppResult<bool> {
        self.reminders.delete(id)
    }

    pub fn save_entry(&self, entry: HealthEntry) -> AppResult<HealthEntry> {
        self.entries.upsert(entry)
    }

    pub fn delete_entry(&self, date: NaiveDate) -> AppResult<bool> {
        self.entries.delete(date)
    }

    pub fn history(&self, range: DateRange) -> Vec<HealthEntry> {
        self.entries.history(range)
    }

    pub fn diseases(&self) -> Vec<DiseaseRecord> {
        self.entries.diseases()
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::from_entries(&self.entries.list(), &self.settings)
    }

    pub fn diet_items(&self) -> Vec<DietItem> {
        self.diet.list()
    }

    pub fn add_diet_item(&self, title: &str, item: &str) -> AppResult<DietItem> {
        self.diet.add(DietItem::new(title, item)?)
    }

    pub fn delete_diet_item(&self, id: Uuid) -> AppResult<bool> {
        self.diet.delete(id)
    }
}

/// Headless entry point: run the reminder scheduler until the process is killed
pub fn run() -> AppResult<()> {
    let tracker = HealthTracker::open_default()?;

    let reminders = tracker.reminders_by_time();
    info!("Loaded {} medicine reminders", reminders.len());
    for reminder in &reminders {
        info!("  {} at {} ({})", reminder.name, reminder.time, reminder.repeat);
    }

    tracker.start()?;

    loop {
        std::thread::park();
    }
}
