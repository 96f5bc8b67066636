use crate::due::due_within;
use crate::error::{AppError, AppResult};
use crate::notification::{Delivery, Notifier};
use crate::reminder::ReminderId;
use crate::storage::ReminderRepository;
use chrono::{Local, NaiveDateTime};
use log::{debug, error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Source of the local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Outcome of one evaluation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub evaluated: usize,
    pub fired: Vec<(ReminderId, Delivery)>,
    /// Notifications that panicked or whose fire-state could not be persisted
    pub failures: usize,
}

struct TickRunner {
    reminders: Arc<ReminderRepository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    catch_up_minutes: u32,
    tick_lock: Mutex<()>,
}

impl TickRunner {
    fn reconfigured(&self, clock: Arc<dyn Clock>, catch_up_minutes: u32) -> Self {
        Self {
            reminders: self.reminders.clone(),
            notifier: self.notifier.clone(),
            clock,
            catch_up_minutes,
            tick_lock: Mutex::new(()),
        }
    }

    fn tick(&self) -> TickReport {
        // Manual ticks and the worker must not evaluate the same snapshot twice
        let _guard = self.tick_lock.lock().unwrap_or_else(|e| e.into_inner());

        let now = self.clock.now();
        let reminders = self.reminders.list();
        let due = due_within(now, &reminders, self.catch_up_minutes);
        debug!("Tick at {}: {} reminders, {} due", now, reminders.len(), due.len());

        let mut report = TickReport {
            evaluated: reminders.len(),
            ..TickReport::default()
        };

        for item in due {
            let reminder = item.reminder;
            let (title, body) = (reminder.title(), reminder.body());
            // A faulty notifier must not keep the other due reminders from firing. The
            // attempt still stamps the occurrence so it is not retried every tick.
            let delivery = match panic::catch_unwind(AssertUnwindSafe(|| {
                self.notifier.notify(&title, &body)
            })) {
                Ok(delivery) => {
                    info!(
                        "Reminder {} ({}) fired for {} via {:?}",
                        reminder.name, reminder.id, item.stamp, delivery
                    );
                    Some(delivery)
                }
                Err(_) => {
                    error!("Notifying reminder {} ({}) panicked", reminder.name, reminder.id);
                    report.failures += 1;
                    None
                }
            };

            match self.reminders.mark_fired(reminder.id, item.stamp) {
                Ok(true) => {
                    if let Some(delivery) = delivery {
                        report.fired.push((reminder.id, delivery));
                    }
                }
                Ok(false) => debug!("Reminder {} changed before it could be stamped", reminder.id),
                Err(e) => {
                    warn!("Failed to record firing of {}: {}", reminder.id, e);
                    report.failures += 1;
                }
            }
        }

        report
    }
}

struct Worker {
    stop_tx: mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

/// Polls the reminder repository on a fixed cadence and notifies due reminders.
///
/// Idle until [`Scheduler::start`]; starting while running replaces the worker, so at
/// most one timer is ever armed.
pub struct Scheduler {
    runner: Arc<TickRunner>,
    interval: Duration,
    worker: Option<Worker>,
}

impl Scheduler {
    pub fn new(
        reminders: Arc<ReminderRepository>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
    ) -> Self {
        Self {
            runner: Arc::new(TickRunner {
                reminders,
                notifier,
                clock: Arc::new(LocalClock),
                catch_up_minutes: 0,
                tick_lock: Mutex::new(()),
            }),
            interval,
            worker: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        let catch_up_minutes = self.runner.catch_up_minutes;
        self.runner = Arc::new(self.runner.reconfigured(clock, catch_up_minutes));
        self
    }

    /// Keep reminders due for `minutes` after their scheduled minute
    pub fn with_catch_up(mut self, minutes: u32) -> Self {
        let clock = self.runner.clock.clone();
        self.runner = Arc::new(self.runner.reconfigured(clock, minutes));
        self
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arm the recurring timer, cancelling a previous one first
    pub fn start(&mut self) -> AppResult<()> {
        if self.interval.is_zero() {
            return Err(AppError::scheduler("poll interval must be greater than zero"));
        }
        if self.is_running() {
            self.stop();
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let runner = self.runner.clone();
        let interval = self.interval;

        let thread = thread::Builder::new()
            .name("reminder-scheduler".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| runner.tick()));
                        if outcome.is_err() {
                            error!("Reminder tick panicked, continuing with the next tick");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| AppError::scheduler(format!("failed to spawn scheduler thread: {}", e)))?;

        self.worker = Some(Worker { stop_tx, thread });
        info!("Reminder scheduler started, checking every {:?}", interval);
        Ok(())
    }

    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = worker.stop_tx.send(());
        if worker.thread.join().is_err() {
            error!("Reminder scheduler thread panicked");
        }
        info!("Reminder scheduler stopped");
    }

    /// Pick up reminder changes without waiting for a process restart
    pub fn restart(&mut self) -> AppResult<()> {
        self.start()
    }

    /// Run one evaluation pass on the calling thread
    pub fn tick(&self) -> TickReport {
        self.runner.tick()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
