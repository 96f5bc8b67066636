//! Decides which reminders are due at a given wall-clock instant.
//!
//! Both evaluators are pure: they never touch storage, so calling them repeatedly with the
//! same input yields the same answer until `lastFired` is stamped.

use crate::reminder::{OccurrenceStamp, Reminder, Repeat};
use chrono::{NaiveDateTime, NaiveTime, Timelike};

/// A reminder that should be notified now, and the occurrence it is being notified for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Due<'a> {
    pub reminder: &'a Reminder,
    pub stamp: OccurrenceStamp,
}

fn already_fired_once(reminder: &Reminder) -> bool {
    reminder.repeat == Repeat::Once && reminder.last_fired.is_some()
}

/// Reminders whose time of day equals the current minute and that have not been
/// notified for this minute yet.
///
/// A minute that passes between two evaluations is never fired retroactively.
pub fn due_now(now: NaiveDateTime, reminders: &[Reminder]) -> Vec<Due<'_>> {
    let stamp = OccurrenceStamp::at(&now);

    reminders
        .iter()
        .filter(|r| r.is_active_on(now.date()))
        .filter(|r| !already_fired_once(r))
        .filter(|r| r.last_fired != Some(stamp))
        .filter(|r| r.time.matches(&now))
        .map(|reminder| Due { reminder, stamp })
        .collect()
}

/// Like [`due_now`], but a reminder stays due for `catch_up_minutes` after its scheduled
/// minute. The stamp is the scheduled minute, so one occurrence fires once however many
/// evaluations land inside the window. Zero behaves exactly like [`due_now`].
pub fn due_within(now: NaiveDateTime, reminders: &[Reminder], catch_up_minutes: u32) -> Vec<Due<'_>> {
    if catch_up_minutes == 0 {
        return due_now(now, reminders);
    }

    let now = now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now);

    reminders
        .iter()
        .filter(|r| !already_fired_once(r))
        .filter_map(|reminder| {
            let time = NaiveTime::from_hms_opt(reminder.time.hour(), reminder.time.minute(), 0)?;
            // Most recent scheduled moment at or before now, possibly yesterday
            let date = if time <= now.time() {
                now.date()
            } else {
                now.date().pred_opt()?
            };
            let scheduled = date.and_time(time);
            if (now - scheduled).num_minutes() > i64::from(catch_up_minutes) {
                return None;
            }
            if !reminder.is_active_on(date) {
                return None;
            }

            let stamp = OccurrenceStamp::on(date, reminder.time);
            if reminder.last_fired.is_some_and(|last| last >= stamp) {
                return None;
            }
            Some(Due { reminder, stamp })
        })
        .collect()
}
