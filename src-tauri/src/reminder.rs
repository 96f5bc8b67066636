use crate::error::{AppError, AppResult};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identity of a reminder, assigned once at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(Uuid);

impl ReminderId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ReminderId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| AppError::validation(format!("invalid reminder id {:?}: {}", s, e)))
    }
}

/// Wall-clock time of day at minute resolution, written as `HH:MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> AppResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(AppError::validation(format!(
                "time {}:{} is out of range",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn matches(&self, now: &NaiveDateTime) -> bool {
        self.hour == now.hour() && self.minute == now.minute()
    }

    /// Minutes since midnight
    pub fn minutes_of_day(&self) -> u32 {
        self.hour * 60 + self.minute
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// One or two ASCII digits, no sign
fn clock_digits(part: &str) -> Option<u32> {
    if !(1..=2).contains(&part.len()) || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

impl FromStr for TimeOfDay {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::validation(format!("invalid time {:?}, expected HH:MM", s));
        let mut parts = s.trim().split(':');
        let hour = parts.next().and_then(clock_digits).ok_or_else(invalid)?;
        let minute = parts.next().and_then(clock_digits).ok_or_else(invalid)?;
        // Time pickers may append seconds, they are checked and dropped
        if let Some(seconds) = parts.next() {
            clock_digits(seconds).filter(|secs| *secs < 60).ok_or_else(invalid)?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

/// Repeat policy. Anything other than `once` recurs daily.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Repeat {
    Once,
    #[default]
    Daily,
    /// Free-form value from the selection control, treated as daily
    Custom(String),
}

impl Repeat {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Repeat::Once)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Repeat::Once => "once",
            Repeat::Daily => "daily",
            Repeat::Custom(value) => value.as_str(),
        }
    }
}

impl From<String> for Repeat {
    fn from(value: String) -> Self {
        match value.trim() {
            "once" => Repeat::Once,
            "daily" => Repeat::Daily,
            other => Repeat::Custom(other.to_string()),
        }
    }
}

impl From<Repeat> for String {
    fn from(repeat: Repeat) -> Self {
        repeat.as_str().to_string()
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One minute-granularity due moment: (calendar date, hour, minute).
///
/// Field order gives the chronological ordering used to keep `lastFired` monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OccurrenceStamp {
    pub date: NaiveDate,
    pub hour: u32,
    pub minute: u32,
}

impl OccurrenceStamp {
    /// The stamp for the minute containing `now`
    pub fn at(now: &NaiveDateTime) -> Self {
        Self {
            date: now.date(),
            hour: now.hour(),
            minute: now.minute(),
        }
    }

    pub fn on(date: NaiveDate, time: TimeOfDay) -> Self {
        Self {
            date,
            hour: time.hour(),
            minute: time.minute(),
        }
    }

    /// Parse the `YYYY-MM-DD HH:MM` marker written by older versions of the app
    pub fn parse_legacy(marker: &str) -> Option<Self> {
        let (date, time) = marker.trim().split_once(' ')?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        let time = time.parse::<TimeOfDay>().ok()?;
        Some(Self::on(date, time))
    }
}

impl fmt::Display for OccurrenceStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}",
            self.date.year(),
            self.date.month(),
            self.date.day(),
            self.hour,
            self.minute
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: ReminderId,
    pub name: String,
    pub time: TimeOfDay,
    #[serde(default)]
    pub dose: Option<String>,
    #[serde(default)]
    pub repeat: Repeat,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub last_fired: Option<OccurrenceStamp>,
}

impl Reminder {
    /// A reminder with a start date is inactive on every day strictly before it
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start)
    }

    pub fn title(&self) -> String {
        format!("Medicine: {}", self.name)
    }

    pub fn body(&self) -> String {
        match &self.dose {
            Some(dose) => format!("{} • {}", dose, self.time),
            None => self.time.to_string(),
        }
    }
}

/// Reminder fields as submitted by the UI, before an id is assigned
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReminder {
    pub name: String,
    pub time: TimeOfDay,
    #[serde(default)]
    pub dose: Option<String>,
    #[serde(default)]
    pub repeat: Repeat,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub start: Option<NaiveDate>,
}

impl NewReminder {
    pub fn new(name: impl Into<String>, time: TimeOfDay, repeat: Repeat) -> Self {
        Self {
            name: name.into(),
            time,
            dose: None,
            repeat,
            start: None,
        }
    }

    pub fn with_dose(mut self, dose: impl Into<String>) -> Self {
        self.dose = Some(dose.into());
        self
    }

    pub fn starting(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    /// Validate and assign a fresh id. Firing history always starts empty.
    pub fn into_reminder(self) -> AppResult<Reminder> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("reminder name must not be empty"));
        }
        let dose = self
            .dose
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Reminder {
            id: ReminderId::generate(),
            name,
            time: self.time,
            dose,
            repeat: self.repeat,
            start: self.start,
            last_fired: None,
        })
    }
}

/// Date inputs submit an empty string when left blank
pub(crate) fn blank_date_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_parse_and_display() {
        let time: TimeOfDay = "09:05".parse().unwrap();
        assert_eq!((time.hour(), time.minute()), (9, 5));
        assert_eq!(time.to_string(), "09:05");

        let with_seconds: TimeOfDay = "21:30:00".parse().unwrap();
        assert_eq!(with_seconds.to_string(), "21:30");
    }

    #[test]
    fn test_time_of_day_rejects_garbage() {
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("noon".parse::<TimeOfDay>().is_err());
        assert!("".parse::<TimeOfDay>().is_err());
        assert!("+9:00".parse::<TimeOfDay>().is_err());
        assert!("09:+5".parse::<TimeOfDay>().is_err());
        assert!("009:00".parse::<TimeOfDay>().is_err());
        assert!("09:00:junk".parse::<TimeOfDay>().is_err());
        assert!("09:00:75".parse::<TimeOfDay>().is_err());
        assert!("09:00:00:00".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_time_of_day_drops_seconds() {
        let time: TimeOfDay = "09:05:30".parse().unwrap();
        assert_eq!(time.to_string(), "09:05");
        assert_eq!("9:5".parse::<TimeOfDay>().unwrap().to_string(), "09:05");
    }

    #[test]
    fn test_repeat_other_values_recur() {
        assert!(!Repeat::from("once".to_string()).is_recurring());
        assert!(Repeat::from("daily".to_string()).is_recurring());

        let weekly = Repeat::from("weekly".to_string());
        assert_eq!(weekly, Repeat::Custom("weekly".to_string()));
        assert!(weekly.is_recurring());
    }

    #[test]
    fn test_occurrence_stamp_ordering() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let next = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let nine = OccurrenceStamp { date: day, hour: 9, minute: 0 };
        let nine_oh_one = OccurrenceStamp { date: day, hour: 9, minute: 1 };
        let early_next_day = OccurrenceStamp { date: next, hour: 0, minute: 0 };

        assert!(nine < nine_oh_one);
        assert!(nine_oh_one < early_next_day);
    }

    #[test]
    fn test_parse_legacy_marker() {
        let stamp = OccurrenceStamp::parse_legacy("2024-01-01 09:00").unwrap();
        assert_eq!(stamp.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!((stamp.hour, stamp.minute), (9, 0));
        assert_eq!(stamp.to_string(), "2024-01-01 09:00");

        assert!(OccurrenceStamp::parse_legacy("yesterday").is_none());
    }

    #[test]
    fn test_reminder_json_field_names() {
        let reminder = NewReminder::new("Aspirin", "09:00".parse().unwrap(), Repeat::Daily)
            .with_dose("100mg")
            .into_reminder()
            .unwrap();

        let json = serde_json::to_value(&reminder).unwrap();
        assert_eq!(json["name"], "Aspirin");
        assert_eq!(json["time"], "09:00");
        assert_eq!(json["repeat"], "daily");
        assert!(json.get("lastFired").is_some());
    }

    #[test]
    fn test_blank_start_is_none() {
        let raw = r#"{"name":"Iron","time":"08:00","repeat":"once","start":""}"#;
        let new: NewReminder = serde_json::from_str(raw).unwrap();
        assert_eq!(new.start, None);
    }

    #[test]
    fn test_into_reminder_validates_name_and_trims_dose() {
        let time: TimeOfDay = "08:00".parse().unwrap();
        assert!(NewReminder::new("   ", time, Repeat::Once).into_reminder().is_err());

        let reminder = NewReminder::new(" Iron ", time, Repeat::Once)
            .with_dose("  ")
            .into_reminder()
            .unwrap();
        assert_eq!(reminder.name, "Iron");
        assert_eq!(reminder.dose, None);
        assert_eq!(reminder.last_fired, None);
    }

    #[test]
    fn test_notification_text() {
        let time: TimeOfDay = "09:00".parse().unwrap();
        let plain = NewReminder::new("Aspirin", time, Repeat::Daily)
            .into_reminder()
            .unwrap();
        assert_eq!(plain.title(), "Medicine: Aspirin");
        assert_eq!(plain.body(), "09:00");

        let dosed = NewReminder::new("Aspirin", time, Repeat::Daily)
            .with_dose("2 tablets")
            .into_reminder()
            .unwrap();
        assert_eq!(dosed.body(), "2 tablets • 09:00");
    }

    #[test]
    fn test_start_gate() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let reminder = NewReminder::new("Vitamin D", "10:00".parse().unwrap(), Repeat::Daily)
            .starting(start)
            .into_reminder()
            .unwrap();

        assert!(!reminder.is_active_on(start.pred_opt().unwrap()));
        assert!(reminder.is_active_on(start));
        assert!(reminder.is_active_on(start.succ_opt().unwrap()));
    }
}
