//! Daily health entries, diet items and the metrics derived for the dashboard.

use crate::config::{Settings, SHORT_SLEEP_HOURS};
use crate::error::{AppError, AppResult};
use crate::reminder::blank_date_as_none;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// One day of self-tracked measurements. At most one entry exists per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthEntry {
    pub date: NaiveDate,
    /// Kilograms
    #[serde(default)]
    pub weight: Option<f64>,
    /// Centimetres
    #[serde(default)]
    pub height: Option<f64>,
    /// Millilitres
    #[serde(default)]
    pub water: Option<f64>,
    /// Hours
    #[serde(default)]
    pub sleep: Option<f64>,
    #[serde(default)]
    pub disease: Option<String>,
}

impl HealthEntry {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            weight: None,
            height: None,
            water: None,
            sleep: None,
            disease: None,
        }
    }

    /// Pre-filled entry for today with typical water and sleep values
    pub fn today_template() -> Self {
        Self {
            water: Some(1500.0),
            sleep: Some(7.5),
            ..Self::new(Local::now().date_naive())
        }
    }

    pub fn validated(mut self) -> AppResult<Self> {
        for (field, value) in [
            ("weight", self.weight),
            ("height", self.height),
            ("water", self.water),
            ("sleep", self.sleep),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(AppError::validation(format!(
                        "{} must be a non-negative number, got {}",
                        field, v
                    )));
                }
            }
        }
        if self.sleep.is_some_and(|h| h > 24.0) {
            return Err(AppError::validation("sleep cannot exceed 24 hours"));
        }
        self.disease = self
            .disease
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok(self)
    }

    pub fn bmi(&self) -> Option<f64> {
        bmi(self.weight, self.height)
    }
}

/// A diagnosis noted in an entry, with the most recent date it was recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseRecord {
    pub disease: String,
    pub date: NaiveDate,
}

/// Unique diseases across `entries`, most recently recorded first
pub fn diseases(entries: &[HealthEntry]) -> Vec<DiseaseRecord> {
    let mut noted: Vec<_> = entries
        .iter()
        .filter_map(|e| {
            let disease = e.disease.as_deref()?.trim();
            (!disease.is_empty()).then(|| DiseaseRecord {
                disease: disease.to_string(),
                date: e.date,
            })
        })
        .collect();
    noted.sort_by(|a, b| b.date.cmp(&a.date));

    let mut seen = HashSet::new();
    noted.retain(|d| seen.insert(d.disease.clone()));
    noted
}

/// Body mass index from kilograms and centimetres. Missing or zero inputs give `None`.
pub fn bmi(weight_kg: Option<f64>, height_cm: Option<f64>) -> Option<f64> {
    let weight = weight_kg.filter(|w| *w > 0.0)?;
    let height_m = height_cm.filter(|h| *h > 0.0)? / 100.0;
    Some(weight / (height_m * height_m))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }

    pub fn tip(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Consider a balanced calorie-rich diet.",
            BmiCategory::Normal => "Great! Keep exercising and eating well.",
            BmiCategory::Overweight => "Try moderate activity and control portions.",
            BmiCategory::Obese => "Speak with a healthcare provider for a plan.",
        }
    }
}

/// Progress toward a daily goal, percent rounded and capped at 100
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub value: f64,
    pub goal: f64,
    pub percent: u32,
}

impl Progress {
    pub fn new(value: f64, goal: f64) -> Self {
        let value = value.max(0.0);
        let percent = if goal > 0.0 {
            ((value / goal) * 100.0).round().min(100.0) as u32
        } else {
            0
        };
        Self {
            value,
            goal,
            percent,
        }
    }
}

/// Everything the dashboard panel shows, derived from the latest entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub date: Option<NaiveDate>,
    pub bmi: Option<f64>,
    pub bmi_category: Option<BmiCategory>,
    pub bmi_tip: &'static str,
    pub water: Progress,
    pub water_tip: &'static str,
    pub sleep: Progress,
    pub sleep_tip: &'static str,
    pub diseases: Vec<DiseaseRecord>,
}

impl Dashboard {
    pub fn from_entries(entries: &[HealthEntry], settings: &Settings) -> Self {
        let latest = entries.iter().max_by_key(|e| e.date);
        let Some(latest) = latest else {
            return Self {
                date: None,
                bmi: None,
                bmi_category: None,
                bmi_tip: "Add your first entry today.",
                water: Progress::new(0.0, settings.water_goal_ml),
                water_tip: "",
                sleep: Progress::new(0.0, settings.sleep_goal_hours),
                sleep_tip: "",
                diseases: Vec::new(),
            };
        };

        let bmi = latest.bmi();
        let bmi_category = bmi.map(BmiCategory::from_bmi);
        let water = Progress::new(latest.water.unwrap_or(0.0), settings.water_goal_ml);
        let sleep = Progress::new(latest.sleep.unwrap_or(0.0), settings.sleep_goal_hours);

        Self {
            date: Some(latest.date),
            bmi,
            bmi_category,
            bmi_tip: bmi_category.map_or("Enter weight and height.", |c| c.tip()),
            water,
            water_tip: if water.percent < 50 {
                "Keep sipping, aim for small frequent amounts."
            } else {
                "Good! Keep a steady intake."
            },
            sleep,
            sleep_tip: if sleep.value < SHORT_SLEEP_HOURS {
                "Try to add 30 to 60 minutes of sleep for recovery."
            } else {
                "Nice rest! Maintain a regular schedule."
            },
            diseases: diseases(entries),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietItem {
    pub id: Uuid,
    pub title: String,
    pub item: String,
}

impl DietItem {
    pub fn new(title: &str, item: &str) -> AppResult<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::validation("diet title must not be empty"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            item: item.trim().to_string(),
        })
    }
}

/// Inclusive date filter used by the history view
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}
