//! Time-of-day and day-of-week context for feed items
//!
//! Works from the item's free text first (French and English vocabulary), then
//! from its schedule, then from its event start time.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Timelike, Utc, Weekday};
use serde::Serialize;

use super::model::CandidateItem;

const MORNING_KEYWORDS: &[&str] = &[
    "matin", "petit-déjeuner", "café", "brunch", "breakfast", "morning", "coffee",
];

const LUNCH_KEYWORDS: &[&str] = &["déjeuner", "midi", "lunch"];

const EVENING_KEYWORDS: &[&str] = &[
    "soir", "dîner", "nuit", "afterwork", "dinner", "evening", "night",
];

const WEEKEND_KEYWORDS: &[&str] = &[
    "weekend", "week-end", "samedi", "dimanche", "fin de semaine", "saturday", "sunday",
];

const WEEKDAY_KEYWORDS: &[&str] = &[
    "semaine", "lundi", "mardi", "mercredi", "jeudi", "vendredi", "weekday", "monday",
    "tuesday", "wednesday", "thursday", "friday",
];

/// Day-name prefixes found in schedule entries ("sam.", "Sat", "lundi")
const WEEKEND_DAY_PREFIXES: &[&str] = &["sam", "dim", "sat", "sun"];
const WEEKDAY_DAY_PREFIXES: &[&str] = &[
    "lun", "mar", "mer", "jeu", "ven", "mon", "tue", "wed", "thu", "fri",
];

/// Part of the day an item is relevant for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPart {
    /// 06:00 - 10:59
    Morning,
    /// 11:00 - 13:59
    Lunch,
    /// 18:00 - 22:59
    Evening,
}

impl DayPart {
    pub fn from_hour(hour: u32) -> Option<Self> {
        match hour {
            6..=10 => Some(DayPart::Morning),
            11..=13 => Some(DayPart::Lunch),
            18..=22 => Some(DayPart::Evening),
            _ => None,
        }
    }
}

/// Which parts of the day an item speaks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeContext {
    pub morning: bool,
    pub lunch: bool,
    pub evening: bool,
}

impl TimeContext {
    pub fn only(part: DayPart) -> Self {
        Self {
            morning: part == DayPart::Morning,
            lunch: part == DayPart::Lunch,
            evening: part == DayPart::Evening,
        }
    }

    pub fn has(&self, part: DayPart) -> bool {
        match part {
            DayPart::Morning => self.morning,
            DayPart::Lunch => self.lunch,
            DayPart::Evening => self.evening,
        }
    }

    fn is_empty(&self) -> bool {
        !(self.morning || self.lunch || self.evening)
    }
}

/// Derive the item's time-of-day context, or `None` when nothing applies
pub fn time_context(item: &CandidateItem) -> Option<TimeContext> {
    let text = searchable_text(item);
    let from_text = TimeContext {
        morning: contains_any(&text, MORNING_KEYWORDS),
        lunch: contains_any(&text, LUNCH_KEYWORDS),
        evening: contains_any(&text, EVENING_KEYWORDS),
    };
    if !from_text.is_empty() {
        return Some(from_text);
    }

    let schedule_hour = item
        .schedule
        .first()
        .and_then(|entry| entry.time_range.as_deref())
        .and_then(schedule_start_hour);
    if let Some(part) = schedule_hour.and_then(DayPart::from_hour) {
        return Some(TimeContext::only(part));
    }

    item.event_date
        .and_then(|date| DayPart::from_hour(date.hour()))
        .map(TimeContext::only)
}

/// True if the item runs on a Saturday/Sunday or talks about the weekend
pub fn is_weekend_oriented(item: &CandidateItem) -> bool {
    schedule_mentions_day(item, WEEKEND_DAY_PREFIXES)
        || contains_any(&searchable_text(item), WEEKEND_KEYWORDS)
}

/// True if the item runs Monday to Friday or talks about the working week
pub fn is_weekday_oriented(item: &CandidateItem) -> bool {
    schedule_mentions_day(item, WEEKDAY_DAY_PREFIXES)
        || contains_any(&searchable_text(item), WEEKDAY_KEYWORDS)
}

pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Wall-clock time at `offset` for an absolute instant
pub fn local_time(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDateTime {
    now.with_timezone(&offset).naive_local()
}

/// Local wall-clock hour and whether the local day is a weekend day
pub fn local_clock(now: DateTime<Utc>, offset: FixedOffset) -> (u32, bool) {
    let local = local_time(now, offset);
    (local.hour(), is_weekend(local.weekday()))
}

/// Start hour of a range such as "18:00 - 23:00" or "9h30-12h"
fn schedule_start_hour(range: &str) -> Option<u32> {
    let (start, _) = range.split_once('-')?;
    let digits: String = start
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().filter(|h| *h < 24)
}

fn schedule_mentions_day(item: &CandidateItem, prefixes: &[&str]) -> bool {
    item.schedule.iter().any(|entry| {
        entry.day.as_deref().is_some_and(|day| {
            let day = day.to_lowercase();
            prefixes.iter().any(|p| day.contains(p))
        })
    })
}

fn searchable_text(item: &CandidateItem) -> String {
    let mut text = item.content.to_lowercase();
    if let Some(title) = &item.title {
        text.push(' ');
        text.push_str(&title.to_lowercase());
    }
    text
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}
