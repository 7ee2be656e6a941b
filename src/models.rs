use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{AttendanceError, Result};
use crate::locale::Locale;

/// Event document as exported from the remote store.
///
/// `time` is kept as raw JSON so a malformed timestamp surfaces as an
/// [`AttendanceError::InvalidRecord`] for this event only, instead of failing
/// the whole cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub time: Option<Value>,
    #[serde(default)]
    pub registrations: Option<BTreeMap<String, Registration>>,
}

impl Event {
    /// Builds the `{"_seconds", "_nanoseconds"}` shape used for event times.
    pub fn time_value(seconds: i64) -> Value {
        serde_json::json!({ "_seconds": seconds, "_nanoseconds": 0 })
    }

    /// Resolves the event time, expressed in `offset`.
    pub fn occurred_at(&self, offset: &FixedOffset) -> Result<DateTime<FixedOffset>> {
        let time = self
            .time
            .as_ref()
            .filter(|value| !value.is_null())
            .ok_or_else(|| AttendanceError::invalid_record(&self.id, "missing time"))?;

        let seconds = time
            .get("_seconds")
            .or_else(|| time.get("seconds"))
            .ok_or_else(|| AttendanceError::invalid_record(&self.id, "time has no _seconds field"))?
            .as_i64()
            .ok_or_else(|| AttendanceError::invalid_record(&self.id, "_seconds is not an integer"))?;

        DateTime::from_timestamp(seconds, 0)
            .map(|utc| utc.with_timezone(offset))
            .ok_or_else(|| {
                AttendanceError::invalid_record(&self.id, format!("timestamp {seconds} out of range"))
            })
    }

    pub fn registration(&self, participant_id: &str) -> Option<&Registration> {
        self.registrations.as_ref()?.get(participant_id)
    }
}

/// Reads an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(default, deserialize_with = "null_as_default")]
    pub cancelled: bool,
    #[serde(default, rename = "cancelledOnTime", deserialize_with = "null_as_default")]
    pub cancelled_on_time: bool,
}

impl Registration {
    pub fn is_active(&self) -> bool {
        !self.cancelled && !self.cancelled_on_time
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(default, rename = "full_name_heb", deserialize_with = "null_as_default")]
    pub name_he: String,
    #[serde(default, rename = "full_name_eng", skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub club: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
}

impl Participant {
    pub fn is_novice(&self) -> bool {
        self.rank.as_deref() == Some(NOVICE_RANK)
    }

    pub fn display_name(&self, locale: Locale) -> &str {
        match locale {
            Locale::Hebrew => &self.name_he,
            Locale::English => self
                .name_en
                .as_deref()
                .filter(|name| !name.is_empty())
                .unwrap_or(&self.name_he),
        }
    }
}

pub const NOVICE_RANK: &str = "Junior";

/// Reporting window. Events must fall strictly after `start` and strictly
/// before `end`; week buckets are anchored at `start`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl DateRange {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        DateRange { start, end }
    }

    /// Midnight of both dates at the given offset.
    pub fn from_dates(start: NaiveDate, end: NaiveDate, offset: FixedOffset) -> Option<Self> {
        let midnight = |date: NaiveDate| {
            date.and_hms_opt(0, 0, 0)
                .and_then(|naive| offset.from_local_datetime(&naive).single())
        };
        Some(DateRange::new(midnight(start)?, midnight(end)?))
    }

    pub fn offset(&self) -> &FixedOffset {
        self.start.offset()
    }

    pub fn contains(&self, at: &DateTime<FixedOffset>) -> bool {
        self.start < *at && *at < self.end
    }
}

/// One in-range event with the names of the society members who attended.
#[derive(Debug, Clone)]
pub struct EventAttendance<'a> {
    pub event: &'a Event,
    pub occurred_at: DateTime<FixedOffset>,
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekBucket {
    pub label: String,
    pub week_start: DateTime<FixedOffset>,
    pub week_end: DateTime<FixedOffset>,
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipationRecord {
    pub name: String,
    pub weeks_attended: usize,
    /// Percentage in hundredths, i.e. `5000` is `50.00%`.
    pub hundredths: u32,
}

impl ParticipationRecord {
    /// Two-decimal rendering without the `%` suffix.
    pub fn formatted(&self) -> String {
        format!("{}.{:02}", self.hundredths / 100, self.hundredths % 100)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceReport {
    pub weeks: Vec<WeekBucket>,
    pub participation: Vec<ParticipationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Round {
    #[serde(skip)]
    pub name: String,
    pub date: String,
    pub time: String,
    #[serde(rename = "roundId")]
    pub round_id: String,
    pub participants: Vec<String>,
}

/// Coach feedback left for one participant on one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub event_id: String,
    pub participant_id: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub positive_feedback: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub negative_feedback: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackEntry {
    pub event_time: DateTime<FixedOffset>,
    pub score: Option<f64>,
    pub positive_feedback: String,
    pub negative_feedback: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoviceFeedback {
    #[serde(skip)]
    pub name: String,
    pub average_score: f64,
    pub events: Vec<FeedbackEntry>,
}
