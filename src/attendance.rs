use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset};
use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::Result;
use crate::locale::Locale;
use crate::models::{
    AttendanceReport, DateRange, Event, EventAttendance, Participant, ParticipationRecord,
    WeekBucket,
};

pub const WEEK_DAYS: i64 = 7;

/// What to do with an event whose time cannot be read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RecordPolicy {
    #[default]
    Strict,
    SkipInvalid,
}

#[derive(Debug, Clone)]
pub struct AttendanceQuery {
    pub range: DateRange,
    pub society: String,
    pub locale: Locale,
    pub policy: RecordPolicy,
}

/// Runs filter, weekly aggregation and scoring in one go.
pub fn build_report(
    events: &[Event],
    participants: &[Participant],
    query: &AttendanceQuery,
) -> Result<AttendanceReport> {
    let attendance = filter_attendance(events, participants, query)?;
    let weeks = summarize_weekly(&attendance, &query.range);
    let participation = score_participation(&weeks);
    debug!(
        weeks = weeks.len(),
        participants = participation.len(),
        "attendance report built"
    );
    Ok(AttendanceReport {
        weeks,
        participation,
    })
}

/// Keeps events strictly inside the range and resolves which members of the
/// society attended each one. Output is ordered by event time.
pub fn filter_attendance<'a>(
    events: &'a [Event],
    participants: &[Participant],
    query: &AttendanceQuery,
) -> Result<Vec<EventAttendance<'a>>> {
    let members: Vec<&Participant> = participants
        .iter()
        .filter(|participant| participant.club == query.society)
        .collect();

    let mut attendance = Vec::new();
    for event in events {
        let occurred_at = match event.occurred_at(query.range.offset()) {
            Ok(at) => at,
            Err(error) if query.policy == RecordPolicy::SkipInvalid => {
                warn!(%error, "skipping event");
                continue;
            }
            Err(error) => return Err(error),
        };

        if !query.range.contains(&occurred_at) {
            continue;
        }

        let attendees = members
            .iter()
            .filter(|member| {
                event
                    .registration(&member.id)
                    .is_some_and(|registration| registration.is_active())
            })
            .map(|member| member.display_name(query.locale).to_string())
            .collect();

        attendance.push(EventAttendance {
            event,
            occurred_at,
            attendees,
        });
    }

    attendance.sort_by_key(|entry| entry.occurred_at);
    Ok(attendance)
}

/// Splits the range into 7-day buckets anchored at `range.start`. The last
/// bucket is emitted whole even when it runs past `range.end`.
pub fn summarize_weekly(attendance: &[EventAttendance<'_>], range: &DateRange) -> Vec<WeekBucket> {
    let mut weeks = Vec::new();
    let mut cursor = range.start;

    while cursor < range.end {
        let week_end = cursor + Duration::days(WEEK_DAYS);
        let attendees = attendance
            .iter()
            .filter(|entry| entry.occurred_at >= cursor && entry.occurred_at < week_end)
            .flat_map(|entry| entry.attendees.iter().cloned())
            .unique()
            .collect();

        weeks.push(WeekBucket {
            label: week_label(&cursor, &week_end),
            week_start: cursor,
            week_end,
            attendees,
        });
        cursor = week_end;
    }

    weeks
}

/// Share of all weeks, empty ones included, in which each name shows up.
/// Sorted by percentage descending, then by name.
pub fn score_participation(weeks: &[WeekBucket]) -> Vec<ParticipationRecord> {
    let total_weeks = weeks.len();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for week in weeks {
        for name in &week.attendees {
            *counts.entry(name.as_str()).or_insert(0) += 1;
        }
    }

    let mut records: Vec<ParticipationRecord> = counts
        .into_iter()
        .map(|(name, weeks_attended)| ParticipationRecord {
            name: name.to_string(),
            weeks_attended,
            hundredths: rounded_hundredths(weeks_attended, total_weeks),
        })
        .collect();

    records.sort_by(|a, b| {
        b.weeks_attended
            .cmp(&a.weeks_attended)
            .then_with(|| a.name.cmp(&b.name))
    });
    records
}

/// `count / total` as hundredths of a percent, rounded half up.
pub fn rounded_hundredths(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let count = count as u64;
    let total = total as u64;
    ((count * 20_000 + total) / (2 * total)) as u32
}

pub fn format_date(at: &DateTime<FixedOffset>) -> String {
    at.format("%d/%m/%Y").to_string()
}

fn week_label(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> String {
    format!("{} - {}", format_date(start), format_date(end))
}
