use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Months};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::attendance::RecordPolicy;
use crate::error::Result;
use crate::locale::Locale;
use crate::models::{Event, Feedback, FeedbackEntry, NoviceFeedback, Participant};

pub const FEEDBACK_FILE: &str = "novice_feedback.json";
pub const DEFAULT_MONTHS: u32 = 6;

#[derive(Debug, Clone)]
pub struct FeedbackQuery {
    pub since: DateTime<FixedOffset>,
    pub until: DateTime<FixedOffset>,
    pub locale: Locale,
    pub policy: RecordPolicy,
}

impl FeedbackQuery {
    /// Window covering the `months` calendar months up to and including `now`.
    pub fn lookback(
        now: DateTime<FixedOffset>,
        months: u32,
        locale: Locale,
        policy: RecordPolicy,
    ) -> Option<Self> {
        Some(FeedbackQuery {
            since: now.checked_sub_months(Months::new(months))?,
            until: now,
            locale,
            policy,
        })
    }
}

/// Groups feedback for novice participants on events inside the lookback
/// window. Novices without any feedback are left out; the average ignores
/// entries without a score.
pub fn build_feedback_report(
    participants: &[Participant],
    events: &[Event],
    feedback: &[Feedback],
    query: &FeedbackQuery,
) -> Result<Vec<NoviceFeedback>> {
    let offset = *query.since.offset();
    let mut event_times: HashMap<&str, DateTime<FixedOffset>> = HashMap::new();
    for event in events {
        let at = match event.occurred_at(&offset) {
            Ok(at) => at,
            Err(error) if query.policy == RecordPolicy::SkipInvalid => {
                warn!(%error, "skipping event");
                continue;
            }
            Err(error) => return Err(error),
        };
        if query.since <= at && at <= query.until {
            event_times.insert(event.id.as_str(), at);
        }
    }

    let mut report = Vec::new();
    for novice in participants.iter().filter(|participant| participant.is_novice()) {
        let mut entries: Vec<(&str, FeedbackEntry)> = feedback
            .iter()
            .filter(|item| item.participant_id == novice.id)
            .filter_map(|item| {
                let event_time = *event_times.get(item.event_id.as_str())?;
                Some((
                    item.event_id.as_str(),
                    FeedbackEntry {
                        event_time,
                        score: item.score,
                        positive_feedback: item.positive_feedback.clone(),
                        negative_feedback: item.negative_feedback.clone(),
                        notes: item.notes.clone(),
                    },
                ))
            })
            .collect();

        if entries.is_empty() {
            continue;
        }
        entries.sort_by(|a, b| a.1.event_time.cmp(&b.1.event_time).then_with(|| a.0.cmp(b.0)));
        let events: Vec<FeedbackEntry> = entries.into_iter().map(|(_, entry)| entry).collect();

        report.push(NoviceFeedback {
            name: novice.display_name(query.locale).to_string(),
            average_score: average_score(&events),
            events,
        });
    }

    debug!(novices = report.len(), "feedback report built");
    Ok(report)
}

pub fn average_score(entries: &[FeedbackEntry]) -> f64 {
    let scores: Vec<f64> = entries.iter().filter_map(|entry| entry.score).collect();
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// JSON object keyed by novice name.
pub fn feedback_json(report: &[NoviceFeedback]) -> Result<Value> {
    let mut map = Map::new();
    for novice in report {
        map.insert(novice.name.clone(), serde_json::to_value(novice)?);
    }
    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::tests::{at, event, participant};

    fn novice(id: &str) -> Participant {
        let mut novice = participant(id, "IDC");
        novice.rank = Some("Junior".to_string());
        novice
    }

    fn note(event_id: &str, participant_id: &str, score: Option<f64>) -> Feedback {
        Feedback {
            event_id: event_id.to_string(),
            participant_id: participant_id.to_string(),
            score,
            positive_feedback: "clear structure".to_string(),
            negative_feedback: String::new(),
            notes: String::new(),
        }
    }

    fn march() -> FeedbackQuery {
        FeedbackQuery::lookback(at(2024, 3, 31, 0), 1, Locale::Hebrew, RecordPolicy::Strict)
            .unwrap()
    }

    fn events() -> Vec<Event> {
        vec![
            event("E1", at(2024, 3, 5, 18), &[]),
            event("E2", at(2024, 3, 12, 18), &[]),
            event("old", at(2024, 1, 10, 18), &[]),
        ]
    }

    #[test]
    fn averages_only_scored_entries() {
        let feedback = vec![
            note("E2", "N1", Some(80.0)),
            note("E1", "N1", Some(70.0)),
            note("E1", "N1", None),
        ];

        let report = build_feedback_report(&[novice("N1")], &events(), &feedback, &march()).unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].events.len(), 3);
        assert_eq!(report[0].average_score, 75.0);
        assert_eq!(report[0].events[0].event_time, at(2024, 3, 5, 18));
    }

    #[test]
    fn unscored_feedback_averages_to_zero() {
        let feedback = vec![note("E1", "N1", None)];

        let report = build_feedback_report(&[novice("N1")], &events(), &feedback, &march()).unwrap();

        assert_eq!(report[0].average_score, 0.0);
    }

    #[test]
    fn novices_without_feedback_are_omitted() {
        let roster = vec![novice("N1"), novice("N2"), participant("S1", "IDC")];
        let feedback = vec![note("E1", "N1", Some(60.0)), note("E1", "S1", Some(90.0))];

        let report = build_feedback_report(&roster, &events(), &feedback, &march()).unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].name, "name-N1");
    }

    #[test]
    fn feedback_outside_lookback_is_ignored() {
        let feedback = vec![note("old", "N1", Some(50.0)), note("missing", "N1", Some(40.0))];

        let report = build_feedback_report(&[novice("N1")], &events(), &feedback, &march()).unwrap();

        assert!(report.is_empty());
    }

    #[test]
    fn json_is_keyed_by_name() {
        let feedback = vec![note("E1", "N1", Some(60.0))];
        let report = build_feedback_report(&[novice("N1")], &events(), &feedback, &march()).unwrap();

        let json = feedback_json(&report).unwrap();

        assert_eq!(json["name-N1"]["average_score"], 60.0);
        assert_eq!(json["name-N1"]["events"][0]["positive_feedback"], "clear structure");
    }
}
