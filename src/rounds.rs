use serde_json::{Map, Value};

use crate::attendance::format_date;
use crate::error::Result;
use crate::models::{EventAttendance, Round};

/// One round per attended event, in chronological order. Events nobody from
/// the society attended are left out. Rounds share a key by name: a later
/// round replaces an earlier one of the same name in its original position.
pub fn build_rounds(attendance: &[EventAttendance<'_>]) -> Vec<Round> {
    let rounds = attendance
        .iter()
        .filter(|entry| !entry.attendees.is_empty())
        .map(|entry| {
            let date = format_date(&entry.occurred_at);
            let name = [
                entry.event.event_subject.as_deref(),
                entry.event.event_type.as_deref(),
                Some(date.as_str()),
            ]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

            Round {
                name,
                time: entry.occurred_at.format("%H:%M:%S").to_string(),
                date,
                round_id: entry.event.id.clone(),
                participants: entry.attendees.clone(),
            }
        });

    let mut collapsed: Vec<Round> = Vec::new();
    for round in rounds {
        match collapsed.iter_mut().find(|kept| kept.name == round.name) {
            Some(kept) => *kept = round,
            None => collapsed.push(round),
        }
    }
    collapsed
}

/// JSON object keyed by round name.
pub fn rounds_json(rounds: &[Round]) -> Result<Value> {
    let mut map = Map::new();
    for round in rounds {
        map.insert(round.name.clone(), serde_json::to_value(round)?);
    }
    Ok(Value::Object(map))
}
