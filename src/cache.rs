use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::{Event, Feedback, Participant};

pub const EVENTS_FILE: &str = "events.json";
pub const PARTICIPANTS_FILE: &str = "participants.json";
pub const FEEDBACKS_FILE: &str = "feedbacks.json";

/// Local copies of the remote collections, kept in the output directory.
#[derive(Debug, Clone)]
pub struct CachePaths {
    pub dir: PathBuf,
}

impl CachePaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CachePaths { dir: dir.into() }
    }

    pub fn events(&self) -> PathBuf {
        self.dir.join(EVENTS_FILE)
    }

    pub fn participants(&self) -> PathBuf {
        self.dir.join(PARTICIPANTS_FILE)
    }

    pub fn feedbacks(&self) -> PathBuf {
        self.dir.join(FEEDBACKS_FILE)
    }

    pub fn is_complete(&self) -> bool {
        self.events().exists() && self.participants().exists() && self.feedbacks().exists()
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn load_events(&self) -> Result<Vec<Event>> {
        read_json(&self.events())
    }

    pub fn load_participants(&self) -> Result<Vec<Participant>> {
        read_json(&self.participants())
    }

    pub fn load_feedbacks(&self) -> Result<Vec<Feedback>> {
        read_json(&self.feedbacks())
    }

    pub fn store_events(&self, events: &[Event]) -> Result<()> {
        write_json(&self.events(), events)
    }

    pub fn store_participants(&self, participants: &[Participant]) -> Result<()> {
        write_json(&self.participants(), participants)
    }

    pub fn store_feedbacks(&self, feedbacks: &[Feedback]) -> Result<()> {
        write_json(&self.feedbacks(), feedbacks)
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)?;
    let value = serde_json::from_str(&data)?;
    debug!(path = %path.display(), "loaded cache file");
    Ok(value)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_document_store_export() {
        let dir = tempdir().unwrap();
        let cache = CachePaths::new(dir.path());
        let events = serde_json::json!([
            {
                "id": "E1",
                "event_subject": "Worlds prep",
                "time": { "_seconds": 1706983200, "_nanoseconds": 0 },
                "assignments": {},
                "registrations": {
                    "P1": { "cancelled": false },
                    "P2": { "cancelled": true, "cancelledOnTime": true }
                }
            },
            { "id": "E2" }
        ]);
        let participants = serde_json::json!([
            { "id": "P1", "full_name_heb": "דנה", "full_name_eng": "Dana", "club": "IDC" }
        ]);
        fs::write(cache.events(), events.to_string()).unwrap();
        fs::write(cache.participants(), participants.to_string()).unwrap();

        let events = cache.load_events().unwrap();
        let participants = cache.load_participants().unwrap();

        assert_eq!(events.len(), 2);
        assert!(events[0].registration("P1").unwrap().is_active());
        assert!(!events[0].registration("P2").unwrap().is_active());
        assert!(events[1].registrations.is_none());
        assert_eq!(participants[0].name_en.as_deref(), Some("Dana"));
    }

    #[test]
    fn null_fields_read_as_defaults() {
        let dir = tempdir().unwrap();
        let cache = CachePaths::new(dir.path());
        let events = serde_json::json!([
            {
                "id": "E1",
                "time": { "_seconds": 1706983200, "_nanoseconds": 0 },
                "registrations": {
                    "P1": { "cancelled": null, "cancelledOnTime": null },
                    "P2": { "cancelled": true, "cancelledOnTime": null }
                }
            }
        ]);
        let participants = serde_json::json!([
            { "id": "P1", "full_name_heb": null, "full_name_eng": null, "club": null, "rank": null }
        ]);
        let feedbacks = serde_json::json!([
            { "event_id": "E1", "participant_id": "P1", "score": null, "notes": null }
        ]);
        fs::write(cache.events(), events.to_string()).unwrap();
        fs::write(cache.participants(), participants.to_string()).unwrap();
        fs::write(cache.feedbacks(), feedbacks.to_string()).unwrap();

        let events = cache.load_events().unwrap();
        let participants = cache.load_participants().unwrap();
        let feedbacks = cache.load_feedbacks().unwrap();

        assert!(events[0].registration("P1").unwrap().is_active());
        assert!(!events[0].registration("P2").unwrap().is_active());
        assert_eq!(participants[0].name_he, "");
        assert_eq!(participants[0].club, "");
        assert!(participants[0].rank.is_none());
        assert_eq!(feedbacks[0].score, None);
        assert_eq!(feedbacks[0].notes, "");
    }

    #[test]
    fn stored_cache_round_trips() {
        let dir = tempdir().unwrap();
        let cache = CachePaths::new(dir.path().join("output"));
        cache.ensure_dir().unwrap();
        let participant = Participant {
            id: "P1".to_string(),
            name_he: "דנה".to_string(),
            name_en: None,
            club: "IDC".to_string(),
            rank: None,
        };

        cache.store_participants(&[participant.clone()]).unwrap();

        assert!(!cache.is_complete());
        assert_eq!(cache.load_participants().unwrap(), vec![participant]);
    }
}
