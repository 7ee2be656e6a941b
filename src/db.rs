use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::{Event, Feedback, Participant, Registration};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let participants = vec![
        ("debater-001", "נועה כהן", Some("Noa Cohen"), "IDC", Some("Senior")),
        ("debater-002", "איתי לוי", Some("Itai Levi"), "IDC", Some("Junior")),
        ("debater-003", "מאיה פרץ", None, "IDC", Some("Junior")),
        ("debater-004", "יונתן מזרחי", Some("Yonatan Mizrahi"), "HUJI", None),
    ];

    for (id, name_he, name_en, club, rank) in participants {
        sqlx::query(
            r#"
            INSERT INTO attendance.participants (id, full_name_heb, full_name_eng, club, rank)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET full_name_heb = EXCLUDED.full_name_heb,
                full_name_eng = EXCLUDED.full_name_eng,
                club = EXCLUDED.club,
                rank = EXCLUDED.rank
            "#,
        )
        .bind(id)
        .bind(name_he)
        .bind(name_en)
        .bind(club)
        .bind(rank)
        .execute(pool)
        .await?;
    }

    let events = vec![
        ("seed-event-001", Some("Motion workshop"), Some("Training"), (2024, 2, 3)),
        ("seed-event-002", None, Some("Tournament"), (2024, 2, 10)),
        ("seed-event-003", Some("Whip speeches"), None, (2024, 2, 24)),
    ];

    for (id, subject, event_type, (year, month, day)) in events {
        let occurred_at = Utc
            .with_ymd_and_hms(year, month, day, 18, 0, 0)
            .single()
            .context("invalid seed date")?;

        sqlx::query(
            r#"
            INSERT INTO attendance.events (id, event_subject, event_type, occurred_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(subject)
        .bind(event_type)
        .bind(occurred_at)
        .execute(pool)
        .await?;
    }

    let registrations = vec![
        ("seed-event-001", "debater-001", false, false),
        ("seed-event-001", "debater-002", true, false),
        ("seed-event-001", "debater-004", false, false),
        ("seed-event-002", "debater-001", false, false),
        ("seed-event-002", "debater-003", false, true),
        ("seed-event-003", "debater-002", false, false),
    ];

    for (event_id, participant_id, cancelled, cancelled_on_time) in registrations {
        sqlx::query(
            r#"
            INSERT INTO attendance.registrations
            (event_id, participant_id, cancelled, cancelled_on_time)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id, participant_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(participant_id)
        .bind(cancelled)
        .bind(cancelled_on_time)
        .execute(pool)
        .await?;
    }

    let feedbacks = vec![
        ("seed-event-002", "debater-003", Some(72.0), "Good rebuttals", "Ran out of time"),
        ("seed-event-003", "debater-002", None, "Confident delivery", ""),
    ];

    for (event_id, participant_id, score, positive, negative) in feedbacks {
        sqlx::query(
            r#"
            INSERT INTO attendance.feedbacks
            (event_id, participant_id, score, positive_feedback, negative_feedback)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id, participant_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(participant_id)
        .bind(score)
        .bind(positive)
        .bind(negative)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Loads every event with its registrations attached, keyed by participant id.
pub async fn fetch_events(pool: &PgPool) -> anyhow::Result<Vec<Event>> {
    let registration_rows = sqlx::query(
        "SELECT event_id, participant_id, cancelled, cancelled_on_time \
         FROM attendance.registrations",
    )
    .fetch_all(pool)
    .await?;

    let mut registrations: BTreeMap<String, BTreeMap<String, Registration>> = BTreeMap::new();
    for row in registration_rows {
        registrations
            .entry(row.get("event_id"))
            .or_default()
            .insert(
                row.get("participant_id"),
                Registration {
                    cancelled: row.get("cancelled"),
                    cancelled_on_time: row.get("cancelled_on_time"),
                },
            );
    }

    let event_rows = sqlx::query(
        "SELECT id, event_subject, event_type, occurred_at \
         FROM attendance.events \
         ORDER BY occurred_at NULLS LAST, id",
    )
    .fetch_all(pool)
    .await?;

    let mut events = Vec::new();
    for row in event_rows {
        let id: String = row.get("id");
        let occurred_at: Option<DateTime<Utc>> = row.get("occurred_at");
        events.push(Event {
            registrations: Some(registrations.remove(&id).unwrap_or_default()),
            event_subject: row.get("event_subject"),
            event_type: row.get("event_type"),
            time: occurred_at.map(|at| Event::time_value(at.timestamp())),
            id,
        });
    }

    info!(events = events.len(), "fetched events");
    Ok(events)
}

pub async fn fetch_participants(pool: &PgPool) -> anyhow::Result<Vec<Participant>> {
    let rows = sqlx::query(
        "SELECT id, full_name_heb, full_name_eng, club, rank \
         FROM attendance.participants \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let participants: Vec<Participant> = rows
        .into_iter()
        .map(|row| Participant {
            id: row.get("id"),
            name_he: row.get("full_name_heb"),
            name_en: row.get("full_name_eng"),
            club: row.get("club"),
            rank: row.get("rank"),
        })
        .collect();

    info!(participants = participants.len(), "fetched participants");
    Ok(participants)
}

pub async fn fetch_feedbacks(pool: &PgPool) -> anyhow::Result<Vec<Feedback>> {
    let rows = sqlx::query(
        "SELECT event_id, participant_id, score, positive_feedback, negative_feedback, notes \
         FROM attendance.feedbacks \
         ORDER BY event_id, participant_id",
    )
    .fetch_all(pool)
    .await?;

    let feedbacks: Vec<Feedback> = rows
        .into_iter()
        .map(|row| Feedback {
            event_id: row.get("event_id"),
            participant_id: row.get("participant_id"),
            score: row.get("score"),
            positive_feedback: row.get("positive_feedback"),
            negative_feedback: row.get("negative_feedback"),
            notes: row.get("notes"),
        })
        .collect();

    info!(feedbacks = feedbacks.len(), "fetched feedbacks");
    Ok(feedbacks)
}
