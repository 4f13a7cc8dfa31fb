//! Mail normalizer. Urgency is left to the pre-filter/reasoner downstream;
//! this normalizer only classifies structurally (reply vs. fresh request).

use chrono::{DateTime, Utc};
use cogassist_core::error::CoreResult;
use cogassist_core::event::{Entity, Event, EventSource, EventType, NewEvent, UrgencyLevel};

use super::extract_urls;

#[derive(Debug, Clone)]
pub struct MailRecord {
    pub message_id: String,
    pub source_id: String,
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub date: Option<DateTime<Utc>>,
    pub thread_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub references: Vec<String>,
    pub attachment_types: Vec<String>,
}

const FUTURE_SKEW_TOLERANCE_SECS: i64 = 1;

pub fn normalize(record: MailRecord, now: DateTime<Utc>) -> CoreResult<Event> {
    // An ambiguous or future-skewed source timestamp falls back to "now" for
    // occurred_at; the original value is preserved in metadata rather than
    // violating the ordering invariant.
    let skew_bound = now + chrono::Duration::seconds(FUTURE_SKEW_TOLERANCE_SECS);
    let mut metadata = std::collections::HashMap::new();
    let occurred_at = match record.date {
        Some(date) if date <= skew_bound => date,
        Some(date) => {
            metadata.insert(
                "source_provided_occurred_at".to_string(),
                serde_json::json!(date.to_rfc3339()),
            );
            now
        }
        None => now,
    };

    let event_type = if record.in_reply_to.is_some() {
        EventType::Reply
    } else {
        EventType::Request
    };

    let mut entities = vec![Entity::new("person", &record.from, 0.85)?];
    for to in &record.to {
        entities.push(Entity::new("person", to, 0.8)?);
    }
    for cc in &record.cc {
        entities.push(Entity::new("person", cc, 0.75)?);
    }

    let has_attachments = !record.attachment_types.is_empty();
    let attachment_count = record.attachment_types.len();

    Event::try_new(NewEvent {
        event_id: record.message_id,
        source: Some(EventSource::Mail),
        source_id: record.source_id,
        occurred_at: Some(occurred_at),
        received_at: Some(now),
        perceived_at: Some(now),
        title: record.subject,
        content: record.body.clone(),
        event_type: Some(event_type),
        urgency: Some(UrgencyLevel::None),
        entities,
        urls: extract_urls(&[], &record.body),
        to_people: record.to,
        cc_people: record.cc,
        from_person: record.from,
        thread_id: record.thread_id,
        in_reply_to: record.in_reply_to,
        references: record.references,
        has_attachments,
        attachment_count,
        attachment_types: record.attachment_types,
        metadata,
        perception_confidence: 0.7,
        ..Default::default()
    })
}
