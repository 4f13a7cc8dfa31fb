//! Chat normalizer: explicit importance maps directly onto urgency, and a
//! mention raises it by one level.

use chrono::{DateTime, Utc};
use cogassist_core::error::CoreResult;
use cogassist_core::event::{Entity, Event, EventSource, EventType, NewEvent, UrgencyLevel};

use super::extract_urls;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatImportance {
    Low,
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone)]
pub struct ChatRecord {
    pub message_id: String,
    pub source_id: String,
    pub from: String,
    pub room_id: String,
    pub mentions: Vec<String>,
    pub importance: ChatImportance,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub thread_id: Option<String>,
    pub addressed_to_me: bool,
}

fn base_urgency(importance: ChatImportance) -> UrgencyLevel {
    match importance {
        ChatImportance::Low => UrgencyLevel::Low,
        ChatImportance::Normal => UrgencyLevel::Medium,
        ChatImportance::High => UrgencyLevel::High,
        ChatImportance::Urgent => UrgencyLevel::Critical,
    }
}

fn raise_one_level(urgency: UrgencyLevel) -> UrgencyLevel {
    match urgency {
        UrgencyLevel::None => UrgencyLevel::Low,
        UrgencyLevel::Low => UrgencyLevel::Medium,
        UrgencyLevel::Medium => UrgencyLevel::High,
        UrgencyLevel::High => UrgencyLevel::Critical,
        UrgencyLevel::Critical => UrgencyLevel::Critical,
    }
}

pub fn normalize(record: ChatRecord, now: DateTime<Utc>) -> CoreResult<Event> {
    let mut urgency = base_urgency(record.importance);
    if record.addressed_to_me || !record.mentions.is_empty() {
        urgency = raise_one_level(urgency);
    }

    let mut entities = vec![Entity::new("person", &record.from, 0.9)?];
    for mention in &record.mentions {
        entities.push(Entity::new("mention", mention, 0.9)?);
    }

    Event::try_new(NewEvent {
        event_id: record.message_id,
        source: Some(EventSource::Chat),
        source_id: record.source_id,
        occurred_at: Some(record.timestamp),
        received_at: Some(now),
        perceived_at: Some(now),
        title: format!("Message in {}", record.room_id),
        content: record.content.clone(),
        event_type: Some(EventType::Information),
        urgency: Some(urgency),
        entities,
        urls: extract_urls(&[], &record.content),
        from_person: record.from,
        thread_id: record.thread_id.or(Some(record.room_id)),
        perception_confidence: 0.9,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_record() -> ChatRecord {
        ChatRecord {
            message_id: "c1".into(),
            source_id: "room-1".into(),
            from: "alice".into(),
            room_id: "general".into(),
            mentions: vec![],
            importance: ChatImportance::Normal,
            content: "hey".into(),
            timestamp: Utc::now(),
            thread_id: None,
            addressed_to_me: false,
        }
    }

    #[test]
    fn mention_raises_urgency_by_one_level() {
        let now = Utc::now();
        let mut record = base_record();
        record.mentions = vec!["me".into()];
        let event = normalize(record, now).unwrap();
        assert_eq!(event.urgency(), UrgencyLevel::High);
    }

    #[test]
    fn urgent_importance_stays_critical_even_with_mention() {
        let now = Utc::now();
        let mut record = base_record();
        record.importance = ChatImportance::Urgent;
        record.mentions = vec!["me".into()];
        let event = normalize(record, now).unwrap();
        assert_eq!(event.urgency(), UrgencyLevel::Critical);
    }

    #[test]
    fn plain_message_maps_importance_directly() {
        let now = Utc::now();
        let event = normalize(base_record(), now).unwrap();
        assert_eq!(event.urgency(), UrgencyLevel::Medium);
    }
}
