//! The normalized event: the single value every downstream component reasons
//! over. Construction is the only place invariants are checked; once built,
//! an `Event` never changes.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Mail,
    Chat,
    Calendar,
    File,
    Note,
    Question,
    Web,
    Task,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Request,
    Information,
    DecisionNeeded,
    ActionRequired,
    Reminder,
    Deadline,
    Reference,
    Learning,
    Insight,
    StatusUpdate,
    Error,
    Confirmation,
    Invitation,
    Reply,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// An extracted entity. Identity is `(type, lower(value))`; `confidence` and
/// `metadata` are descriptive only and play no part in equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub value: String,
    pub confidence: f64,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Entity {
    pub fn new(
        entity_type: impl Into<String>,
        value: impl Into<String>,
        confidence: f64,
    ) -> CoreResult<Self> {
        let entity_type = entity_type.into();
        let value = value.into();
        if entity_type.trim().is_empty() {
            return Err(CoreError::validation("entity type must not be empty"));
        }
        if value.trim().is_empty() {
            return Err(CoreError::validation("entity value must not be empty"));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(CoreError::validation(format!(
                "entity confidence must be in [0,1], got {confidence}"
            )));
        }
        Ok(Self {
            entity_type,
            value,
            confidence,
            metadata: HashMap::new(),
        })
    }

    fn identity_key(&self) -> (String, String) {
        (self.entity_type.clone(), self.value.to_lowercase())
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.identity_key() == other.identity_key()
    }
}
impl Eq for Entity {}

impl std::hash::Hash for Entity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identity_key().hash(state);
    }
}

/// Unvalidated event fields, as collected by a normalizer. `Event::try_new`
/// is the only path to a constructed `Event`.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub event_id: String,
    pub source: Option<EventSource>,
    pub source_id: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub perceived_at: Option<DateTime<Utc>>,
    pub title: String,
    pub content: String,
    pub event_type: Option<EventType>,
    pub urgency: Option<UrgencyLevel>,
    pub entities: Vec<Entity>,
    pub topics: Vec<String>,
    pub keywords: Vec<String>,
    pub urls: Vec<String>,
    pub to_people: Vec<String>,
    pub cc_people: Vec<String>,
    pub from_person: String,
    pub thread_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub references: Vec<String>,
    pub has_attachments: bool,
    pub attachment_count: usize,
    pub attachment_types: Vec<String>,
    pub metadata: HashMap<String, Value>,
    pub perception_confidence: f64,
    pub needs_clarification: bool,
    pub clarification_questions: Vec<String>,
}

/// Immutable, normalized representation of one input to the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    event_id: String,
    source: EventSource,
    source_id: String,
    occurred_at: DateTime<Utc>,
    received_at: DateTime<Utc>,
    perceived_at: DateTime<Utc>,
    title: String,
    content: String,
    event_type: EventType,
    urgency: UrgencyLevel,
    entities: Vec<Entity>,
    topics: Vec<String>,
    keywords: Vec<String>,
    urls: Vec<String>,
    to_people: Vec<String>,
    cc_people: Vec<String>,
    from_person: String,
    thread_id: Option<String>,
    in_reply_to: Option<String>,
    references: Vec<String>,
    has_attachments: bool,
    attachment_count: usize,
    attachment_types: Vec<String>,
    metadata: HashMap<String, Value>,
    perception_confidence: f64,
    needs_clarification: bool,
    clarification_questions: Vec<String>,
}

const FUTURE_SKEW_TOLERANCE_SECS: i64 = 1;

impl Event {
    pub fn try_new(fields: NewEvent) -> CoreResult<Self> {
        if fields.event_id.trim().is_empty() {
            return Err(CoreError::validation("event_id must not be empty"));
        }
        if fields.from_person.trim().is_empty() {
            return Err(CoreError::validation("from_person must not be empty"));
        }
        let source = fields
            .source
            .ok_or_else(|| CoreError::validation("source is required"))?;
        let event_type = fields
            .event_type
            .ok_or_else(|| CoreError::validation("event_type is required"))?;
        let urgency = fields
            .urgency
            .ok_or_else(|| CoreError::validation("urgency is required"))?;
        let occurred_at = fields
            .occurred_at
            .ok_or_else(|| CoreError::validation("occurred_at is required"))?;
        let received_at = fields
            .received_at
            .ok_or_else(|| CoreError::validation("received_at is required"))?;
        let perceived_at = fields
            .perceived_at
            .ok_or_else(|| CoreError::validation("perceived_at is required"))?;

        if !(occurred_at <= received_at && received_at <= perceived_at) {
            return Err(CoreError::validation(
                "timestamps must satisfy occurred_at <= received_at <= perceived_at",
            ));
        }
        let skew_bound = Utc::now() + Duration::seconds(FUTURE_SKEW_TOLERANCE_SECS);
        if occurred_at > skew_bound {
            return Err(CoreError::validation(
                "occurred_at is too far in the future",
            ));
        }

        if fields.has_attachments != (fields.attachment_count > 0) {
            return Err(CoreError::validation(
                "has_attachments must agree with attachment_count > 0",
            ));
        }
        if fields.attachment_types.len() != fields.attachment_count {
            return Err(CoreError::validation(
                "attachment_types length must equal attachment_count",
            ));
        }

        if !(0.0..=1.0).contains(&fields.perception_confidence) {
            return Err(CoreError::validation(format!(
                "perception_confidence must be in [0,1], got {}",
                fields.perception_confidence
            )));
        }
        for entity in &fields.entities {
            if !(0.0..=1.0).contains(&entity.confidence) {
                return Err(CoreError::validation(format!(
                    "entity '{}' confidence out of range",
                    entity.value
                )));
            }
        }

        Ok(Self {
            event_id: fields.event_id,
            source,
            source_id: fields.source_id,
            occurred_at,
            received_at,
            perceived_at,
            title: fields.title,
            content: fields.content,
            event_type,
            urgency,
            entities: fields.entities,
            topics: fields.topics,
            keywords: fields.keywords,
            urls: fields.urls,
            to_people: fields.to_people,
            cc_people: fields.cc_people,
            from_person: fields.from_person,
            thread_id: fields.thread_id,
            in_reply_to: fields.in_reply_to,
            references: fields.references,
            has_attachments: fields.has_attachments,
            attachment_count: fields.attachment_count,
            attachment_types: fields.attachment_types,
            metadata: fields.metadata,
            perception_confidence: fields.perception_confidence,
            needs_clarification: fields.needs_clarification,
            clarification_questions: fields.clarification_questions,
        })
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }
    pub fn source(&self) -> EventSource {
        self.source
    }
    pub fn source_id(&self) -> &str {
        &self.source_id
    }
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
    pub fn perceived_at(&self) -> DateTime<Utc> {
        self.perceived_at
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn content(&self) -> &str {
        &self.content
    }
    pub fn event_type(&self) -> EventType {
        self.event_type
    }
    pub fn urgency(&self) -> UrgencyLevel {
        self.urgency
    }
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }
    pub fn from_person(&self) -> &str {
        &self.from_person
    }
    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }
    pub fn perception_confidence(&self) -> f64 {
        self.perception_confidence
    }
    pub fn has_attachments(&self) -> bool {
        self.has_attachments
    }
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn get_entities_by_type(&self, entity_type: &str) -> Vec<&Entity> {
        self.entities
            .iter()
            .filter(|e| e.entity_type == entity_type)
            .collect()
    }

    pub fn has_entity(&self, entity_type: &str, value: &str) -> bool {
        let value = value.to_lowercase();
        self.entities
            .iter()
            .any(|e| e.entity_type == entity_type && e.value.to_lowercase() == value)
    }

    pub fn is_part_of_thread(&self) -> bool {
        self.thread_id.is_some()
    }

    pub fn is_urgent(&self) -> bool {
        matches!(self.urgency, UrgencyLevel::High | UrgencyLevel::Critical)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Event({}, {:?}, \"{}\")",
            self.event_id, self.source, self.title
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_fields() -> NewEvent {
        let now = Utc::now();
        NewEvent {
            event_id: "evt-1".into(),
            source: Some(EventSource::Mail),
            source_id: "src-1".into(),
            occurred_at: Some(now),
            received_at: Some(now),
            perceived_at: Some(now),
            title: "Hello".into(),
            content: String::new(),
            event_type: Some(EventType::Information),
            urgency: Some(UrgencyLevel::Low),
            from_person: "someone@example.com".into(),
            perception_confidence: 0.9,
            ..Default::default()
        }
    }

    #[test]
    fn constructs_with_valid_fields() {
        let event = Event::try_new(base_fields()).unwrap();
        assert_eq!(event.event_id(), "evt-1");
        assert!(!event.has_attachments());
    }

    #[test]
    fn rejects_empty_from_person() {
        let mut fields = base_fields();
        fields.from_person = "  ".into();
        assert!(Event::try_new(fields).is_err());
    }

    #[test]
    fn rejects_out_of_order_timestamps() {
        let mut fields = base_fields();
        fields.received_at = Some(fields.occurred_at.unwrap() - Duration::seconds(10));
        assert!(Event::try_new(fields).is_err());
    }

    #[test]
    fn rejects_future_occurred_at() {
        let mut fields = base_fields();
        let far_future = Utc::now() + Duration::seconds(120);
        fields.occurred_at = Some(far_future);
        fields.received_at = Some(far_future);
        fields.perceived_at = Some(far_future);
        assert!(Event::try_new(fields).is_err());
    }

    #[test]
    fn rejects_attachment_mismatch() {
        let mut fields = base_fields();
        fields.has_attachments = true;
        fields.attachment_count = 0;
        assert!(Event::try_new(fields).is_err());

        let mut fields = base_fields();
        fields.has_attachments = true;
        fields.attachment_count = 2;
        fields.attachment_types = vec!["pdf".into()];
        assert!(Event::try_new(fields).is_err());
    }

    #[test]
    fn entity_identity_ignores_case_and_metadata() {
        let a = Entity::new("person", "Alice@Example.com", 0.9).unwrap();
        let b = Entity::new("person", "alice@example.com", 0.2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn entity_rejects_out_of_range_confidence() {
        assert!(Entity::new("person", "Alice", 1.5).is_err());
    }

    #[test]
    fn roundtrip_serialization_is_identical() {
        let event = Event::try_new(base_fields()).unwrap();
        let json = serde_json::to_string(&event).unwrap();
        let restored: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(
            serde_json::to_string(&restored).unwrap(),
            serde_json::to_string(&event).unwrap()
        );
    }
}
