//! Calendar normalizer: the one source where urgency is purely temporal.

use chrono::{DateTime, Utc};
use cogassist_core::error::CoreResult;
use cogassist_core::event::{Entity, Event, EventSource, EventType, NewEvent, UrgencyLevel};

use super::extract_urls;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    NotResponded,
    Accepted,
    Declined,
    Tentative,
}

impl ResponseStatus {
    fn is_responded(self) -> bool {
        !matches!(self, ResponseStatus::NotResponded)
    }
}

#[derive(Debug, Clone)]
pub struct CalendarRecord {
    pub event_id: String,
    pub source_id: String,
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub organizer: String,
    pub attendees: Vec<String>,
    pub response_status: ResponseStatus,
    pub location: Option<String>,
    pub online_meeting_url: Option<String>,
}

/// Temporal urgency policy: past events are `None`; an in-progress meeting
/// is `Medium`, or `High` if the user hasn't responded yet; otherwise the
/// urgency steps up as the start time approaches, at the 1h/4h/12h/24h
/// boundaries, with the sub-24h band further split by response status.
pub fn compute_urgency(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>, response_status: ResponseStatus) -> UrgencyLevel {
    if end < now {
        return UrgencyLevel::None;
    }
    if start <= now && now <= end {
        return if response_status.is_responded() {
            UrgencyLevel::Medium
        } else {
            UrgencyLevel::High
        };
    }

    let until_start = start - now;
    if until_start <= chrono::Duration::hours(1) {
        UrgencyLevel::Critical
    } else if until_start <= chrono::Duration::hours(4) {
        UrgencyLevel::High
    } else if until_start <= chrono::Duration::hours(12) {
        UrgencyLevel::Medium
    } else if until_start <= chrono::Duration::hours(24) {
        if response_status.is_responded() {
            UrgencyLevel::Low
        } else {
            UrgencyLevel::Medium
        }
    } else {
        UrgencyLevel::Low
    }
}

const FUTURE_SKEW_TOLERANCE_SECS: i64 = 1;

pub fn normalize(record: CalendarRecord, now: DateTime<Utc>) -> CoreResult<Event> {
    let urgency = compute_urgency(now, record.start, record.end, record.response_status);
    let event_type = if !record.response_status.is_responded() {
        EventType::DecisionNeeded
    } else {
        EventType::Invitation
    };

    // A meeting's start is routinely in the future; occurred_at must still
    // satisfy the ordering invariant against received_at/perceived_at, so a
    // start beyond the skew bound falls back to "now" here too, same as the
    // mail normalizer. Urgency above is computed from the real start time.
    let skew_bound = now + chrono::Duration::seconds(FUTURE_SKEW_TOLERANCE_SECS);
    let mut metadata = std::collections::HashMap::new();
    let occurred_at = if record.start <= skew_bound {
        record.start
    } else {
        metadata.insert(
            "source_provided_occurred_at".to_string(),
            serde_json::json!(record.start.to_rfc3339()),
        );
        now
    };

    let mut entities = vec![Entity::new("person", &record.organizer, 0.9)?];
    entities
        .last_mut()
        .unwrap()
        .metadata
        .insert("role".into(), serde_json::json!("organizer"));
    for attendee in &record.attendees {
        entities.push(Entity::new("person", attendee, 0.9)?);
    }
    if let Some(location) = &record.location {
        entities.push(Entity::new("location", location, 0.85)?);
    }
    entities.push(Entity::new(
        "datetime",
        record.start.to_rfc3339(),
        0.95,
    )?);

    let urls = extract_urls(&[record.online_meeting_url.as_deref()], &record.description);

    Event::try_new(NewEvent {
        event_id: record.event_id,
        source: Some(EventSource::Calendar),
        source_id: record.source_id,
        occurred_at: Some(occurred_at),
        received_at: Some(now),
        perceived_at: Some(now),
        title: record.title,
        content: record.description,
        event_type: Some(event_type),
        urgency: Some(urgency),
        entities,
        urls,
        from_person: record.organizer,
        to_people: record.attendees,
        metadata,
        perception_confidence: 0.9,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn past_event_is_no_urgency() {
        let now = Utc::now();
        let start = now - Duration::hours(3);
        let end = now - Duration::hours(2);
        assert_eq!(
            compute_urgency(now, start, end, ResponseStatus::Accepted),
            UrgencyLevel::None
        );
    }

    #[test]
    fn in_progress_not_responded_is_high() {
        let now = Utc::now();
        let start = now - Duration::minutes(10);
        let end = now + Duration::minutes(20);
        assert_eq!(
            compute_urgency(now, start, end, ResponseStatus::NotResponded),
            UrgencyLevel::High
        );
    }

    #[test]
    fn in_progress_responded_is_medium() {
        let now = Utc::now();
        let start = now - Duration::minutes(10);
        let end = now + Duration::minutes(20);
        assert_eq!(
            compute_urgency(now, start, end, ResponseStatus::Accepted),
            UrgencyLevel::Medium
        );
    }

    #[test]
    fn boundary_transitions_are_exact() {
        let now = Utc::now();
        let end = now + Duration::days(2);
        assert_eq!(
            compute_urgency(now, now + Duration::minutes(59), end, ResponseStatus::Accepted),
            UrgencyLevel::Critical
        );
        assert_eq!(
            compute_urgency(now, now + Duration::hours(3), end, ResponseStatus::Accepted),
            UrgencyLevel::High
        );
        assert_eq!(
            compute_urgency(now, now + Duration::hours(11), end, ResponseStatus::Accepted),
            UrgencyLevel::Medium
        );
        assert_eq!(
            compute_urgency(now, now + Duration::hours(23), end, ResponseStatus::Accepted),
            UrgencyLevel::Low
        );
        assert_eq!(
            compute_urgency(now, now + Duration::hours(23), end, ResponseStatus::NotResponded),
            UrgencyLevel::Medium
        );
        assert_eq!(
            compute_urgency(now, now + Duration::hours(30), end, ResponseStatus::Accepted),
            UrgencyLevel::Low
        );
    }

    #[test]
    fn meeting_invitation_needing_response() {
        let now = Utc::now();
        let record = CalendarRecord {
            event_id: "cal-1".into(),
            source_id: "cal-src-1".into(),
            title: "Roadmap sync".into(),
            description: "Quarterly roadmap discussion".into(),
            start: now + Duration::hours(2),
            end: now + Duration::hours(3),
            organizer: "alice@example.com".into(),
            attendees: vec!["bob@example.com".into()],
            response_status: ResponseStatus::NotResponded,
            location: None,
            online_meeting_url: None,
        };
        let event = normalize(record, now).unwrap();
        assert_eq!(event.event_type(), EventType::DecisionNeeded);
        assert_eq!(event.urgency(), UrgencyLevel::High);
    }
}
