//! HTTP surface: ingest endpoints (C2 entry points), the review queue
//! (C11), and the feedback endpoint that closes the loop into C9.

use std::sync::Arc;

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use cogassist_channels::Channel;
use cogassist_learning::{CallRecord, UserFeedback};
use cogassist_perception::normalizers::calendar::{self, CalendarRecord, ResponseStatus};
use cogassist_perception::normalizers::chat::{self, ChatImportance, ChatRecord};
use cogassist_perception::normalizers::mail::{self, MailRecord};

use crate::pipeline::process_event;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/ingest/mail", post(ingest_mail))
        .route("/ingest/calendar", post(ingest_calendar))
        .route("/ingest/chat", post(ingest_chat))
        .route("/queue", get(list_queue))
        .route("/queue/{item_id}/approve", post(approve_queue_item))
        .route("/queue/{item_id}/reject", post(reject_queue_item))
        .route("/feedback/{event_id}", post(submit_feedback))
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "account": state.account.id,
        "clients": state.channels.client_count(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct MailIngestRequest {
    pub message_id: String,
    #[serde(default)]
    pub source_id: String,
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    pub subject: String,
    #[serde(default)]
    pub body: String,
    pub date: Option<DateTime<Utc>>,
    pub thread_id: Option<String>,
    pub in_reply_to: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub attachment_types: Vec<String>,
}

impl From<MailIngestRequest> for MailRecord {
    fn from(r: MailIngestRequest) -> Self {
        MailRecord {
            message_id: r.message_id,
            source_id: r.source_id,
            from: r.from,
            to: r.to,
            cc: r.cc,
            subject: r.subject,
            body: r.body,
            date: r.date,
            thread_id: r.thread_id,
            in_reply_to: r.in_reply_to,
            references: r.references,
            attachment_types: r.attachment_types,
        }
    }
}

async fn ingest_mail(State(state): State<Arc<AppState>>, Json(req): Json<MailIngestRequest>) -> impl IntoResponse {
    let event = match mail::normalize(req.into(), Utc::now()) {
        Ok(event) => event,
        Err(err) => return (StatusCode::BAD_REQUEST, Json(json!({"error": err.to_string()}))).into_response(),
    };
    respond_to_ingest(&state, event).await
}

#[derive(Debug, Deserialize)]
pub struct CalendarIngestRequest {
    pub event_id: String,
    #[serde(default)]
    pub source_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub organizer: String,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub response_status: String,
    pub location: Option<String>,
    pub online_meeting_url: Option<String>,
}

fn parse_response_status(value: &str) -> ResponseStatus {
    match value.to_lowercase().as_str() {
        "accepted" | "accept" => ResponseStatus::Accepted,
        "declined" | "decline" => ResponseStatus::Declined,
        "tentative" => ResponseStatus::Tentative,
        _ => ResponseStatus::NotResponded,
    }
}

impl From<CalendarIngestRequest> for CalendarRecord {
    fn from(r: CalendarIngestRequest) -> Self {
        CalendarRecord {
            event_id: r.event_id,
            source_id: r.source_id,
            title: r.title,
            description: r.description,
            start: r.start,
            end: r.end,
            organizer: r.organizer,
            attendees: r.attendees,
            response_status: parse_response_status(&r.response_status),
            location: r.location,
            online_meeting_url: r.online_meeting_url,
        }
    }
}

async fn ingest_calendar(State(state): State<Arc<AppState>>, Json(req): Json<CalendarIngestRequest>) -> impl IntoResponse {
    let event = match calendar::normalize(req.into(), Utc::now()) {
        Ok(event) => event,
        Err(err) => return (StatusCode::BAD_REQUEST, Json(json!({"error": err.to_string()}))).into_response(),
    };
    respond_to_ingest(&state, event).await
}

#[derive(Debug, Deserialize)]
pub struct ChatIngestRequest {
    pub message_id: String,
    #[serde(default)]
    pub source_id: String,
    pub from: String,
    pub room_id: String,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub importance: String,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub thread_id: Option<String>,
    #[serde(default)]
    pub addressed_to_me: bool,
}

fn parse_importance(value: &str) -> ChatImportance {
    match value.to_lowercase().as_str() {
        "low" => ChatImportance::Low,
        "high" => ChatImportance::High,
        "urgent" => ChatImportance::Urgent,
        _ => ChatImportance::Normal,
    }
}

impl From<ChatIngestRequest> for ChatRecord {
    fn from(r: ChatIngestRequest) -> Self {
        ChatRecord {
            message_id: r.message_id,
            source_id: r.source_id,
            from: r.from,
            room_id: r.room_id,
            mentions: r.mentions,
            importance: parse_importance(&r.importance),
            content: r.content,
            timestamp: r.timestamp,
            thread_id: r.thread_id,
            addressed_to_me: r.addressed_to_me,
        }
    }
}

async fn ingest_chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatIngestRequest>) -> impl IntoResponse {
    let event = match chat::normalize(req.into(), Utc::now()) {
        Ok(event) => event,
        Err(err) => return (StatusCode::BAD_REQUEST, Json(json!({"error": err.to_string()}))).into_response(),
    };
    respond_to_ingest(&state, event).await
}

async fn respond_to_ingest(state: &Arc<AppState>, event: cogassist_core::event::Event) -> axum::response::Response {
    match process_event(state, event).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": err.to_string()}))).into_response(),
    }
}

async fn list_queue(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let items: Vec<_> = state.queue.pending().iter().map(|item| item.sanitized_summary()).collect();
    Json(json!({"items": items, "stats": state.queue.stats()}))
}

async fn approve_queue_item(State(state): State<Arc<AppState>>, AxumPath(item_id): AxumPath<String>) -> impl IntoResponse {
    resolve_queue_item(&state, &item_id, true).await
}

async fn reject_queue_item(State(state): State<Arc<AppState>>, AxumPath(item_id): AxumPath<String>) -> impl IntoResponse {
    resolve_queue_item(&state, &item_id, false).await
}

async fn resolve_queue_item(state: &Arc<AppState>, item_id: &str, approve: bool) -> axum::response::Response {
    let mut item = match state.queue.get(item_id) {
        Ok(Some(item)) => item,
        Ok(None) => return (StatusCode::NOT_FOUND, Json(json!({"error": "queue item not found"}))).into_response(),
        Err(err) => return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": err.to_string()}))).into_response(),
    };

    let transition = if approve { item.approve() } else { item.reject() };
    if let Err(err) = transition {
        return (StatusCode::CONFLICT, Json(json!({"error": err.to_string()}))).into_response();
    }
    if let Err(err) = state.queue.save(item.clone()) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": err.to_string()}))).into_response();
    }

    state.channels.broadcast_to_channel(
        Channel::Queue,
        json!({"event": "item_updated", "item": item.sanitized_summary()}),
        None,
        None,
    );

    (StatusCode::OK, Json(item.sanitized_summary())).into_response()
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub approved: bool,
    pub rating: Option<u8>,
    pub correction: Option<String>,
    pub modification: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub action_executed: bool,
    pub time_to_action_secs: Option<f64>,
}

async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    AxumPath(event_id): AxumPath<String>,
    Json(req): Json<FeedbackRequest>,
) -> impl IntoResponse {
    let Some((_, pending)) = state.pending.remove(&event_id) else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "no pending analysis for this event"}))).into_response();
    };

    let feedback = UserFeedback {
        approved: req.approved,
        rating: req.rating,
        correction: req.correction,
        modification: req.modification,
        comment: req.comment,
        action_executed: req.action_executed,
        time_to_action_secs: req.time_to_action_secs,
    };

    let provider_call = pending.provider_calls.last().map(|call| {
        (
            call.provider.as_str(),
            call.model_tier.as_str(),
            CallRecord {
                timestamp: Utc::now(),
                latency_ms: call.latency_ms,
                cost: call.cost_usd,
                success: call.success,
                predicted_confidence: call.predicted_confidence,
                actual_quality: 0.0,
            },
        )
    });

    match state.learning.learn(&feedback, &pending.memory, &pending.executed, provider_call) {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "triggered": outcome.triggered,
                "updates_applied": outcome.updates_applied,
                "updates_skipped": outcome.updates_skipped,
                "updates_failed": outcome.updates_failed,
            })),
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": err.to_string()}))).into_response(),
    }
}
