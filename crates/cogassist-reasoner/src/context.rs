//! C5's context-search contract: given query entities and a time window,
//! return notes, prior events, calendar occupancy, open tasks, entity
//! profiles, and detected conflicts, each carrying a relevance score.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cogassist_memory::ContextItem;

use crate::error::ReasonerResult;

#[derive(Debug, Clone)]
pub struct ContextQuery {
    pub entities: Vec<String>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

#[async_trait]
pub trait ContextSearcher: Send + Sync {
    async fn search(&self, query: &ContextQuery) -> ReasonerResult<Vec<ContextItem>>;
}
