//! Shared application state, assembled once at startup and handed to every
//! HTTP/WS handler behind an `Arc`. Mirrors the reference gateway's
//! `AppState`: subsystem handles bundled as plain fields, `Arc`/`DashMap` for
//! anything shared across connections.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;

use cogassist_actions::{ActionFactory, ExecutedAction, Orchestrator, Planner, PlannerConfig, RiskLevel};
use cogassist_channels::{ChannelManager, SharedChannelManager};
use cogassist_core::config::{AccountConfig, Config};
use cogassist_learning::LearningEngine;
use cogassist_memory::WorkingMemory;
use cogassist_perception::EmailFilter;
use cogassist_reasoner::{AiRouter, FailoverRouter, MultiPassReasoner, ProviderCallRecord, ProviderSlot};
use cogassist_storage::{DraftStore, QueueStore};

use crate::collaborators::{InMemoryTaskManager, LoggingCalendarClient, LoggingChatClient, LoggingMailClient, LoggingNoteManager};
use crate::provider::{EmptyContextSearcher, HeuristicProvider};

/// An event that finished reasoning and produced a plan, held until the
/// corresponding `/feedback/{event_id}` request consumes it. Removed from
/// `AppState::pending` whether or not the learning cycle it feeds succeeds.
pub struct PendingEvent {
    pub memory: WorkingMemory,
    pub executed: Vec<ExecutedAction>,
    pub provider_calls: Vec<ProviderCallRecord>,
}

pub struct AppState {
    pub config: Config,
    pub account: AccountConfig,
    pub channels: SharedChannelManager,
    pub drafts: DraftStore,
    pub queue: QueueStore,
    pub learning: LearningEngine,
    pub planner: Planner,
    pub orchestrator: Orchestrator,
    pub action_factory: ActionFactory,
    pub reasoner: MultiPassReasoner,
    pub mail_filter: EmailFilter,
    pub pending: DashMap<String, PendingEvent>,
    pub ws_token: String,
}

impl AppState {
    pub fn new(config: Config, ws_token: String) -> anyhow::Result<Self> {
        let account = config
            .accounts
            .accounts
            .iter()
            .find(|a| a.enabled)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no enabled account in configuration"))?;

        let data_dir = PathBuf::from(&config.storage.data_dir);
        std::fs::create_dir_all(data_dir.join("drafts"))?;
        std::fs::create_dir_all(data_dir.join("queue"))?;

        let note_manager = Arc::new(LoggingNoteManager);
        let learning = LearningEngine::new(config.learning.clone(), note_manager, &data_dir)?;

        let drafts = DraftStore::new(data_dir.join("drafts"));
        let queue = QueueStore::new(data_dir.join("queue"));

        let planner = Planner::new(PlannerConfig {
            auto_approve_threshold: config.planning.auto_approve_threshold,
            risk_tolerance: RiskLevel::parse(&config.planning.risk_tolerance)?,
        });

        let action_factory = ActionFactory::new(
            Arc::new(LoggingMailClient),
            Arc::new(LoggingCalendarClient),
            Arc::new(LoggingChatClient),
            Arc::new(InMemoryTaskManager::default()),
        );

        let ai_router: Arc<dyn AiRouter> = Arc::new(FailoverRouter::new(vec![ProviderSlot::new(
            Box::new(HeuristicProvider::new("local-heuristic", 0.75)),
            2,
        )]));
        let reasoner = MultiPassReasoner::new(ai_router, Arc::new(EmptyContextSearcher), config.reasoning.clone());

        let channels = Arc::new(ChannelManager::new(&config.channels));

        Ok(Self {
            account,
            channels,
            drafts,
            queue,
            learning,
            planner,
            orchestrator: Orchestrator::default(),
            action_factory,
            reasoner,
            mail_filter: EmailFilter::default(),
            pending: DashMap::new(),
            ws_token,
            config,
        })
    }
}
