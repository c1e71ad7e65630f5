use crate::catalog::{CatalogExtractor, CatalogScan, VideoId};
use crate::dispatcher::{DispatchReport, ScraperTriggerDispatcher};
use crate::error::{Error, Result};
use crate::monitor::{ResourceProbe, ResourceSample};
use crate::ranking::SelectionMode;
use crate::source::CardSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Discovering,
    Dispatching,
    Monitoring,
    Stopped,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    pub scan: CatalogScan,
    pub targets: Vec<VideoId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub discovery: Discovery,
    pub dispatch: DispatchReport,
    pub resources: ResourceSample,
}

/// Runs one load-test iteration: discover, dispatch, sample, stop.
pub struct LoadTestOrchestrator {
    source: Arc<dyn CardSource>,
    extractor: CatalogExtractor,
    selection: SelectionMode,
    dispatcher: ScraperTriggerDispatcher,
    monitor: Arc<dyn ResourceProbe>,
    history: Mutex<Vec<RunState>>,
    state_watcher: watch::Sender<RunState>,
}

impl LoadTestOrchestrator {
    pub fn new(
        source: Arc<dyn CardSource>,
        extractor: CatalogExtractor,
        selection: SelectionMode,
        dispatcher: ScraperTriggerDispatcher,
        monitor: Arc<dyn ResourceProbe>,
    ) -> Self {
        let (state_tx, _) = watch::channel(RunState::Idle);

        Self {
            source,
            extractor,
            selection,
            dispatcher,
            monitor,
            history: Mutex::new(vec![RunState::Idle]),
            state_watcher: state_tx,
        }
    }

    /// Scans the catalog and picks targets, then stops. An empty target
    /// list is [`Error::DiscoveryEmpty`].
    pub async fn discover(&self) -> Result<Discovery> {
        let discovery = self.discover_targets().await;
        self.set_state(RunState::Stopped).await;
        discovery
    }

    pub async fn run(&self) -> Result<RunReport> {
        let started_at = Utc::now();

        let discovery = match self.discover_targets().await {
            Ok(discovery) => discovery,
            Err(e) => {
                self.set_state(RunState::Stopped).await;
                return Err(e);
            }
        };

        self.set_state(RunState::Dispatching).await;
        let dispatch = self.dispatcher.dispatch(&discovery.targets).await;
        log::info!(
            "Dispatch finished: {} succeeded, {} failed",
            dispatch.succeeded(),
            dispatch.failed()
        );

        self.set_state(RunState::Monitoring).await;
        let resources = self.monitor.sample().await;
        self.set_state(RunState::Stopped).await;
        let resources = resources?;
        log::debug!(
            "Resource sample: cpu={:.1}% mem={:.1}%",
            resources.cpu_percent,
            resources.mem_percent
        );

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            discovery,
            dispatch,
            resources,
        })
    }

    async fn discover_targets(&self) -> Result<Discovery> {
        self.set_state(RunState::Discovering).await;

        let cards = self.source.fetch_cards().await?;
        log::debug!("{} returned {} cards", self.source.name(), cards.len());
        let scan = self.extractor.extract(cards)?;
        log::debug!(
            "{} live cards, {} viewers in total",
            scan.live_cards,
            scan.total_viewers
        );

        let targets = self.selection.select(&scan);
        if targets.is_empty() {
            log::debug!("Discovery produced no targets");
            return Err(Error::DiscoveryEmpty);
        }
        log::info!("Selected {} live videos ({:?})", targets.len(), self.selection);

        Ok(Discovery { scan, targets })
    }

    pub fn watch_state(&self) -> watch::Receiver<RunState> {
        self.state_watcher.subscribe()
    }

    pub async fn state(&self) -> RunState {
        let history = self.history.lock().await;
        history.last().copied().unwrap_or(RunState::Idle)
    }

    /// Every state entered so far, starting with `Idle`.
    pub async fn history(&self) -> Vec<RunState> {
        self.history.lock().await.clone()
    }

    async fn set_state(&self, state: RunState) {
        let mut history = self.history.lock().await;
        history.push(state);
        log::debug!("Run state -> {:?}", state);
        let _ = self.state_watcher.send(state);
    }
}
