pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod orchestrator;
pub mod output;
pub mod ranking;
pub mod source;
pub mod viewers;

pub use catalog::{CatalogCard, CatalogExtractor, CatalogScan, LiveCard, LiveEntry, VideoId};
pub use dispatcher::{DispatchReport, ScraperTriggerDispatcher, TriggerEndpoint, TriggerOutcome};
pub use error::{Error, Result};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use monitor::{ResourceProbe, ResourceSample, SystemMonitor};
pub use orchestrator::{LoadTestOrchestrator, RunReport, RunState};
pub use ranking::SelectionMode;
pub use source::{CardSource, HtmlCatalogSource, StaticCardSource};
pub use viewers::{ViewerCountParser, ViewerLocale};
