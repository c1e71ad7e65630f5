use crate::catalog::CatalogExtractor;
use crate::config::schema::{CatalogConfig, LoadTestConfig, MonitorConfig, OutputConfig, TargetConfig};
use crate::dispatcher::{ScraperTriggerDispatcher, TriggerEndpoint};
use crate::error::{Error, Result};
use crate::monitor::SystemMonitor;
use crate::orchestrator::LoadTestOrchestrator;
use crate::output::{ReportSink, console::ConsoleOutput, csv::CsvOutput, json::JsonOutput};
use crate::ranking::SelectionMode;
use crate::source::{CardSelectors, CardSource, HtmlCatalogSource};
use crate::viewers::{ViewerCountParser, ViewerLocale};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoadTestConfig> {
        let path = path.as_ref();
        let mut visited = HashSet::new();
        Self::load_with_inheritance(path, &mut visited, false)
    }

    /// Built-in defaults, validated like a loaded file.
    pub fn defaults() -> Result<LoadTestConfig> {
        let config = LoadTestConfig::default();
        config.validate()?;
        Ok(config)
    }

    fn load_with_inheritance(
        path: &Path,
        visited: &mut HashSet<PathBuf>,
        is_parent_load: bool,
    ) -> Result<LoadTestConfig> {
        let path = fs::canonicalize(path).map_err(|e| {
            Error::Config(format!("{}: {}", path.display(), e))
        })?;

        if visited.contains(&path) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }
        visited.insert(path.clone());

        let config = Self::load_file(&path)?;

        let final_config = if let Some(parent_path_str) = &config.extends {
            let parent_path = path.parent()
                .ok_or_else(|| Error::Config(format!(
                    "Cannot determine parent directory for {}",
                    path.display()
                )))?
                .join(parent_path_str);

            let parent_config = Self::load_with_inheritance(&parent_path, visited, true)?;
            Self::merge_configs(parent_config, config)
        } else {
            config
        };

        if !is_parent_load {
            final_config.validate()?;
        }

        Ok(final_config)
    }

    fn load_file(path: &Path) -> Result<LoadTestConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    /// Child sections left at their defaults inherit the parent's.
    fn merge_configs(mut parent: LoadTestConfig, child: LoadTestConfig) -> LoadTestConfig {
        let defaults = LoadTestConfig::default();

        if child.name != defaults.name {
            parent.name = child.name;
        }
        if child.catalog != CatalogConfig::default() {
            parent.catalog = child.catalog;
        }
        if child.target != TargetConfig::default() {
            parent.target = child.target;
        }
        if child.selection != SelectionMode::default() {
            parent.selection = child.selection;
        }
        if child.locale != ViewerLocale::default() {
            parent.locale = child.locale;
        }
        if child.monitor != MonitorConfig::default() {
            parent.monitor = child.monitor;
        }
        if child.output.is_some() {
            parent.output = child.output;
        }

        parent.extends = None;
        parent
    }

    pub fn create_source(config: &LoadTestConfig) -> Result<HtmlCatalogSource> {
        let catalog = &config.catalog;
        let selectors = CardSelectors::new(
            &catalog.card_selector,
            &catalog.link_selector,
            &catalog.viewer_selector,
            &catalog.badge_text,
        )?;

        HtmlCatalogSource::new(
            catalog.url.clone(),
            selectors,
            Duration::from_secs(catalog.timeout_secs),
            &catalog.user_agent,
        )
    }

    pub fn create_extractor(config: &LoadTestConfig) -> CatalogExtractor {
        CatalogExtractor::new(
            config.catalog.live_path_marker.clone(),
            ViewerCountParser::new(config.locale.clone()),
        )
    }

    pub fn create_dispatcher(config: &LoadTestConfig) -> Result<ScraperTriggerDispatcher> {
        let target = &config.target;
        let endpoint = TriggerEndpoint::new(&target.base_url, &target.path, &target.video_id_param)?;
        ScraperTriggerDispatcher::new(
            endpoint,
            target.success_status,
            target.timeout_secs.map(Duration::from_secs),
        )
    }

    /// Wires an orchestrator from config. `source` replaces the HTML catalog
    /// source when given.
    pub fn create_orchestrator(
        config: &LoadTestConfig,
        selection: SelectionMode,
        source: Option<Arc<dyn CardSource>>,
    ) -> Result<LoadTestOrchestrator> {
        let source: Arc<dyn CardSource> = match source {
            Some(source) => source,
            None => Arc::new(Self::create_source(config)?),
        };

        Ok(LoadTestOrchestrator::new(
            source,
            Self::create_extractor(config),
            selection,
            Self::create_dispatcher(config)?,
            Arc::new(SystemMonitor::new(Duration::from_millis(
                config.monitor.sample_window_ms,
            ))),
        ))
    }

    pub fn create_sink(
        config: &LoadTestConfig,
        multi: Option<Arc<indicatif::MultiProgress>>,
    ) -> Result<Box<dyn ReportSink>> {
        let sink: Box<dyn ReportSink> = match &config.output {
            None | Some(OutputConfig::Console) => Box::new(ConsoleOutput::new(multi)),
            Some(OutputConfig::Json { path }) => Box::new(JsonOutput::new(PathBuf::from(path))?),
            Some(OutputConfig::Csv { path }) => Box::new(CsvOutput::new(PathBuf::from(path))?),
        };
        Ok(sink)
    }
}
