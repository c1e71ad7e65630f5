use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use liveload::config::{ConfigLoader, LoadTestConfig};
use liveload::output::console::{ConsoleOutput, format_ids, group_thousands};
use liveload::{CardSource, Error, RunState, SelectionMode, StaticCardSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "liveload")]
#[command(version = "0.1.0")]
#[command(about = "Load-test a scraper trigger endpoint with currently live streams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the top live streams and trigger a scraper for each at once
    Run {
        /// Path to the configuration file (JSON/YAML/TOML); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Read catalog cards from a JSON file instead of fetching the live page
        #[arg(long)]
        cards: Option<PathBuf>,

        /// Disable the progress spinner (stderr)
        #[arg(long)]
        no_progress: bool,
    },
    /// List every live video id and the total viewer count
    Discover {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        cards: Option<PathBuf>,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> liveload::Result<LoadTestConfig> {
    match path {
        Some(path) => {
            log::info!("Loading config from {:?}", path);
            ConfigLoader::load(path)
        }
        None => ConfigLoader::defaults(),
    }
}

fn card_source(cards: Option<&Path>) -> liveload::Result<Option<Arc<dyn CardSource>>> {
    match cards {
        Some(path) => {
            log::info!("Replaying catalog cards from {:?}", path);
            let source: Arc<dyn CardSource> = Arc::new(StaticCardSource::from_json_file(path)?);
            Ok(Some(source))
        }
        None => Ok(None),
    }
}

fn state_message(state: RunState) -> &'static str {
    match state {
        RunState::Idle => "Waiting",
        RunState::Discovering => "Discovering live streams",
        RunState::Dispatching => "Waiting for scraper triggers",
        RunState::Monitoring => "Sampling CPU and memory",
        RunState::Stopped => "Stopped",
    }
}

fn no_live_videos() -> ! {
    eprintln!("No live video IDs found! Exiting...");
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let level = logger.filter();
    let multi = Arc::new(MultiProgress::new());

    match cli.command {
        Commands::Run { config, cards, no_progress } => {
            let progress = !no_progress;
            if progress {
                indicatif_log_bridge::LogWrapper::new((*multi).clone(), logger).try_init()?;
            } else {
                log::set_boxed_logger(Box::new(logger))?;
            }
            log::set_max_level(level);

            let config_data = load_config(config.as_deref())?;
            log::info!("Loaded load test: {}", config_data.name);

            let orchestrator = ConfigLoader::create_orchestrator(
                &config_data,
                config_data.selection,
                card_source(cards.as_deref())?,
            )?;

            let mut spinner_task = None;
            let mut spinner: Option<ProgressBar> = None;
            if progress {
                let pb = multi.add(ProgressBar::new_spinner());
                pb.set_style(ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")?);
                pb.enable_steady_tick(Duration::from_millis(120));
                pb.set_message(state_message(RunState::Idle));

                let mut state_rx = orchestrator.watch_state();
                let pb_clone = pb.clone();
                spinner = Some(pb);
                spinner_task = Some(tokio::spawn(async move {
                    while state_rx.changed().await.is_ok() {
                        let state = *state_rx.borrow();
                        pb_clone.set_message(state_message(state));
                        if state == RunState::Stopped {
                            break;
                        }
                    }
                }));
            }

            let result = orchestrator.run().await;

            if let Some(task) = spinner_task {
                let _ = task.await;
            }
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }

            let report = match result {
                Ok(report) => report,
                Err(Error::DiscoveryEmpty) => no_live_videos(),
                Err(e) => return Err(e.into()),
            };

            let mut sink = ConfigLoader::create_sink(&config_data, Some(multi.clone()))?;
            sink.write(&report).await?;
            sink.close().await?;

            let metrics = &report.dispatch.metrics;
            println!("\n✅ Load Test Completed:");
            println!("   Live Streams Targeted: {}", report.discovery.targets.len());
            println!("   Triggers Succeeded: {}", report.dispatch.succeeded());
            println!("   Triggers Failed: {}", report.dispatch.failed());
            println!("   Success Rate: {:.1}%", metrics.success_rate);
            println!("   Average Duration: {}ms", metrics.avg_response_time_ms);
            println!("   Slowest Trigger: {}ms", metrics.max_response_time_ms);
            println!(
                "   Total Time: {:.1}s",
                (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0
            );
        }
        Commands::Discover { config, cards } => {
            log::set_boxed_logger(Box::new(logger))?;
            log::set_max_level(level);

            let config_data = load_config(config.as_deref())?;
            let orchestrator = ConfigLoader::create_orchestrator(
                &config_data,
                SelectionMode::Unranked,
                card_source(cards.as_deref())?,
            )?;

            let discovery = match orchestrator.discover().await {
                Ok(discovery) => discovery,
                Err(Error::DiscoveryEmpty) => no_live_videos(),
                Err(e) => return Err(e.into()),
            };

            let console = ConsoleOutput::default();
            console.println(&format!(
                "Total Viewers Watching Live: {}",
                group_thousands(discovery.scan.total_viewers)
            ))?;
            console.println(&format!("Live Video IDs: {}", format_ids(&discovery.targets)))?;
        }
        Commands::Check { config } => {
            match ConfigLoader::load(&config) {
                Ok(cfg) => {
                    println!("✅ Config is valid:");
                    println!("   Name: {}", cfg.name);
                    println!("   Catalog: {}", cfg.catalog.url);
                    println!("   Target: {}{}", cfg.target.base_url, cfg.target.path);
                    println!("   Selection: {:?}", cfg.selection);
                }
                Err(e) => {
                    eprintln!("❌ Config error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
