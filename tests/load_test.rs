use liveload::config::{ConfigLoader, LoadTestConfig, OutputConfig};
use liveload::dispatcher::FailureReason;
use liveload::output::console::render_report;
use liveload::{Error, RunState, SelectionMode, TriggerOutcome, VideoId};
use std::fs;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CATALOG_HTML: &str = r#"
<html><body><div id="contents">
  <ytd-rich-grid-media>
    <a id="video-title-link" href="/live/AAA?si=share">Stream A</a>
    <span class="inline-metadata-item">2만명 시청 중</span>
  </ytd-rich-grid-media>
  <ytd-rich-grid-media>
    <a id="video-title-link" href="/live/BBB">Stream B</a>
    <span class="inline-metadata-item">500명 시청 중</span>
  </ytd-rich-grid-media>
  <ytd-rich-grid-media>
    <a id="video-title-link" href="/watch?v=CCC">Premiere C</a>
    <span class="inline-metadata-item">1.5천명 시청 중</span>
  </ytd-rich-grid-media>
  <ytd-rich-grid-media>
    <a id="video-title-link" href="/live/DDD">Replay D</a>
    <span class="inline-metadata-item">조회수 3만회</span>
  </ytd-rich-grid-media>
  <ytd-rich-grid-media>
    <a id="video-title-link" href="/live/EEE">Stream E</a>
    <span class="inline-metadata-item">8.5천명 시청 중</span>
  </ytd-rich-grid-media>
</div></body></html>
"#;

async fn mock_catalog(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/live"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

fn config_for(server: &MockServer) -> LoadTestConfig {
    let mut config = LoadTestConfig::default();
    config.catalog.url = format!("{}/live", server.uri());
    config.target.base_url = server.uri();
    config.target.timeout_secs = Some(5);
    config.monitor.sample_window_ms = 0;
    config
}

#[tokio::test]
async fn test_end_to_end_ranked_run() {
    let server = MockServer::start().await;
    mock_catalog(&server, CATALOG_HTML).await;

    Mock::given(method("GET"))
        .and(path("/scrapers/start-scraper"))
        .and(query_param("videoId", "BBB"))
        .respond_with(ResponseTemplate::new(503))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/scrapers/start-scraper"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/scrapers"))
        .expect(2)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let orchestrator =
        ConfigLoader::create_orchestrator(&config, config.selection, None).unwrap();
    let report = orchestrator.run().await.unwrap();

    // The /watch card has a badge but no live id: it only adds to the total.
    assert_eq!(report.discovery.scan.total_viewers, 20_000 + 500 + 1_500 + 8_500);
    assert_eq!(report.discovery.scan.unresolved_cards, 1);
    assert_eq!(
        report.discovery.targets,
        vec![VideoId::new("AAA"), VideoId::new("EEE"), VideoId::new("BBB")]
    );

    assert_eq!(report.dispatch.records.len(), 3);
    assert_eq!(
        report.dispatch.outcome_for(&VideoId::new("AAA")),
        Some(&TriggerOutcome::Success { status: 302 })
    );
    assert_eq!(
        report.dispatch.outcome_for(&VideoId::new("BBB")),
        Some(&TriggerOutcome::Failure(FailureReason::Status(503)))
    );
    assert!((0.0..=100.0).contains(&report.resources.mem_percent));
    assert_eq!(orchestrator.state().await, RunState::Stopped);

    let lines = render_report(&report);
    assert_eq!(lines[0], "Total Viewers Watching Live: 30,500");
    assert_eq!(lines[1], "Live Video IDs: ['AAA', 'EEE', 'BBB']");
    assert!(lines.contains(&"✅ Started scraper for AAA".to_string()));
    assert!(lines.contains(&"❌ Failed to start scraper for BBB (Status: 503)".to_string()));
    assert!(lines.last().unwrap().starts_with("💻 CPU Usage: "));
}

#[tokio::test]
async fn test_top_n_truncates_targets() {
    let server = MockServer::start().await;
    mock_catalog(&server, CATALOG_HTML).await;
    Mock::given(method("GET"))
        .and(path("/scrapers/start-scraper"))
        .respond_with(ResponseTemplate::new(302))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let orchestrator =
        ConfigLoader::create_orchestrator(&config, SelectionMode::Ranked { top_n: 1 }, None).unwrap();
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.discovery.targets, vec![VideoId::new("AAA")]);
    // Totals are aggregated before truncation.
    assert_eq!(report.discovery.scan.total_viewers, 30_500);
}

#[tokio::test]
async fn test_unranked_discovery() {
    let server = MockServer::start().await;
    mock_catalog(&server, CATALOG_HTML).await;

    let config = config_for(&server);
    let orchestrator =
        ConfigLoader::create_orchestrator(&config, SelectionMode::Unranked, None).unwrap();
    let discovery = orchestrator.discover().await.unwrap();

    let mut ids = discovery.targets.clone();
    ids.sort();
    assert_eq!(ids, vec![VideoId::new("AAA"), VideoId::new("BBB"), VideoId::new("EEE")]);
    assert_eq!(discovery.scan.total_viewers, 30_500);
}

#[tokio::test]
async fn test_empty_catalog_aborts_before_dispatch() {
    let server = MockServer::start().await;
    mock_catalog(&server, "<html><body><p>nothing live</p></body></html>").await;
    Mock::given(method("GET"))
        .and(path("/scrapers/start-scraper"))
        .respond_with(ResponseTemplate::new(302))
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let orchestrator =
        ConfigLoader::create_orchestrator(&config, config.selection, None).unwrap();

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(err, Error::DiscoveryEmpty));
    assert_eq!(
        orchestrator.history().await,
        vec![RunState::Idle, RunState::Discovering, RunState::Stopped]
    );
}

#[tokio::test]
async fn test_catalog_http_error_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let orchestrator =
        ConfigLoader::create_orchestrator(&config, config.selection, None).unwrap();

    match orchestrator.run().await {
        Err(Error::Http(e)) => assert_eq!(e.status().map(|s| s.as_u16()), Some(500)),
        other => panic!("expected an HTTP error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(orchestrator.state().await, RunState::Stopped);
}

#[tokio::test]
async fn test_report_sinks_write_files() {
    let server = MockServer::start().await;
    mock_catalog(&server, CATALOG_HTML).await;
    Mock::given(method("GET"))
        .and(path("/scrapers/start-scraper"))
        .respond_with(ResponseTemplate::new(302))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("report.json");
    let csv_path = dir.path().join("outcomes.csv");

    let mut config = config_for(&server);
    let orchestrator =
        ConfigLoader::create_orchestrator(&config, config.selection, None).unwrap();
    let report = orchestrator.run().await.unwrap();

    config.output = Some(OutputConfig::Json {
        path: json_path.display().to_string(),
    });
    let mut sink = ConfigLoader::create_sink(&config, None).unwrap();
    sink.write(&report).await.unwrap();
    sink.close().await.unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["discovery"]["scan"]["total_viewers"], 30_500);
    assert_eq!(json["discovery"]["targets"][0], "AAA");
    assert_eq!(json["dispatch"]["records"].as_array().unwrap().len(), 3);

    config.output = Some(OutputConfig::Csv {
        path: csv_path.display().to_string(),
    });
    let mut sink = ConfigLoader::create_sink(&config, None).unwrap();
    sink.write(&report).await.unwrap();
    sink.close().await.unwrap();

    let csv = fs::read_to_string(&csv_path).unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows[0], "video_id,outcome,status,detail,elapsed_ms");
    assert_eq!(rows.len(), 4);
    assert!(rows[1].starts_with("AAA,success,302,,"));
}
