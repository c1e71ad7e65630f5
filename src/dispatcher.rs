use crate::catalog::VideoId;
use crate::error::Result;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use futures::future::join_all;
use reqwest::{Client, redirect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use url::Url;

pub const DEFAULT_SUCCESS_STATUS: u16 = 302;

/// The "start scraper" URL; the video id goes into one query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEndpoint {
    url: Url,
    video_id_param: String,
}

impl TriggerEndpoint {
    pub fn new(base_url: &str, path: &str, video_id_param: &str) -> Result<Self> {
        let url = Url::parse(base_url)?.join(path)?;
        Ok(Self {
            url,
            video_id_param: video_id_param.to_string(),
        })
    }

    pub fn url_for(&self, video_id: &VideoId) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair(&self.video_id_param, video_id.as_str());
        url
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Status(u16),
    Transport(String),
    Worker(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Status(code) => write!(f, "Status: {}", code),
            FailureReason::Transport(e) => write!(f, "Transport: {}", e),
            FailureReason::Worker(e) => write!(f, "Worker: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOutcome {
    Success { status: u16 },
    Failure(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub video_id: VideoId,
    pub outcome: TriggerOutcome,
    pub elapsed_ms: u64,
}

impl TriggerRecord {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TriggerOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// One record per requested id, in request order.
    pub records: Vec<TriggerRecord>,
    pub metrics: MetricsSnapshot,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.succeeded()
    }

    pub fn outcome_for(&self, video_id: &VideoId) -> Option<&TriggerOutcome> {
        self.records
            .iter()
            .find(|r| &r.video_id == video_id)
            .map(|r| &r.outcome)
    }
}

pub struct ScraperTriggerDispatcher {
    client: Client,
    endpoint: TriggerEndpoint,
    success_status: u16,
}

impl ScraperTriggerDispatcher {
    /// Redirects are never followed: the trigger endpoint answers 302 on success.
    pub fn new(endpoint: TriggerEndpoint, success_status: u16, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder()
            .redirect(redirect::Policy::none())
            .user_agent("liveload/0.1");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
            success_status,
        })
    }

    pub fn endpoint(&self) -> &TriggerEndpoint {
        &self.endpoint
    }

    /// Fires one trigger per id at once and waits for all of them.
    pub async fn dispatch(&self, video_ids: &[VideoId]) -> DispatchReport {
        let metrics = MetricsCollector::new();
        log::info!("Dispatching {} scraper triggers", video_ids.len());

        let handles: Vec<_> = video_ids
            .iter()
            .map(|id| {
                tokio::spawn(trigger_one(
                    self.client.clone(),
                    self.endpoint.url_for(id),
                    id.clone(),
                    self.success_status,
                    metrics.clone(),
                ))
            })
            .collect();

        let records = join_all(handles)
            .await
            .into_iter()
            .zip(video_ids)
            .map(|(joined, id)| match joined {
                Ok(record) => record,
                Err(e) => {
                    log::error!("Trigger worker for {} died: {}", id, e);
                    metrics.record_failure(Duration::ZERO);
                    TriggerRecord {
                        video_id: id.clone(),
                        outcome: TriggerOutcome::Failure(FailureReason::Worker(e.to_string())),
                        elapsed_ms: 0,
                    }
                }
            })
            .collect();

        DispatchReport {
            records,
            metrics: metrics.snapshot(),
        }
    }
}

async fn trigger_one(
    client: Client,
    url: Url,
    video_id: VideoId,
    success_status: u16,
    metrics: MetricsCollector,
) -> TriggerRecord {
    metrics.increment_active_workers();
    let start_time = Instant::now();

    let outcome = match client.get(url).send().await {
        Ok(res) if res.status().as_u16() == success_status => TriggerOutcome::Success {
            status: success_status,
        },
        Ok(res) => TriggerOutcome::Failure(FailureReason::Status(res.status().as_u16())),
        Err(e) => TriggerOutcome::Failure(FailureReason::Transport(e.to_string())),
    };
    let duration = start_time.elapsed();

    match &outcome {
        TriggerOutcome::Success { .. } => {
            metrics.record_success(duration);
            log::debug!("Trigger for {} succeeded in {:?}", video_id, duration);
        }
        TriggerOutcome::Failure(reason) => {
            metrics.record_failure(duration);
            log::debug!("Trigger for {} failed in {:?}: {}", video_id, duration, reason);
        }
    }
    metrics.decrement_active_workers();

    TriggerRecord {
        video_id,
        outcome,
        elapsed_ms: duration.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ids(raw: &[&str]) -> Vec<VideoId> {
        raw.iter().map(|s| VideoId::new(*s)).collect()
    }

    #[test]
    fn test_endpoint_url_for() {
        let endpoint =
            TriggerEndpoint::new("http://localhost:8080", "/scrapers/start-scraper", "videoId").unwrap();
        assert_eq!(
            endpoint.url_for(&VideoId::new("abc")).as_str(),
            "http://localhost:8080/scrapers/start-scraper?videoId=abc"
        );
        assert_eq!(
            endpoint.url_for(&VideoId::new("a b&c")).as_str(),
            "http://localhost:8080/scrapers/start-scraper?videoId=a+b%26c"
        );
    }

    #[test]
    fn test_endpoint_rejects_bad_base() {
        assert!(TriggerEndpoint::new("not a url", "/x", "videoId").is_err());
    }

    #[tokio::test]
    async fn test_dispatch_classifies_by_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/scrapers/start-scraper"))
            .and(query_param("videoId", "bad"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/scrapers/start-scraper"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/scrapers"))
            .expect(2)
            .mount(&mock_server)
            .await;

        let endpoint =
            TriggerEndpoint::new(&mock_server.uri(), "/scrapers/start-scraper", "videoId").unwrap();
        let dispatcher = ScraperTriggerDispatcher::new(endpoint, DEFAULT_SUCCESS_STATUS, None).unwrap();

        let targets = ids(&["one", "bad", "two"]);
        let report = dispatcher.dispatch(&targets).await;

        assert_eq!(report.records.len(), 3);
        assert_eq!(
            report.records.iter().map(|r| r.video_id.clone()).collect::<Vec<_>>(),
            targets
        );
        assert_eq!(
            report.outcome_for(&VideoId::new("one")),
            Some(&TriggerOutcome::Success { status: 302 })
        );
        assert_eq!(
            report.outcome_for(&VideoId::new("bad")),
            Some(&TriggerOutcome::Failure(FailureReason::Status(500)))
        );
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.metrics.triggers_completed, 3);
        assert_eq!(report.metrics.active_workers, 0);
    }

    #[tokio::test]
    async fn test_plain_200_is_a_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let endpoint = TriggerEndpoint::new(&mock_server.uri(), "/start", "videoId").unwrap();
        let dispatcher = ScraperTriggerDispatcher::new(endpoint, DEFAULT_SUCCESS_STATUS, None).unwrap();
        let report = dispatcher.dispatch(&ids(&["x"])).await;

        assert_eq!(
            report.records[0].outcome,
            TriggerOutcome::Failure(FailureReason::Status(200))
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_recorded_not_raised() {
        let endpoint = TriggerEndpoint::new("http://127.0.0.1:1", "/start", "videoId").unwrap();
        let dispatcher =
            ScraperTriggerDispatcher::new(endpoint, DEFAULT_SUCCESS_STATUS, Some(Duration::from_secs(2)))
                .unwrap();
        let report = dispatcher.dispatch(&ids(&["a", "b"])).await;

        assert_eq!(report.records.len(), 2);
        assert!(report.records.iter().all(|r| matches!(
            r.outcome,
            TriggerOutcome::Failure(FailureReason::Transport(_))
        )));
    }

    #[tokio::test]
    async fn test_triggers_are_in_flight_together() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/start"))
            .respond_with(ResponseTemplate::new(302).set_delay(Duration::from_millis(500)))
            .expect(5)
            .mount(&mock_server)
            .await;

        let endpoint = TriggerEndpoint::new(&mock_server.uri(), "/start", "videoId").unwrap();
        let dispatcher = ScraperTriggerDispatcher::new(endpoint, DEFAULT_SUCCESS_STATUS, None).unwrap();

        let started = Instant::now();
        let report = dispatcher.dispatch(&ids(&["a", "b", "c", "d", "e"])).await;
        let elapsed = started.elapsed();

        assert_eq!(report.succeeded(), 5);
        // One after another would take at least 2.5s.
        assert!(elapsed < Duration::from_millis(1500), "took {:?}", elapsed);
        assert!(report.metrics.peak_active_workers > 1);
        assert_eq!(report.metrics.active_workers, 0);
    }

    #[tokio::test]
    async fn test_empty_dispatch() {
        let endpoint = TriggerEndpoint::new("http://127.0.0.1:1", "/start", "videoId").unwrap();
        let dispatcher = ScraperTriggerDispatcher::new(endpoint, DEFAULT_SUCCESS_STATUS, None).unwrap();
        let report = dispatcher.dispatch(&[]).await;
        assert!(report.records.is_empty());
        assert_eq!(report.metrics.triggers_completed, 0);
    }
}
