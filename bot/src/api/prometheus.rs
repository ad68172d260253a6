use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

use crate::mungers::MungeResult;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum ResultLabel {
    Skipped,
    Active,
    WarningRemoved,
    Warned,
    WarningRefreshed,
    WarningKept,
    TooLateToWarn,
    Closed,
    Failed,
}

impl From<&anyhow::Result<MungeResult>> for ResultLabel {
    fn from(result: &anyhow::Result<MungeResult>) -> Self {
        match result {
            Ok(MungeResult::Skipped) => ResultLabel::Skipped,
            Ok(MungeResult::Active) => ResultLabel::Active,
            Ok(MungeResult::WarningRemoved) => ResultLabel::WarningRemoved,
            Ok(MungeResult::Warned) => ResultLabel::Warned,
            Ok(MungeResult::WarningRefreshed) => ResultLabel::WarningRefreshed,
            Ok(MungeResult::WarningKept) => ResultLabel::WarningKept,
            Ok(MungeResult::TooLateToWarn) => ResultLabel::TooLateToWarn,
            Ok(MungeResult::Closed) => ResultLabel::Closed,
            Err(_) => ResultLabel::Failed,
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct MungeRecord {
    pub munger: String,
    pub repository: String,
    pub result: ResultLabel,
}

pub struct PrometheusClient {
    registry: Registry,
    munge: Family<MungeRecord, Counter>,
    loop_duration: Histogram,

    // We can get this from the github api so we can track it as gauge
    github_api_read_request: Gauge,
    // Secondary limits are not part of the rate-limit response,
    // so we count each write request ourselves
    github_api_write_request: Counter,
}

impl Default for PrometheusClient {
    fn default() -> Self {
        let mut registry = Registry::default();
        let munge = Family::default();
        let github_api_read_request = Gauge::default();
        let github_api_write_request = Counter::default();
        let loop_duration = Histogram::new(
            [1., 5., 10., 30., 60., 120., 300., 600., 1800., f64::INFINITY].into_iter(),
        );

        registry.register(
            "github_api_read_requests",
            "Display used github read requests at a metric time",
            github_api_read_request.clone(),
        );
        registry.register(
            "github_api_write_requests",
            "Display total used github write requests from the start at a metric time",
            github_api_write_request.clone(),
        );
        registry.register("munge_result", "Outcome of munging an item", munge.clone());
        registry.register(
            "munge_loop_duration_seconds",
            "Time spent on one munge loop",
            loop_duration.clone(),
        );

        Self {
            registry,
            munge,
            loop_duration,
            github_api_read_request,
            github_api_write_request,
        }
    }
}

impl PrometheusClient {
    pub fn record(&self, munger: &str, repository: &str, result: &anyhow::Result<MungeResult>) {
        let record = MungeRecord {
            munger: munger.to_string(),
            repository: repository.to_string(),
            result: result.into(),
        };
        self.munge.get_or_create(&record).inc();
    }

    pub fn observe_loop(&self, started: chrono::DateTime<chrono::Utc>) {
        let time = chrono::Utc::now() - started;
        self.loop_duration
            .observe(time.num_milliseconds() as f64 / 1000.0);
    }

    pub fn add_write_request(&self) {
        self.github_api_write_request.inc();
    }

    pub fn set_read_requests(&self, value: i64) {
        self.github_api_read_request.set(value);
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}
