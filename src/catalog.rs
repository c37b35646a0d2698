use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, de};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::models::{CatalogState, CatalogView, ClassListing, RawClassRecord};
use crate::normalize::{MalformedPayload, normalize_all, parse_records};

pub const EMPTY_CATALOG_MESSAGE: &str = "현재 예정된 클래스가 없습니다";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream answered {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Malformed(#[from] MalformedPayload),
    #[error("no finished job to read items from")]
    NoFinishedJob,
    #[error("invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Something that yields raw class records.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn fetch_records(&self) -> Result<Vec<RawClassRecord>, CatalogError>;
}

async fn fetch_body(client: &reqwest::Client, url: &Url) -> Result<String, CatalogError> {
    debug!(%url, "fetching items");
    let response = client.get(url.as_str()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::Status(status));
    }
    Ok(response.text().await?)
}

/// Fixed in-memory records, for demos and local development.
#[derive(Clone, Default)]
pub struct StaticSource {
    records: Vec<RawClassRecord>,
}

impl StaticSource {
    pub fn new(records: Vec<RawClassRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl ItemSource for StaticSource {
    async fn fetch_records(&self) -> Result<Vec<RawClassRecord>, CatalogError> {
        Ok(self.records.clone())
    }
}

/// Single call to an items endpoint returning a JSON array.
#[derive(Clone)]
pub struct ItemsApiSource {
    client: reqwest::Client,
    url: Arc<Url>,
    count: u32,
}

impl ItemsApiSource {
    pub fn new(client: reqwest::Client, url: Url, count: u32) -> Self {
        Self {
            client,
            url: Arc::new(url),
            count,
        }
    }
}

#[async_trait]
impl ItemSource for ItemsApiSource {
    async fn fetch_records(&self) -> Result<Vec<RawClassRecord>, CatalogError> {
        let mut url = (*self.url).clone();
        url.query_pairs_mut()
            .append_pair("count", &self.count.to_string())
            .append_pair("format", "json");
        let body = fetch_body(&self.client, &url).await?;
        Ok(parse_records(&body)?)
    }
}

#[derive(Debug, Deserialize)]
struct JobList {
    #[serde(default)]
    jobs: Vec<JobSummary>,
}

#[derive(Debug, Deserialize)]
struct JobSummary {
    #[serde(deserialize_with = "job_id")]
    id: String,
}

/// Job ids come back as strings or bare numbers depending on the API version.
fn job_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(de::Error::custom(format!("unsupported job id: {other}"))),
    }
}

fn first_job_id(body: &str) -> Result<String, CatalogError> {
    let list: JobList =
        serde_json::from_str(body).map_err(|err| MalformedPayload(err.to_string()))?;
    list.jobs
        .into_iter()
        .next()
        .map(|job| job.id)
        .ok_or(CatalogError::NoFinishedJob)
}

/// Two-step job API: latest finished job, then its stored items.
#[derive(Clone)]
pub struct JobStorageSource {
    client: reqwest::Client,
    base_url: Arc<Url>,
    api_key: String,
}

impl JobStorageSource {
    pub fn new(client: reqwest::Client, base_url: Url, api_key: String) -> Self {
        Self {
            client,
            base_url: Arc::new(base_url),
            api_key,
        }
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, CatalogError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let mut pairs: Vec<(&str, &str)> = params.to_vec();
        if !self.api_key.is_empty() {
            pairs.push(("apikey", self.api_key.as_str()));
        }
        Ok(Url::parse_with_params(&format!("{base}/{path}"), &pairs)?)
    }

    pub async fn latest_finished_job(&self) -> Result<String, CatalogError> {
        let url = self.endpoint("jobs", &[("state", "finished"), ("count", "1")])?;
        let body = fetch_body(&self.client, &url).await?;
        first_job_id(&body)
    }
}

#[async_trait]
impl ItemSource for JobStorageSource {
    async fn fetch_records(&self) -> Result<Vec<RawClassRecord>, CatalogError> {
        let job_id = self.latest_finished_job().await?;
        info!(job_id = %job_id, "reading items of latest finished job");
        let url = self.endpoint(&format!("items/{job_id}"), &[("format", "json")])?;
        let body = fetch_body(&self.client, &url).await?;
        Ok(parse_records(&body)?)
    }
}

/// One catalog load. Starts in `Loading` and resolves exactly once.
#[derive(Debug)]
pub struct CatalogLoad {
    state: CatalogState,
}

impl CatalogLoad {
    pub fn start() -> Self {
        Self {
            state: CatalogState::Loading,
        }
    }

    pub fn state(&self) -> CatalogState {
        self.state
    }

    /// Consumes the load; there is no way back to `Loading`.
    pub fn resolve(self, classes: Vec<ClassListing>) -> CatalogView {
        if classes.is_empty() {
            CatalogView {
                state: CatalogState::Empty,
                message: Some(EMPTY_CATALOG_MESSAGE.to_string()),
                classes,
            }
        } else {
            CatalogView {
                state: CatalogState::Populated,
                message: None,
                classes,
            }
        }
    }
}

/// Fetches from the configured source and normalizes. Never fails.
#[derive(Clone)]
pub struct CatalogLoader {
    source: Arc<dyn ItemSource>,
}

impl CatalogLoader {
    pub fn new(source: Arc<dyn ItemSource>) -> Self {
        Self { source }
    }

    pub async fn load(&self) -> CatalogView {
        let load = CatalogLoad::start();
        let classes = match self.source.fetch_records().await {
            Ok(records) => normalize_all(records),
            Err(err @ CatalogError::NoFinishedJob) => {
                warn!(error = %err, "catalog upstream has nothing to show");
                Vec::new()
            }
            Err(err) => {
                error!(error = %err, "failed to load classes from upstream");
                Vec::new()
            }
        };
        if classes.is_empty() {
            warn!("catalog is empty");
        }
        load.resolve(classes)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct FailingSource;

    #[async_trait]
    impl ItemSource for FailingSource {
        async fn fetch_records(&self) -> Result<Vec<RawClassRecord>, CatalogError> {
            Err(CatalogError::Status(StatusCode::BAD_GATEWAY))
        }
    }

    #[test]
    fn test_first_job_id_accepts_string_and_number() {
        assert_eq!(first_job_id(r#"{"jobs":[{"id":"814119/1/7"}]}"#).unwrap(), "814119/1/7");
        assert_eq!(first_job_id(r#"{"jobs":[{"id":814119}]}"#).unwrap(), "814119");
        assert!(matches!(
            first_job_id(r#"{"jobs":[]}"#),
            Err(CatalogError::NoFinishedJob)
        ));
        assert!(matches!(
            first_job_id(r#"{"jobs":[{"id":null}]}"#),
            Err(CatalogError::Malformed(_))
        ));
    }

    #[test]
    fn test_catalog_load_starts_loading() {
        assert_eq!(CatalogLoad::start().state(), CatalogState::Loading);
    }

    #[test]
    fn test_resolve_empty() {
        let view = CatalogLoad::start().resolve(Vec::new());
        assert_eq!(view.state, CatalogState::Empty);
        assert_eq!(view.message.as_deref(), Some(EMPTY_CATALOG_MESSAGE));
    }

    #[tokio::test]
    async fn test_loader_populated_from_static_source() {
        let source = StaticSource::new(vec![
            RawClassRecord::from_value(json!({"name": "Scone Class", "members": "2//6"})),
            RawClassRecord::from_value(json!({"name": "Madeleine", "members": "6/6"})),
        ]);
        let view = CatalogLoader::new(Arc::new(source)).load().await;
        assert_eq!(view.state, CatalogState::Populated);
        assert_eq!(view.classes.len(), 2);
        assert_eq!(view.classes[0].members, "2/6");
        assert!(view.classes[1].is_full);
    }

    #[tokio::test]
    async fn test_loader_swallows_upstream_errors() {
        let view = CatalogLoader::new(Arc::new(FailingSource)).load().await;
        assert_eq!(view.state, CatalogState::Empty);
        assert!(view.classes.is_empty());
    }

    #[test]
    fn test_job_endpoint_keeps_slashes_in_job_id() {
        let source = JobStorageSource::new(
            reqwest::Client::new(),
            Url::parse("https://storage.example.com/").unwrap(),
            "k".into(),
        );
        let url = source
            .endpoint("items/814119/1/7", &[("format", "json")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.example.com/items/814119/1/7?format=json&apikey=k"
        );
    }
}
