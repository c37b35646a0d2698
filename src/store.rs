use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::catalog::{CatalogError, ItemSource};
use crate::models::{ClassListing, RawClassRecord, Registration};
use crate::normalize::{normalize_all, parse_records};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected the request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("invalid store URL: {0}")]
    Url(#[from] url::ParseError),
}

impl StoreError {
    /// Reason suitable for the failure notice.
    pub fn reason(&self) -> String {
        match self {
            StoreError::Rejected { message, .. } if !message.is_empty() => message.clone(),
            _ => "잠시 후 다시 시도해주세요".to_string(),
        }
    }
}

/// Persistence for registrations and the class table.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn create(&self, registration: &Registration) -> Result<(), StoreError>;
    async fn increment_enrolled(&self, class_id: &str) -> Result<(), StoreError>;
    async fn list_classes(&self) -> Result<Vec<ClassListing>, StoreError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationRow<'a> {
    #[serde(flatten)]
    registration: &'a Registration,
    created_at: String,
}

#[derive(Serialize)]
struct IncrementArgs<'a> {
    class_id: &'a str,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// PostgREST-style table API (`/rest/v1/...`) with anon-key headers.
#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: Arc<Url>,
    api_key: String,
}

impl RestStore {
    pub fn new(client: reqwest::Client, base_url: Url, api_key: String) -> Self {
        Self {
            client,
            base_url: Arc::new(base_url),
            api_key,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/rest/v1/{path}"))
    }

    fn post(&self, url: Url) -> reqwest::RequestBuilder {
        self.client
            .post(url.as_str())
            .header("apikey", self.api_key.as_str())
            .bearer_auth(&self.api_key)
    }

    async fn check(response: reqwest::Response) -> Result<(), StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        Err(StoreError::Rejected { status, message })
    }

    /// Raw rows of `baking_classes`, oldest class date first.
    pub async fn fetch_class_rows(&self) -> Result<Vec<RawClassRecord>, CatalogError> {
        let mut url = self.endpoint("baking_classes")?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "date.asc");
        let response = self
            .client
            .get(url.as_str())
            .header("apikey", self.api_key.as_str())
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }
        let body = response.text().await?;
        Ok(parse_records(&body)?)
    }
}

#[async_trait]
impl RegistrationStore for RestStore {
    async fn create(&self, registration: &Registration) -> Result<(), StoreError> {
        let row = RegistrationRow {
            registration,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        debug!(class_id = %registration.class_id, "inserting registration");
        let response = self
            .post(self.endpoint("registrations")?)
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .await?;
        Self::check(response).await
    }

    async fn increment_enrolled(&self, class_id: &str) -> Result<(), StoreError> {
        let response = self
            .post(self.endpoint("rpc/increment_enrolled")?)
            .json(&IncrementArgs { class_id })
            .send()
            .await?;
        Self::check(response).await
    }

    async fn list_classes(&self) -> Result<Vec<ClassListing>, StoreError> {
        Ok(normalize_all(self.fetch_class_rows().await?))
    }
}

#[async_trait]
impl ItemSource for RestStore {
    async fn fetch_records(&self) -> Result<Vec<RawClassRecord>, CatalogError> {
        self.fetch_class_rows().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_row_shape() {
        let registration = Registration {
            class_id: "c1".into(),
            name: "김민지".into(),
            email: String::new(),
            phone: "01012345678".into(),
            baking_class: "Scone Class".into(),
        };
        let row = RegistrationRow {
            registration: &registration,
            created_at: "2025-06-01T00:00:00.000Z".into(),
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["classId"], "c1");
        assert_eq!(value["bakingClass"], "Scone Class");
        assert_eq!(value["createdAt"], "2025-06-01T00:00:00.000Z");
    }

    #[test]
    fn test_endpoint_joins_rest_path() {
        let store = RestStore::new(
            reqwest::Client::new(),
            Url::parse("https://abc.supabase.co/").unwrap(),
            "key".into(),
        );
        assert_eq!(
            store.endpoint("rpc/increment_enrolled").unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/rpc/increment_enrolled"
        );
    }

    #[test]
    fn test_reason_prefers_store_message() {
        let err = StoreError::Rejected {
            status: StatusCode::CONFLICT,
            message: "duplicate key".into(),
        };
        assert_eq!(err.reason(), "duplicate key");
        let err = StoreError::Rejected {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: String::new(),
        };
        assert_eq!(err.reason(), "잠시 후 다시 시도해주세요");
    }
}
