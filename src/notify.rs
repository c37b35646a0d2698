use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("notification rejected ({status}): {body}")]
    Rejected { status: StatusCode, body: String },
}

pub type FormFields = BTreeMap<String, String>;

/// Transactional email to the operator.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, template_id: &str, fields: &FormFields) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct EmailJsRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a FormFields,
}

/// EmailJS REST API (`/api/v1.0/email/send`).
#[derive(Clone)]
pub struct EmailJsNotifier {
    client: reqwest::Client,
    endpoint: Arc<Url>,
    service_id: String,
    public_key: String,
    operator_email: String,
}

impl EmailJsNotifier {
    pub fn new(
        client: reqwest::Client,
        endpoint: Url,
        service_id: String,
        public_key: String,
        operator_email: String,
    ) -> Self {
        Self {
            client,
            endpoint: Arc::new(endpoint),
            service_id,
            public_key,
            operator_email,
        }
    }
}

#[async_trait]
impl Notifier for EmailJsNotifier {
    async fn send(&self, template_id: &str, fields: &FormFields) -> Result<(), NotifyError> {
        let mut params = fields.clone();
        params.insert("to_email".into(), self.operator_email.clone());

        debug!(template_id, "sending operator notification");
        let response = self
            .client
            .post(self.endpoint.as_str())
            .json(&EmailJsRequest {
                service_id: &self.service_id,
                template_id,
                user_id: &self.public_key,
                template_params: &params,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Rejected { status, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let mut fields = FormFields::new();
        fields.insert("name".into(), "김민지".into());
        let request = EmailJsRequest {
            service_id: "service_x",
            template_id: "template_y",
            user_id: "public",
            template_params: &fields,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["service_id"], "service_x");
        assert_eq!(value["template_id"], "template_y");
        assert_eq!(value["user_id"], "public");
        assert_eq!(value["template_params"]["name"], "김민지");
    }
}
