use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use url::Url;

/// Which upstream the catalog is read from. Exactly one per deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    /// Direct read of the `baking_classes` table in the store.
    Table,
    /// One call to an items endpoint that returns a JSON array.
    ItemsApi,
    /// Latest finished scraping job, then that job's stored items.
    Jobs,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub port: u16,
    pub debug: bool,
    pub enable_swagger: bool,
    pub request_timeout_secs: u64,

    pub catalog_source: CatalogSource,
    pub store_url: Url,
    pub store_api_key: String,
    pub items_api_url: Url,
    pub items_api_count: u32,
    pub job_api_url: Url,
    pub job_api_key: String,

    pub emailjs_url: Url,
    pub emailjs_service_id: String,
    pub emailjs_template_id: String,
    pub emailjs_public_key: String,
    pub operator_email: String,

    pub min_phone_digits: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // APP_STORE_URL -> store_url; "__" is reserved for nesting
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("port", 8080)?
            .set_default("debug", false)?
            .set_default("enable_swagger", true)?
            .set_default("request_timeout_secs", 15)?
            .set_default("catalog_source", "jobs")?
            .set_default("store_url", "https://example.supabase.co")?
            .set_default("store_api_key", "your-anon-key")?
            .set_default(
                "items_api_url",
                "https://storage.scrapinghub.com/items/814119/1/7",
            )?
            .set_default("items_api_count", 10)?
            .set_default("job_api_url", "https://storage.scrapinghub.com")?
            .set_default("job_api_key", "")?
            .set_default("emailjs_url", "https://api.emailjs.com/api/v1.0/email/send")?
            .set_default("emailjs_service_id", "")?
            .set_default("emailjs_template_id", "")?
            .set_default("emailjs_public_key", "")?
            .set_default("operator_email", "bakingforest@example.com")?
            .set_default("min_phone_digits", 10)?
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn clear_app_env() {
        for (key, _) in std::env::vars() {
            if key.starts_with("APP_") {
                // SAFETY: serialized via #[serial]; no other thread reads the env here.
                unsafe { std::env::remove_var(key) };
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_app_env();
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.catalog_source, CatalogSource::Jobs);
        assert_eq!(settings.min_phone_digits, 10);
        assert_eq!(settings.items_api_count, 10);
        assert!(settings.enable_swagger);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_app_env();
        // SAFETY: serialized via #[serial].
        unsafe {
            std::env::set_var("APP_PORT", "9090");
            std::env::set_var("APP_CATALOG_SOURCE", "table");
            std::env::set_var("APP_STORE_URL", "https://store.test");
            std::env::set_var("APP_OPERATOR_EMAIL", "owner@bakery.test");
        }
        let settings = Settings::from_env().unwrap();
        clear_app_env();

        assert_eq!(settings.port, 9090);
        assert_eq!(settings.catalog_source, CatalogSource::Table);
        assert_eq!(settings.store_url.as_str(), "https://store.test/");
        assert_eq!(settings.operator_email, "owner@bakery.test");
    }

    #[test]
    #[serial]
    fn test_numeric_looking_secrets_stay_strings() {
        clear_app_env();
        // SAFETY: serialized via #[serial].
        unsafe {
            std::env::set_var("APP_JOB_API_KEY", "00123");
            std::env::set_var("APP_STORE_API_KEY", "1e5");
            std::env::set_var("APP_EMAILJS_PUBLIC_KEY", "true");
            std::env::set_var("APP_DEBUG", "true");
            std::env::set_var("APP_MIN_PHONE_DIGITS", "11");
        }
        let settings = Settings::from_env().unwrap();
        clear_app_env();

        assert_eq!(settings.job_api_key, "00123");
        assert_eq!(settings.store_api_key, "1e5");
        assert_eq!(settings.emailjs_public_key, "true");
        assert!(settings.debug);
        assert_eq!(settings.min_phone_digits, 11);
    }
}
