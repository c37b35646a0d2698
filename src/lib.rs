pub mod catalog;
pub mod error;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod notify;
pub mod openapi;
pub mod registration;
pub mod settings;
pub mod store;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use axum::{
    Router,
    routing::{get, post},
};
use handlers::{
    create_registration, create_schedule_request, get_class_menu, get_classes, healthz_live,
    healthz_ready, not_found, root,
};
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::catalog::{CatalogLoader, ItemSource, ItemsApiSource, JobStorageSource};
use crate::notify::EmailJsNotifier;
use crate::openapi::ApiDoc;
use crate::registration::RegistrationSubmitter;
use crate::settings::{CatalogSource, Settings};
use crate::store::RestStore;

#[derive(Clone)]
pub struct AppState {
    pub(crate) settings: Settings,
    pub(crate) catalog: Arc<CatalogLoader>,
    pub(crate) submitter: Arc<RegistrationSubmitter>,
}

impl AppState {
    pub fn new(settings: Settings, catalog: CatalogLoader, submitter: RegistrationSubmitter) -> Self {
        Self {
            settings,
            catalog: Arc::new(catalog),
            submitter: Arc::new(submitter),
        }
    }

    /// Composition root: one HTTP client shared by every integration.
    pub fn from_settings(settings: Settings) -> Result<Self, reqwest::Error> {
        let client = http_client(&settings)?;

        let store = Arc::new(RestStore::new(
            client.clone(),
            settings.store_url.clone(),
            settings.store_api_key.clone(),
        ));
        let source: Arc<dyn ItemSource> = match settings.catalog_source {
            CatalogSource::Table => store.clone() as Arc<dyn ItemSource>,
            CatalogSource::ItemsApi => Arc::new(ItemsApiSource::new(
                client.clone(),
                settings.items_api_url.clone(),
                settings.items_api_count,
            )),
            CatalogSource::Jobs => Arc::new(JobStorageSource::new(
                client.clone(),
                settings.job_api_url.clone(),
                settings.job_api_key.clone(),
            )),
        };
        let notifier = Arc::new(EmailJsNotifier::new(
            client,
            settings.emailjs_url.clone(),
            settings.emailjs_service_id.clone(),
            settings.emailjs_public_key.clone(),
            settings.operator_email.clone(),
        ));
        let submitter =
            RegistrationSubmitter::new(store, notifier, settings.emailjs_template_id.clone());

        Ok(Self::new(settings, CatalogLoader::new(source), submitter))
    }
}

/// Client used for the store, the catalog upstreams and EmailJS. All of them are https.
pub fn http_client(settings: &Settings) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
}

pub async fn run() ->Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    info!(source = ?settings.catalog_source, "catalog source selected");
    let state = AppState::from_settings(settings)?;
    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!("Starting Baking Forest Class API on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    // the booking page is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route("/classes", get(get_classes))
        .route("/registrations", post(create_registration))
        .route("/schedule-requests", post(create_schedule_request))
        .route("/schedule-requests/menu", get(get_class_menu))
        .fallback(not_found)
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(cors).layer(trace_layer)
}
