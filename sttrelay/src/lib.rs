//! # sttrelay: speech-to-text relay
//!
//! `sttrelay` accepts an uploaded audio file over HTTP, forwards it to the ElevenLabs
//! speech-to-text API, and hands the provider's JSON response back to the caller unchanged.
//!
//! ## Overview
//!
//! Browser and mobile clients should not hold the provider credential. The relay keeps it
//! server-side: a client posts its audio to `POST /transcribe`, the relay re-packages the file as
//! a multipart request carrying the credential and the model selector, waits for the provider,
//! and returns whatever the provider returned.
//!
//! ### Request Flow
//!
//! caller → relay → provider → relay → caller. Each request is independent: no queue, no
//! retries, no caching, nothing persisted. The only shared state is the [`ProviderClient`]
//! (connection pool, endpoint, model id, credential), built once at startup and read-only after.
//!
//! ### Errors
//!
//! Two kinds reach callers, both as `{"detail": "..."}`:
//!
//! - the provider answered with a non-success status: that status is mirrored and `detail` is
//!   the provider's raw response text,
//! - anything else (malformed upload, provider unreachable, unreadable reply): 500 with the
//!   error's description.
//!
//! See [`errors`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use sttrelay::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = sttrelay::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     sttrelay::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config)?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod config;
pub mod errors;
mod openapi;
pub mod provider;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::config::{CorsConfig, CorsOrigin};
use crate::openapi::ApiDoc;
pub use crate::provider::ProviderClient;

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .provider(Arc::new(ProviderClient::new(&config.provider)?))
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub provider: Arc<ProviderClient>,
}

/// Create CORS layer from configuration
///
/// Browsers refuse a literal `*` on credentialed requests, so a wildcard origin combined with
/// `allow_credentials` is served by echoing the caller's origin, method and headers back.
fn create_cors_layer(config: &CorsConfig) -> anyhow::Result<CorsLayer> {
    let wildcard = config.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));

    let origin = if wildcard {
        if config.allow_credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::from(Any)
        }
    } else {
        let mut origins = Vec::new();
        for origin in &config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins never carry a path; Url always renders one
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let (methods, headers) = if config.allow_credentials {
        (AllowMethods::mirror_request(), AllowHeaders::mirror_request())
    } else {
        (AllowMethods::from(Any), AllowHeaders::from(Any))
    };

    let mut cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(config.allow_credentials);

    if let Some(max_age) = config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// - `POST /transcribe`, `GET /healthz`
/// - `GET /openapi.json` and the Scalar UI at `/docs`
/// - `GET /internal/metrics` when `enable_metrics` is set
/// - body limit, CORS and tracing layers
///
/// # Errors
///
/// Returns an error if CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let body_limit = match state.config.max_upload_size {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    let router = Router::new()
        .route("/transcribe", post(api::handlers::transcriptions::transcribe))
        .route("/healthz", get(api::handlers::health::healthz))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .layer(body_limit)
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config.cors)?;
    let mut router = router.layer(cors_layer);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns the router and configuration.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] builds the provider client and the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, in-flight requests drain and telemetry
///    is flushed
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub fn new(config: Config) -> anyhow::Result<Self> {
        // Config's Debug redacts the credential
        debug!("Starting relay with configuration: {:#?}", config);

        let provider = Arc::new(ProviderClient::new(&config.provider)?);
        let app_state = AppState::builder().config(config.clone()).provider(provider).build();
        let router = build_router(&app_state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Relay listening on http://{}, forwarding to {}",
            bind_addr, self.config.provider.url
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{create_test_app, create_test_config};
    use axum::http::{Method, StatusCode};
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::{Value, json};
    use url::Url;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const UNUSED_PROVIDER: &str = "http://127.0.0.1:9/v1/speech-to-text";

    #[tokio::test]
    async fn test_default_cors_echoes_origin_with_credentials() {
        let server = create_test_app(create_test_config(UNUSED_PROVIDER));

        let response = server
            .method(Method::OPTIONS, "/transcribe")
            .add_header("origin", "https://globe.example.com")
            .add_header("access-control-request-method", "POST")
            .add_header("access-control-request-headers", "x-custom-header")
            .await;

        assert_eq!(response.header("access-control-allow-origin"), "https://globe.example.com");
        assert_eq!(response.header("access-control-allow-credentials"), "true");
        assert_eq!(response.header("access-control-allow-methods"), "POST");
        assert_eq!(response.header("access-control-allow-headers"), "x-custom-header");
    }

    #[tokio::test]
    async fn test_cors_headers_on_simple_request() {
        let server = create_test_app(create_test_config(UNUSED_PROVIDER));

        let response = server.get("/healthz").add_header("origin", "http://localhost:3000").await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.header("access-control-allow-origin"), "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_cors_wildcard_without_credentials_uses_star() {
        let mut config = create_test_config(UNUSED_PROVIDER);
        config.cors.allow_credentials = false;
        let server = create_test_app(config);

        let response = server.get("/healthz").add_header("origin", "https://anywhere.example").await;

        assert_eq!(response.header("access-control-allow-origin"), "*");
        assert!(response.maybe_header("access-control-allow-credentials").is_none());
    }

    #[tokio::test]
    async fn test_cors_explicit_origins() {
        let mut config = create_test_config(UNUSED_PROVIDER);
        config.cors.allowed_origins = vec![CorsOrigin::Url(Url::parse("https://app.example.com").unwrap())];
        let server = create_test_app(config);

        let allowed = server.get("/healthz").add_header("origin", "https://app.example.com").await;
        assert_eq!(allowed.header("access-control-allow-origin"), "https://app.example.com");

        let denied = server.get("/healthz").add_header("origin", "https://evil.example.com").await;
        assert!(denied.maybe_header("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let server = create_test_app(create_test_config(UNUSED_PROVIDER));

        let response = server.get("/openapi.json").await;

        response.assert_status(StatusCode::OK);
        let doc: Value = response.json();
        assert!(doc["paths"]["/transcribe"]["post"].is_object());
    }

    #[tokio::test]
    async fn test_upload_limit_applies_when_configured() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "small" })))
            .mount(&mock_server)
            .await;

        let mut config = create_test_config(&format!("{}/v1/speech-to-text", mock_server.uri()));
        config.max_upload_size = Some(1024);
        let server = create_test_app(config);

        let small = MultipartForm::new().add_part("file", Part::bytes(vec![0u8; 16]).file_name("s.wav").mime_type("audio/wav"));
        server.post("/transcribe").multipart(small).await.assert_status(StatusCode::OK);

        let large = MultipartForm::new().add_part("file", Part::bytes(vec![0u8; 4096]).file_name("l.wav").mime_type("audio/wav"));
        let response = server.post("/transcribe").multipart(large).await;
        assert_ne!(response.status_code(), StatusCode::OK);
        assert!(response.json::<Value>()["detail"].is_string());
    }

    #[tokio::test]
    async fn test_large_upload_accepted_without_limit() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "long" })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let server = create_test_app(create_test_config(&format!("{}/v1/speech-to-text", mock_server.uri())));

        // Larger than axum's 2MB default body limit
        let audio = vec![7u8; 3 * 1024 * 1024];
        let form = MultipartForm::new().add_part("file", Part::bytes(audio).file_name("long.flac").mime_type("audio/flac"));
        let response = server.post("/transcribe").multipart(form).await;

        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_counts_transcription_outcomes() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("good-audio"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "ok" })))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("bad-audio"))
            .respond_with(ResponseTemplate::new(422).set_body_string("unsupported format"))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("garbled-audio"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        // Only this test enables metrics: the Prometheus recorder is process-global
        let mut config = create_test_config(&format!("{}/v1/speech-to-text", mock_server.uri()));
        config.enable_metrics = true;
        let server = create_test_app(config);

        for (audio, expected) in [
            ("good-audio", StatusCode::OK),
            ("bad-audio", StatusCode::UNPROCESSABLE_ENTITY),
            ("garbled-audio", StatusCode::INTERNAL_SERVER_ERROR),
        ] {
            let form = MultipartForm::new().add_part(
                "file",
                Part::bytes(audio.as_bytes().to_vec()).file_name("clip.wav").mime_type("audio/wav"),
            );
            server.post("/transcribe").multipart(form).await.assert_status(expected);
        }

        let response = server.get("/internal/metrics").await;
        response.assert_status(StatusCode::OK);

        // Other tests share the recorder, so only presence is checked, not exact counts
        let rendered = response.text();
        for outcome in ["success", "upstream_error", "internal_error"] {
            let series = format!(r#"sttrelay_transcriptions_total{{outcome="{outcome}"}}"#);
            assert!(rendered.contains(&series), "missing {series} in:\n{rendered}");
        }
    }

    #[tokio::test]
    async fn test_metrics_endpoint_absent_by_default() {
        let server = create_test_app(create_test_config(UNUSED_PROVIDER));

        server.get("/internal/metrics").await.assert_status(StatusCode::NOT_FOUND);
    }
}
