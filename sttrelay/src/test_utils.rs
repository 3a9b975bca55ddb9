//! Test utilities for driving the relay end to end.

use crate::config::{ApiKey, Config, ProviderConfig};
use axum_test::TestServer;
use url::Url;

/// Credential configured on every test app; assertions check it never leaks
pub const TEST_API_KEY: &str = "sk-test-3f9a1c7e-do-not-leak";

/// reqwest is built without a bundled crypto provider; `main` installs one, tests do it here
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

pub fn create_test_config(provider_url: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        provider: ProviderConfig {
            url: Url::parse(provider_url).expect("test provider URL is valid"),
            api_key: Some(ApiKey::new(TEST_API_KEY)),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn create_test_app(config: Config) -> TestServer {
    install_crypto_provider();
    config.validate().expect("test config is valid");

    crate::Application::new(config)
        .expect("Failed to create application")
        .into_test_server()
}

/// A provider URL on a local port nothing listens on
pub fn unreachable_provider_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/v1/speech-to-text")
}
