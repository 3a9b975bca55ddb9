//! Outbound client for the speech-to-text provider.
//!
//! One [`ProviderClient`] is built at startup and shared by every request. It owns the
//! connection pool, the endpoint URL, the model selector and the credential; handlers only hand
//! it an [`Upload`] and get back the provider's JSON.

use anyhow::Context;
use reqwest::{
    Client,
    header::HeaderValue,
    multipart::{Form, Part},
};
use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use crate::api::models::transcriptions::Upload;
use crate::config::ProviderConfig;
use crate::errors::{Error, Result};

/// Header carrying the provider credential
pub const API_KEY_HEADER: &str = "xi-api-key";

const FILE_FIELD: &str = "file";
const MODEL_FIELD: &str = "model_id";

pub struct ProviderClient {
    client: Client,
    url: Url,
    model_id: String,
    api_key: HeaderValue,
}

impl ProviderClient {
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let key = config.api_key.as_ref().context("provider credential is not configured")?;
        let mut api_key = HeaderValue::from_str(key.expose()).context("provider credential is not a valid header value")?;
        api_key.set_sensitive(true);

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build provider HTTP client")?;

        Ok(Self {
            client,
            url: config.url.clone(),
            model_id: config.model_id.clone(),
            api_key,
        })
    }

    /// Forward one upload and return the provider's JSON body untouched.
    ///
    /// A non-2xx reply becomes [`Error::Upstream`] carrying the provider's status and raw text.
    /// Everything else that goes wrong (bad content type, connection failure, a body that is not
    /// JSON) is [`Error::Internal`].
    #[instrument(skip_all, fields(filename = ?upload.filename, content_type = ?upload.content_type, bytes = upload.size()))]
    pub async fn transcribe(&self, upload: Upload) -> Result<Value> {
        let result = self.send(upload).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(Error::Upstream { .. }) => "upstream_error",
            Err(_) => "internal_error",
        };
        metrics::counter!("sttrelay_transcriptions_total", "outcome" => outcome).increment(1);

        result
    }

    async fn send(&self, upload: Upload) -> Result<Value> {
        let form = self.build_form(upload)?;

        debug!(url = %self.url, model_id = %self.model_id, "Forwarding upload to provider");

        let response = self
            .client
            .post(self.url.clone())
            .header(API_KEY_HEADER, self.api_key.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(Error::Upstream { status, body });
        }

        let body: Value = response.json().await?;
        info!(status = %status, "Provider returned transcription");
        debug!(response = %body, "Provider response body");

        Ok(body)
    }

    fn build_form(&self, upload: Upload) -> Result<Form> {
        let mut part = Part::bytes(Vec::from(upload.bytes));
        if let Some(filename) = upload.filename {
            part = part.file_name(filename);
        }
        if let Some(content_type) = upload.content_type {
            part = part.mime_str(&content_type).map_err(|e| Error::Internal {
                message: format!("Invalid content type '{content_type}': {e}"),
            })?;
        }

        // Filenames go out byte-for-byte as the caller sent them
        Ok(Form::new()
            .percent_encode_noop()
            .part(FILE_FIELD, part)
            .text(MODEL_FIELD, self.model_id.clone()))
    }
}
