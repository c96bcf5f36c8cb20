//! HTTP client for the CV optimizer API.
//!
//! Every request goes through [`ApiClient::send`], which:
//! - attaches the stored credential as a bearer header when one exists,
//! - encodes the body the way the endpoint contract says,
//! - maps the response to `Ok(json)` or a typed [`Failure`],
//! - clears the token store on 401 before returning,
//! - retries transient failures for read endpoints only.

mod api;
mod endpoint;
mod failure;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use endpoint::{
    Access, ApiRequest, Contract, Encoding, Endpoint, HttpMethod, MultipartField, RequestBody,
    RetryClass, RetryPolicy,
};
pub use failure::{ApiResult, Failure, FailureKind, extract_error_message};
pub use types::{
    Account, AiSuggestions, AnalysisResult, AtsScore, Readability, RewriteResult, TokenResponse,
    UploadFile, UploadReceipt,
};

use crate::config::Config;
use crate::session::TokenStore;

/// Standard User-Agent header for cvopt API requests.
pub const USER_AGENT: &str = concat!("cvopt/", env!("CARGO_PKG_VERSION"));

/// Client bound to one API base URL and one token store.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Creates a client with default timeouts and retry policy.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, tokens: Arc<TokenStore>) -> Result<Self> {
        Self::build(base_url, tokens, None, RetryPolicy::default())
    }

    /// Creates a client from the loaded configuration.
    ///
    /// # Errors
    /// Returns an error if the configured base URL is invalid or the HTTP client cannot be built.
    pub fn from_config(config: &Config, tokens: Arc<TokenStore>) -> Result<Self> {
        let base_url = config.resolve_api_url()?;
        Self::build(
            &base_url,
            tokens,
            config.request_timeout(),
            config.retry_policy(),
        )
    }

    fn build(
        base_url: &str,
        tokens: Arc<TokenStore>,
        timeout: Option<Duration>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        url::Url::parse(base_url).with_context(|| format!("Invalid API base URL: {base_url}"))?;

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            retry,
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Sends a request and returns the decoded JSON body.
    ///
    /// # Errors
    /// Returns a [`Failure`] classified per the endpoint contract.
    pub async fn send(&self, request: &ApiRequest) -> ApiResult<Value> {
        let contract = request.endpoint.contract();
        if request.body.encoding() != contract.encoding {
            return Err(Failure::validation(format!(
                "{} expects a {:?} body",
                contract.path, contract.encoding
            )));
        }

        let attempts = self.retry.attempts_for(contract.retry);
        let mut attempt = 1;
        loop {
            match self.send_once(request, &contract).await {
                Err(failure) if failure.is_retryable() && attempt < attempts => {
                    let delay = self.retry.delay_before(attempt);
                    tracing::warn!(
                        path = contract.path,
                        attempt,
                        error = %failure,
                        "transient failure, retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Sends a request and decodes the body into `T`.
    ///
    /// # Errors
    /// Returns a [`Failure`] if the request fails or the body does not match `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> ApiResult<T> {
        let value = self.send(request).await?;
        decode(request.endpoint, value)
    }

    async fn send_once(&self, request: &ApiRequest, contract: &Contract) -> ApiResult<Value> {
        let url = format!("{}{}", self.base_url, contract.path);
        let mut builder = self.http.request(contract.method.into(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(credential) = self.tokens.get() {
            builder = builder.bearer_auth(credential.bearer());
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(pairs) => builder.form(pairs),
            RequestBody::Multipart(fields) => builder.multipart(build_form(fields)?),
        };

        tracing::debug!(method = ?contract.method, path = contract.path, "sending request");

        let response = builder
            .send()
            .await
            .map_err(|e| Failure::from_transport(&e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Failure::from_transport(&e))?;

        if status.is_success() {
            tracing::debug!(path = contract.path, status = status.as_u16(), "request succeeded");
            return parse_body(&body);
        }

        Err(self.classify(status.as_u16(), &body, contract))
    }

    fn classify(&self, status: u16, body: &str, contract: &Contract) -> Failure {
        let failure = Failure::from_status(status, body, contract.fallback_message);
        tracing::info!(
            path = contract.path,
            status,
            kind = %failure.kind,
            "request failed"
        );

        if status != 401 {
            return failure;
        }

        match self.tokens.clear() {
            Ok(true) => tracing::info!("session rejected by server; cleared stored credential"),
            Ok(false) => {}
            Err(e) => tracing::warn!("failed to persist cleared session: {e:#}"),
        }

        match contract.access {
            // A wrong password is a rejection, not an expired session.
            Access::Public => Failure::rejected(failure.message),
            Access::Session => failure,
        }
    }
}

fn build_form(fields: &[MultipartField]) -> ApiResult<Form> {
    let mut form = Form::new();
    for field in fields {
        form = match field {
            MultipartField::Text { name, value } => form.text(*name, value.clone()),
            MultipartField::File { name, file } => {
                let part = Part::bytes(file.bytes.to_vec())
                    .file_name(file.filename.clone())
                    .mime_str(&file.mime_type)
                    .map_err(|e| {
                        Failure::validation(format!(
                            "Unsupported file type {}: {e}",
                            file.mime_type
                        ))
                    })?;
                form.part(*name, part)
            }
        };
    }
    Ok(form)
}

fn parse_body(body: &str) -> ApiResult<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!("undecodable response body: {e}");
        Failure::rejected("Unexpected response from server")
    })
}

fn decode<T: DeserializeOwned>(endpoint: Endpoint, value: Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|e| {
        tracing::warn!(?endpoint, "response did not match expected shape: {e}");
        Failure::rejected("Unexpected response from server")
    })
}
