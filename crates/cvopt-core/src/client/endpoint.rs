//! Endpoint contracts: method, path, body encoding, access and retry class.
//!
//! Retry behaviour is a property of the endpoint, not of the HTTP library.
//! Only read endpoints retry; submissions that may bill or mutate never do.

use std::time::Duration;

use serde_json::Value;

use super::types::UploadFile;

/// HTTP method used by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

/// Body encoding an endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    None,
    Json,
    UrlEncoded,
    Multipart,
}

/// Whether a 401 means "session expired" or "credentials rejected".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Credential exchange and recovery endpoints.
    Public,
    /// Endpoints that expect the stored bearer credential.
    Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Side-effect free; transient failures may be retried.
    Read,
    /// Never retried automatically.
    Write,
}

/// Static contract for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contract {
    pub method: HttpMethod,
    pub path: &'static str,
    pub encoding: Encoding,
    pub access: Access,
    pub retry: RetryClass,
    /// Message used when an error body carries nothing readable.
    pub fallback_message: &'static str,
}

/// Every endpoint the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    Register,
    RequestReset,
    ResetPassword,
    CurrentUser,
    AnalyzeFile,
    AnalyzeText,
    Rewrite,
    UploadResume,
}

impl Endpoint {
    pub const ALL: [Endpoint; 9] = [
        Endpoint::Login,
        Endpoint::Register,
        Endpoint::RequestReset,
        Endpoint::ResetPassword,
        Endpoint::CurrentUser,
        Endpoint::AnalyzeFile,
        Endpoint::AnalyzeText,
        Endpoint::Rewrite,
        Endpoint::UploadResume,
    ];

    pub const fn contract(self) -> Contract {
        use Access::{Public, Session};
        use Encoding::{Json, Multipart, UrlEncoded};
        use HttpMethod::{Get, Post};
        use RetryClass::{Read, Write};

        const fn c(
            method: HttpMethod,
            path: &'static str,
            encoding: Encoding,
            access: Access,
            retry: RetryClass,
            fallback_message: &'static str,
        ) -> Contract {
            Contract {
                method,
                path,
                encoding,
                access,
                retry,
                fallback_message,
            }
        }

        match self {
            Endpoint::Login => c(Post, "/auth/login", UrlEncoded, Public, Write, "Sign in failed"),
            Endpoint::Register => c(Post, "/auth/register", Json, Public, Write, "Registration failed"),
            Endpoint::RequestReset => c(
                Post,
                "/auth/request-reset",
                Json,
                Public,
                Write,
                "Could not request a reset link",
            ),
            Endpoint::ResetPassword => c(
                Post,
                "/auth/reset-password",
                Json,
                Public,
                Write,
                "Could not update password",
            ),
            Endpoint::CurrentUser => c(
                Get,
                "/auth/me",
                Encoding::None,
                Session,
                Read,
                "Could not load account",
            ),
            Endpoint::AnalyzeFile => c(Post, "/analyze", Multipart, Session, Write, "Analysis failed"),
            Endpoint::AnalyzeText => {
                c(Post, "/analyze/text", Multipart, Session, Write, "Analysis failed")
            }
            Endpoint::Rewrite => c(Post, "/rewrite", Multipart, Session, Write, "Rewrite failed"),
            Endpoint::UploadResume => {
                c(Post, "/resumes/upload", Multipart, Session, Write, "Upload failed")
            }
        }
    }
}

/// Bounded retry for read endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Delay before retry `n` is `backoff * n`.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Total attempts allowed for a request of the given class.
    pub fn attempts_for(&self, class: RetryClass) -> u32 {
        match class {
            RetryClass::Read => 1 + self.max_retries,
            RetryClass::Write => 1,
        }
    }

    pub fn delay_before(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(retry)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

/// One multipart form field.
#[derive(Debug, Clone)]
pub enum MultipartField {
    Text { name: &'static str, value: String },
    File { name: &'static str, file: UploadFile },
}

impl MultipartField {
    pub fn text(name: &'static str, value: impl Into<String>) -> Self {
        MultipartField::Text {
            name,
            value: value.into(),
        }
    }
}

/// Request payload. Kept as plain data so a retry can rebuild it.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(&'static str, String)>),
    Multipart(Vec<MultipartField>),
}

impl RequestBody {
    pub fn encoding(&self) -> Encoding {
        match self {
            RequestBody::Empty => Encoding::None,
            RequestBody::Json(_) => Encoding::Json,
            RequestBody::Form(_) => Encoding::UrlEncoded,
            RequestBody::Multipart(_) => Encoding::Multipart,
        }
    }
}

/// A request against one endpoint.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    pub body: RequestBody,
    pub query: Vec<(&'static str, String)>,
}

impl ApiRequest {
    pub fn new(endpoint: Endpoint, body: RequestBody) -> Self {
        Self {
            endpoint,
            body,
            query: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }
}
