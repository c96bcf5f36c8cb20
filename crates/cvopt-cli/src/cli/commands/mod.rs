//! CLI command handlers.

pub mod analyze;
pub mod auth;
pub mod config;
pub mod upload;

use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow};
use cvopt_core::client::{ApiClient, Failure, FailureKind};
use cvopt_core::config::Config;
use cvopt_core::gate::{AuthGate, Route};
use cvopt_core::report;
use cvopt_core::session::TokenStore;

pub const NOT_LOGGED_IN: &str = "Not logged in. Run `cvopt login` first.";

/// Shared handles for one CLI invocation.
pub struct Context {
    pub tokens: Arc<TokenStore>,
    pub client: ApiClient,
    pub gate: AuthGate,
}

impl Context {
    pub fn open(config: &Config) -> Result<Self> {
        let tokens = Arc::new(TokenStore::open_default().context("open session")?);
        let client = ApiClient::from_config(config, Arc::clone(&tokens))?;
        let gate = AuthGate::new(Arc::clone(&tokens));
        tracing::debug!(api = client.base_url(), "cli context ready");
        Ok(Self {
            tokens,
            client,
            gate,
        })
    }

    /// Fails unless the dashboard is reachable with the current session.
    pub fn require_session(&self) -> Result<()> {
        if self.gate.navigate(Route::Dashboard).is_allowed() {
            Ok(())
        } else {
            Err(anyhow!(NOT_LOGGED_IN))
        }
    }
}

/// Turns a request failure into the error printed on exit.
pub fn failure_error(failure: &Failure) -> anyhow::Error {
    match failure.kind {
        FailureKind::Unauthenticated => anyhow!(
            "{} Run `cvopt login` to sign in again.",
            failure.message
        ),
        _ => anyhow!(report::render_failure(failure)),
    }
}

/// Returns `value` itself, or the contents of the file when it starts with `@`.
pub fn read_value(value: &str) -> Result<String> {
    match value.strip_prefix('@') {
        Some(path) => read_text_file(&cvopt_core::mime::normalize_input_path(path)),
        None => Ok(value.to_string()),
    }
}

pub fn read_text_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Uses the flag when given, otherwise reads one line from stdin.
pub fn password_or_stdin(flag: Option<String>, prompt: &str) -> Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprint!("{prompt}: ");
        io::stderr().flush().ok();
    }
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
