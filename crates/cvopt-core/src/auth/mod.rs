//! Authentication flows: login, register, forgot-password, reset-password.
//!
//! Each flow is `Idle -> Submitting -> (Succeeded | Failed)`. While a flow is
//! submitting, another submit is refused locally. A failure keeps its message
//! for display and drops the flow back to idle so the user can retry.

mod flows;

use std::future::Future;

use anyhow::Result;

pub use flows::{
    ForgotPasswordFlow, LoginFlow, LoginForm, MIN_PASSWORD_LEN, RegisterFlow, RegisterForm,
    ResetPasswordFlow,
};

use crate::client::{ApiResult, Failure};
use crate::gate::Route;
use crate::session::TokenStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowStatus {
    #[default]
    Idle,
    Submitting,
}

/// What the caller should do after a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Move to another view, showing `notice` on the way.
    Navigate { to: Route, notice: String },
    /// Stay on the current view and show `notice`.
    Stay { notice: String },
}

impl FlowOutcome {
    pub fn notice(&self) -> &str {
        match self {
            FlowOutcome::Navigate { notice, .. } | FlowOutcome::Stay { notice } => notice,
        }
    }

    pub fn destination(&self) -> Option<&Route> {
        match self {
            FlowOutcome::Navigate { to, .. } => Some(to),
            FlowOutcome::Stay { .. } => None,
        }
    }
}

/// Status plus the last message shown for a flow.
#[derive(Debug, Clone, Default)]
pub struct FlowState {
    status: FlowStatus,
    error: Option<Failure>,
    notice: Option<String>,
}

impl FlowState {
    pub fn status(&self) -> FlowStatus {
        self.status
    }

    pub fn is_submitting(&self) -> bool {
        self.status == FlowStatus::Submitting
    }

    pub fn error(&self) -> Option<&Failure> {
        self.error.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Enters `Submitting`, or refuses if a submit is already in flight.
    ///
    /// # Errors
    /// `Validation` when a submit is already running.
    pub fn begin(&mut self) -> ApiResult<()> {
        if self.is_submitting() {
            return Err(Failure::validation("Already submitting"));
        }
        self.status = FlowStatus::Submitting;
        self.error = None;
        self.notice = None;
        Ok(())
    }

    /// Records the result of a submit and returns to `Idle`.
    ///
    /// # Errors
    /// Passes `result`'s failure through after recording it.
    pub fn finish(&mut self, result: ApiResult<FlowOutcome>) -> ApiResult<FlowOutcome> {
        self.status = FlowStatus::Idle;
        match result {
            Ok(outcome) => {
                self.error = None;
                self.notice = Some(outcome.notice().to_string());
                Ok(outcome)
            }
            Err(failure) => Err(self.reject(failure)),
        }
    }

    /// Records a failure without touching the status.
    fn reject(&mut self, failure: Failure) -> Failure {
        tracing::debug!(kind = %failure.kind, "auth flow failed: {failure}");
        self.notice = None;
        self.error = Some(failure.clone());
        failure
    }

    /// Runs one submit: duplicate check, local validation, then the call.
    async fn run<Fut>(&mut self, validation: ApiResult<()>, call: Fut) -> ApiResult<FlowOutcome>
    where
        Fut: Future<Output = ApiResult<FlowOutcome>>,
    {
        if self.is_submitting() {
            return Err(Failure::validation("Already submitting"));
        }
        if let Err(failure) = validation {
            return Err(self.reject(failure));
        }
        self.begin()?;
        let guard = SubmitGuard(self);
        let result = call.await;
        guard.0.finish(result)
    }
}

/// Returns the flow to `Idle` if a submit is dropped before it finishes.
struct SubmitGuard<'a>(&'a mut FlowState);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.status = FlowStatus::Idle;
    }
}

/// Signs out locally. Returns whether a session existed.
///
/// # Errors
/// Returns an error if the cleared session cannot be persisted.
pub fn logout(tokens: &TokenStore) -> Result<bool> {
    tokens.clear()
}

/// Stores a freshly issued credential.
///
/// The session is usable in memory even when it cannot be written to disk,
/// so a persistence error is logged rather than failing the sign-in.
fn store_credential(tokens: &TokenStore, credential: crate::session::Credential) {
    if let Err(e) = tokens.set(credential) {
        tracing::warn!("signed in, but the session could not be saved: {e:#}");
    }
}
