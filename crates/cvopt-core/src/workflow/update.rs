//! Pure reducer: `(state, event) -> effects`. No I/O happens here.

use super::events::{WorkflowEffect, WorkflowEvent};
use super::state::WorkflowState;
use crate::client::{ApiResult, FailureKind};

pub fn update(state: &mut WorkflowState, event: WorkflowEvent) -> Vec<WorkflowEffect> {
    match event {
        WorkflowEvent::SelectMode(mode) => {
            state.mode = mode;
            vec![]
        }
        WorkflowEvent::SetJobDescription(text) => {
            state.job_description = text;
            vec![]
        }
        WorkflowEvent::SetCvText(text) => {
            state.set_cv_text(text);
            vec![]
        }
        WorkflowEvent::SelectFile(file) => {
            state.file = Some(file);
            vec![]
        }
        WorkflowEvent::ClearFile => {
            state.file = None;
            vec![]
        }
        WorkflowEvent::SetIncludeAi(include_ai) => {
            state.include_ai = include_ai;
            vec![]
        }
        WorkflowEvent::SubmitAnalysis => match state.submit_analysis() {
            Ok(effect) => vec![effect],
            Err(failure) => {
                tracing::debug!("analysis not submitted: {failure}");
                vec![]
            }
        },
        WorkflowEvent::SubmitRewrite => match state.submit_rewrite() {
            Ok(effect) => vec![effect],
            Err(failure) => {
                tracing::debug!("rewrite not submitted: {failure}");
                vec![]
            }
        },
        WorkflowEvent::CancelAnalysis => {
            if let Some(task) = state.analysis.cancel() {
                tracing::debug!(?task, "analysis cancelled");
            }
            vec![]
        }
        WorkflowEvent::CancelRewrite => {
            if let Some(task) = state.rewrite.cancel() {
                tracing::debug!(?task, "rewrite cancelled");
            }
            vec![]
        }
        WorkflowEvent::AnalysisCompleted { task, result } => {
            let expired = is_expired(&result);
            let extracted = result
                .as_ref()
                .ok()
                .and_then(|analysis| analysis.extracted_text.clone());

            if !state.analysis.resolve(task, result) {
                tracing::debug!(?task, "dropping stale analysis result");
                return vec![];
            }
            // Seed the rewrite input from the file the server just read.
            if let Some(text) = extracted {
                state.seed_cv_text(text);
            }
            session_effects(expired)
        }
        WorkflowEvent::RewriteCompleted { task, result } => {
            let expired = is_expired(&result);
            if !state.rewrite.resolve(task, result) {
                tracing::debug!(?task, "dropping stale rewrite result");
                return vec![];
            }
            session_effects(expired)
        }
    }
}

fn is_expired<T>(result: &ApiResult<T>) -> bool {
    matches!(result, Err(failure) if failure.kind == FailureKind::Unauthenticated)
}

fn session_effects(expired: bool) -> Vec<WorkflowEffect> {
    if expired {
        vec![WorkflowEffect::SessionExpired]
    } else {
        vec![]
    }
}
