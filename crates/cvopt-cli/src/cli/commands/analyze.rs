//! `analyze` and `rewrite`: drive the workflow runtime to completion.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use cvopt_core::client::UploadFile;
use cvopt_core::mime::normalize_input_path;
use cvopt_core::report;
use cvopt_core::workflow::{InputMode, WorkflowEvent, WorkflowRuntime, WorkflowState};

use super::{Context, failure_error, read_text_file, read_value};

pub enum Source {
    File(String),
    Text(String),
    TextFile(PathBuf),
}

pub struct AnalyzeOptions<'a> {
    pub job: &'a str,
    pub source: Source,
    pub rewrite: bool,
    pub include_ai: bool,
}

pub async fn analyze(ctx: &Context, options: AnalyzeOptions<'_>) -> Result<()> {
    ctx.require_session()?;

    let state = WorkflowState::new(options.include_ai);
    let mut runtime = WorkflowRuntime::new(ctx.client.clone(), state);
    runtime.dispatch(WorkflowEvent::SetJobDescription(read_value(options.job)?));

    match options.source {
        Source::File(path) => {
            let path = normalize_input_path(&path);
            let file = UploadFile::from_path(&path)
                .with_context(|| format!("load résumé {}", path.display()))?;
            runtime.dispatch(WorkflowEvent::SelectMode(InputMode::File));
            runtime.dispatch(WorkflowEvent::SelectFile(file));
        }
        Source::Text(text) => {
            runtime.dispatch(WorkflowEvent::SelectMode(InputMode::Text));
            runtime.dispatch(WorkflowEvent::SetCvText(read_value(&text)?));
        }
        Source::TextFile(path) => {
            runtime.dispatch(WorkflowEvent::SelectMode(InputMode::Text));
            runtime.dispatch(WorkflowEvent::SetCvText(read_text_file(&path)?));
        }
    }

    runtime.submit_analysis().map_err(|f| failure_error(&f))?;

    // Pasted text can be rewritten right away; a file needs the text the
    // server extracts during analysis.
    let rewrite_now = options.rewrite && runtime.state.mode == InputMode::Text;
    if rewrite_now {
        runtime.submit_rewrite().map_err(|f| failure_error(&f))?;
    }
    runtime.settle().await;

    // A refused rewrite is recorded on its slot and reported after the analysis.
    if options.rewrite
        && !rewrite_now
        && runtime.state.analysis.failure().is_none()
        && runtime.submit_rewrite().is_ok()
    {
        runtime.settle().await;
    }

    finish(&runtime)
}

pub async fn rewrite(
    ctx: &Context,
    job: &str,
    cv_text: Option<String>,
    cv_file: Option<PathBuf>,
) -> Result<()> {
    ctx.require_session()?;

    let cv_text = match (cv_text, cv_file) {
        (Some(text), _) => read_value(&text)?,
        (None, Some(path)) => read_text_file(&path)?,
        (None, None) => anyhow::bail!("Provide --cv-text or --cv-file"),
    };

    let mut runtime = WorkflowRuntime::new(ctx.client.clone(), WorkflowState::default());
    runtime.dispatch(WorkflowEvent::SetJobDescription(read_value(job)?));
    runtime.dispatch(WorkflowEvent::SetCvText(cv_text));
    runtime.submit_rewrite().map_err(|f| failure_error(&f))?;
    runtime.settle().await;

    finish(&runtime)
}

/// Prints whatever succeeded, then reports the first failure.
fn finish(runtime: &WorkflowRuntime) -> Result<()> {
    let state = &runtime.state;
    if let Some(result) = state.analysis.latest() {
        print!("{}", report::render_analysis(result));
    }
    if let Some(result) = state.rewrite.latest() {
        print!("{}", report::render_rewrite(result));
    }

    if runtime.session_expired() {
        anyhow::bail!("Your session has expired. Run `cvopt login` to sign in again.");
    }
    match state.analysis.failure().or(state.rewrite.failure()) {
        Some(failure) => Err(failure_error(failure)),
        None => Ok(()),
    }
}
