use super::events::{AnalysisRequest, WorkflowEffect};
use super::task::{TaskId, TaskSeq, TaskState};
use crate::client::{AnalysisResult, ApiResult, Failure, RewriteResult, UploadFile};

/// Where the CV comes from for an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    File,
    Text,
}

/// What a view should show for one operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestOutcome<'a, T> {
    Idle,
    Pending,
    Success(&'a T),
    Failure(&'a Failure),
}

/// One request slot (analysis or rewrite).
///
/// The last successful result survives later failures and new submissions,
/// so a view can keep showing it while a fresh request runs or after one fails.
#[derive(Debug, Clone)]
pub struct Operation<T> {
    task: TaskState,
    last: Option<T>,
    failure: Option<Failure>,
}

impl<T> Default for Operation<T> {
    fn default() -> Self {
        Self {
            task: TaskState::default(),
            last: None,
            failure: None,
        }
    }
}

impl<T> Operation<T> {
    pub fn outcome(&self) -> RequestOutcome<'_, T> {
        if self.task.is_running() {
            return RequestOutcome::Pending;
        }
        match (&self.failure, &self.last) {
            (Some(failure), _) => RequestOutcome::Failure(failure),
            (None, Some(last)) => RequestOutcome::Success(last),
            (None, None) => RequestOutcome::Idle,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.task.is_running()
    }

    pub fn active_task(&self) -> Option<TaskId> {
        self.task.active
    }

    /// Most recent successful result, even if a later attempt failed.
    pub fn latest(&self) -> Option<&T> {
        self.last.as_ref()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    fn begin(&mut self, id: TaskId) {
        self.task.start(id);
        self.failure = None;
    }

    fn reject(&mut self, failure: Failure) {
        self.failure = Some(failure);
    }

    /// Applies a completion if `id` is still the active task.
    ///
    /// Returns false (and changes nothing) for a superseded or cancelled task.
    pub(super) fn resolve(&mut self, id: TaskId, result: ApiResult<T>) -> bool {
        if !self.task.finish_if_active(id) {
            return false;
        }
        match result {
            Ok(value) => {
                self.last = Some(value);
                self.failure = None;
            }
            Err(failure) => self.failure = Some(failure),
        }
        true
    }

    /// Abandons the in-flight request; its completion will be ignored.
    pub(super) fn cancel(&mut self) -> Option<TaskId> {
        let active = self.task.active;
        self.task.clear();
        active
    }
}

/// Everything the dashboard holds.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub mode: InputMode,
    pub job_description: String,
    pub file: Option<UploadFile>,
    pub cv_text: String,
    pub include_ai: bool,
    pub analysis: Operation<AnalysisResult>,
    pub rewrite: Operation<RewriteResult>,
    /// Text last copied into `cv_text` from an analysis response.
    seeded_cv_text: Option<String>,
    seq: TaskSeq,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl WorkflowState {
    pub fn new(include_ai: bool) -> Self {
        Self {
            mode: InputMode::default(),
            job_description: String::new(),
            file: None,
            cv_text: String::new(),
            include_ai,
            analysis: Operation::default(),
            rewrite: Operation::default(),
            seeded_cv_text: None,
            seq: TaskSeq::default(),
        }
    }

    /// Text the user typed; never overwritten by later analyses.
    pub(super) fn set_cv_text(&mut self, text: String) {
        self.cv_text = text;
        self.seeded_cv_text = None;
    }

    /// Fills the rewrite input with text the server extracted, unless the
    /// field holds text the user typed.
    pub(super) fn seed_cv_text(&mut self, text: String) {
        let user_typed = !self.cv_text.trim().is_empty()
            && self.seeded_cv_text.as_deref() != Some(self.cv_text.as_str());
        if user_typed {
            return;
        }
        self.cv_text.clone_from(&text);
        self.seeded_cv_text = Some(text);
    }

    /// Validates the inputs and starts an analysis.
    ///
    /// A failed check is recorded on the analysis slot, except the
    /// already-running refusal, which leaves the running request untouched.
    ///
    /// # Errors
    /// `Validation` when inputs are missing or an analysis is already running.
    pub fn submit_analysis(&mut self) -> Result<WorkflowEffect, Failure> {
        if self.analysis.is_pending() {
            return Err(Failure::validation("An analysis is already running"));
        }

        let request = match self.analysis_request() {
            Ok(request) => request,
            Err(failure) => {
                self.analysis.reject(failure.clone());
                return Err(failure);
            }
        };

        let task = self.seq.next_id();
        self.analysis.begin(task);
        tracing::debug!(?task, mode = ?self.mode, "analysis submitted");
        Ok(WorkflowEffect::Analyze { task, request })
    }

    fn analysis_request(&self) -> Result<AnalysisRequest, Failure> {
        let job_description = self.job_description.trim();
        if job_description.is_empty() {
            return Err(Failure::validation("Paste a job description first"));
        }
        let job_description = job_description.to_string();
        let include_ai = self.include_ai;

        match self.mode {
            InputMode::File => {
                let file = self
                    .file
                    .clone()
                    .ok_or_else(|| Failure::validation("Choose a file first"))?;
                Ok(AnalysisRequest::File {
                    file,
                    job_description,
                    include_ai,
                })
            }
            InputMode::Text => {
                let cv_text = self.cv_text.trim();
                if cv_text.is_empty() {
                    return Err(Failure::validation("Paste your CV text first"));
                }
                Ok(AnalysisRequest::Text {
                    cv_text: cv_text.to_string(),
                    job_description,
                    include_ai,
                })
            }
        }
    }

    /// Validates the inputs and starts a rewrite.
    ///
    /// # Errors
    /// `Validation` when inputs are missing or a rewrite is already running.
    pub fn submit_rewrite(&mut self) -> Result<WorkflowEffect, Failure> {
        if self.rewrite.is_pending() {
            return Err(Failure::validation("A rewrite is already running"));
        }

        let job_description = self.job_description.trim().to_string();
        let cv_text = self.cv_text.trim().to_string();
        let check = if job_description.is_empty() {
            Err(Failure::validation("Paste a job description first"))
        } else if cv_text.is_empty() {
            Err(Failure::validation(
                "Add your CV text before requesting a rewrite",
            ))
        } else {
            Ok(())
        };
        if let Err(failure) = check {
            self.rewrite.reject(failure.clone());
            return Err(failure);
        }

        let task = self.seq.next_id();
        self.rewrite.begin(task);
        tracing::debug!(?task, "rewrite submitted");
        Ok(WorkflowEffect::Rewrite {
            task,
            cv_text,
            job_description,
        })
    }
}
