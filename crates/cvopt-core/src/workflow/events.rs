use super::state::InputMode;
use super::task::TaskId;
use crate::client::{AnalysisResult, ApiResult, RewriteResult, UploadFile};

/// Inputs for one analysis call.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisRequest {
    File {
        file: UploadFile,
        job_description: String,
        include_ai: bool,
    },
    Text {
        cv_text: String,
        job_description: String,
        include_ai: bool,
    },
}

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    SelectMode(InputMode),
    SetJobDescription(String),
    SetCvText(String),
    SelectFile(UploadFile),
    ClearFile,
    SetIncludeAi(bool),
    SubmitAnalysis,
    SubmitRewrite,
    /// Abandons the running analysis so a new one can be submitted.
    CancelAnalysis,
    CancelRewrite,
    AnalysisCompleted {
        task: TaskId,
        result: ApiResult<AnalysisResult>,
    },
    RewriteCompleted {
        task: TaskId,
        result: ApiResult<RewriteResult>,
    },
}

/// Side effects requested by the reducer and executed by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEffect {
    Analyze {
        task: TaskId,
        request: AnalysisRequest,
    },
    Rewrite {
        task: TaskId,
        cv_text: String,
        job_description: String,
    },
    /// The server rejected the session; the view should route to login.
    SessionExpired,
}
