//! Typed calls, one per endpoint.

use serde_json::json;

use super::{
    Account, AnalysisResult, ApiClient, ApiRequest, ApiResult, Endpoint, Failure, MultipartField,
    RequestBody, RewriteResult, TokenResponse, UploadFile, UploadReceipt,
};
use crate::session::Credential;

impl ApiClient {
    /// Exchanges email + password for a bearer credential.
    ///
    /// The backend reads form fields, so the body is URL-encoded.
    ///
    /// # Errors
    /// `Rejected` for bad credentials or a response without a token.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Credential> {
        let request = ApiRequest::new(
            Endpoint::Login,
            RequestBody::Form(vec![
                ("email", email.to_string()),
                ("password", password.to_string()),
            ]),
        );
        let response: TokenResponse = self.send_json(&request).await?;
        response
            .into_token()
            .map(Credential::new)
            .ok_or_else(|| Failure::rejected("No access token received"))
    }

    /// Creates an account. Some deployments sign the user in immediately and
    /// return a token; others expect a separate login.
    ///
    /// # Errors
    /// `Rejected` when the server refuses the registration.
    pub async fn register(&self, email: &str, password: &str) -> ApiResult<Option<Credential>> {
        let request = ApiRequest::new(
            Endpoint::Register,
            RequestBody::Json(json!({ "email": email, "password": password })),
        );
        let value = self.send(&request).await?;
        // Registration may answer with a bare message; only a token matters here.
        let token = serde_json::from_value::<TokenResponse>(value)
            .ok()
            .and_then(TokenResponse::into_token);
        Ok(token.map(Credential::new))
    }

    /// Triggers an out-of-band reset link.
    ///
    /// # Errors
    /// Returns a [`Failure`] if the request is refused or fails.
    pub async fn request_password_reset(&self, email: &str) -> ApiResult<()> {
        let request = ApiRequest::new(
            Endpoint::RequestReset,
            RequestBody::Json(json!({ "email": email })),
        );
        self.send(&request).await.map(|_| ())
    }

    /// Sets a new password using the token from a reset link.
    ///
    /// # Errors
    /// `Rejected` for an invalid or expired reset token.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ApiResult<()> {
        let request = ApiRequest::new(
            Endpoint::ResetPassword,
            RequestBody::Json(json!({ "token": token, "new_password": new_password })),
        );
        self.send(&request).await.map(|_| ())
    }

    /// Loads the signed-in account. Read-only, so transient failures retry.
    ///
    /// # Errors
    /// `Unauthenticated` when the stored session is no longer valid.
    pub async fn current_user(&self) -> ApiResult<Account> {
        let request = ApiRequest::new(Endpoint::CurrentUser, RequestBody::Empty);
        let value = self.send(&request).await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// Scores an uploaded résumé file against a job description.
    ///
    /// # Errors
    /// Returns a [`Failure`] if the request fails.
    pub async fn analyze_file(
        &self,
        file: &UploadFile,
        job_description: &str,
        include_ai: bool,
    ) -> ApiResult<AnalysisResult> {
        let request = ApiRequest::new(
            Endpoint::AnalyzeFile,
            RequestBody::Multipart(vec![
                MultipartField::File {
                    name: "file",
                    file: file.clone(),
                },
                MultipartField::text("job_description", job_description),
            ]),
        )
        .with_query("include_ai", include_ai.to_string());
        self.send_json(&request).await
    }

    /// Scores pasted résumé text against a job description.
    ///
    /// # Errors
    /// Returns a [`Failure`] if the request fails.
    pub async fn analyze_text(
        &self,
        cv_text: &str,
        job_description: &str,
        include_ai: bool,
    ) -> ApiResult<AnalysisResult> {
        let request = ApiRequest::new(
            Endpoint::AnalyzeText,
            RequestBody::Multipart(vec![
                MultipartField::text("cv_text", cv_text),
                MultipartField::text("job_description", job_description),
            ]),
        )
        .with_query("include_ai", include_ai.to_string());
        self.send_json(&request).await
    }

    /// Rewrites CV text to align with a job description (paid plans only).
    ///
    /// # Errors
    /// `PaymentRequired` on free plans.
    pub async fn rewrite(&self, cv_text: &str, job_description: &str) -> ApiResult<RewriteResult> {
        let request = ApiRequest::new(
            Endpoint::Rewrite,
            RequestBody::Multipart(vec![
                MultipartField::text("cv_text", cv_text),
                MultipartField::text("job_description", job_description),
            ]),
        );
        self.send_json(&request).await
    }

    /// Uploads a résumé on its own and returns what the server extracted.
    ///
    /// # Errors
    /// Returns a [`Failure`] if the request fails.
    pub async fn upload_resume(&self, file: &UploadFile) -> ApiResult<UploadReceipt> {
        let request = ApiRequest::new(
            Endpoint::UploadResume,
            RequestBody::Multipart(vec![MultipartField::File {
                name: "file",
                file: file.clone(),
            }]),
        );
        self.send_json(&request).await
    }
}
