use super::{FlowOutcome, FlowState, store_credential};
use crate::client::{ApiClient, ApiResult, Failure};
use crate::gate::Route;

/// Shortest password accepted at registration or reset.
pub const MIN_PASSWORD_LEN: usize = 6;

fn require(value: &str, message: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        Err(Failure::validation(message))
    } else {
        Ok(())
    }
}

fn check_password_length(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Failure::validation(format!(
            "Please use at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Email + password sign-in. Success stores the credential and heads to the dashboard.
#[derive(Debug, Default)]
pub struct LoginFlow {
    pub state: FlowState,
}

impl LoginFlow {
    /// # Errors
    /// `Validation` for missing fields, otherwise whatever the server returned.
    pub async fn submit(&mut self, client: &ApiClient, form: &LoginForm) -> ApiResult<FlowOutcome> {
        let validation = require(&form.email, "Email is required")
            .and_then(|()| require(&form.password, "Password is required"));
        self.state.run(validation, Self::call(client, form)).await
    }

    async fn call(client: &ApiClient, form: &LoginForm) -> ApiResult<FlowOutcome> {
        let credential = client.login(form.email.trim(), &form.password).await?;
        store_credential(client.tokens(), credential);
        Ok(FlowOutcome::Navigate {
            to: Route::Dashboard,
            notice: "Signed in! Redirecting…".to_string(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm: String,
}

/// Account creation. Signs in directly when the server hands back a token.
#[derive(Debug, Default)]
pub struct RegisterFlow {
    pub state: FlowState,
}

impl RegisterFlow {
    fn validate(form: &RegisterForm) -> ApiResult<()> {
        require(&form.email, "Email is required")?;
        if form.password != form.confirm {
            return Err(Failure::validation("Passwords do not match"));
        }
        check_password_length(&form.password)
    }

    /// # Errors
    /// `Validation` for local checks, otherwise whatever the server returned.
    pub async fn submit(
        &mut self,
        client: &ApiClient,
        form: &RegisterForm,
    ) -> ApiResult<FlowOutcome> {
        self.state
            .run(Self::validate(form), Self::call(client, form))
            .await
    }

    async fn call(client: &ApiClient, form: &RegisterForm) -> ApiResult<FlowOutcome> {
        match client.register(form.email.trim(), &form.password).await? {
            Some(credential) => {
                store_credential(client.tokens(), credential);
                Ok(FlowOutcome::Navigate {
                    to: Route::Dashboard,
                    notice: "Account created! Redirecting…".to_string(),
                })
            }
            None => Ok(FlowOutcome::Navigate {
                to: Route::Login,
                notice: "Account created! Please sign in.".to_string(),
            }),
        }
    }
}

/// Requests a reset link by email.
#[derive(Debug, Default)]
pub struct ForgotPasswordFlow {
    pub state: FlowState,
}

impl ForgotPasswordFlow {
    /// # Errors
    /// `Validation` for a blank email, otherwise whatever the server returned.
    pub async fn submit(&mut self, client: &ApiClient, email: &str) -> ApiResult<FlowOutcome> {
        self.state
            .run(require(email, "Email is required"), Self::call(client, email))
            .await
    }

    async fn call(client: &ApiClient, email: &str) -> ApiResult<FlowOutcome> {
        client.request_password_reset(email.trim()).await?;
        Ok(FlowOutcome::Stay {
            notice: "If an account exists, we sent a reset link. Check your email.".to_string(),
        })
    }
}

/// Sets a new password. The reset token comes from the navigation context
/// (the link in the email), never from the token store.
#[derive(Debug, Default)]
pub struct ResetPasswordFlow {
    pub state: FlowState,
    token: Option<String>,
}

impl ResetPasswordFlow {
    pub fn from_route(route: &Route) -> Self {
        let token = match route {
            Route::ResetPassword { token } => token.clone(),
            _ => None,
        };
        Self {
            state: FlowState::default(),
            token,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// # Errors
    /// `Validation` when the link carried no token or the password is too
    /// short, otherwise whatever the server returned.
    pub async fn submit(
        &mut self,
        client: &ApiClient,
        new_password: &str,
    ) -> ApiResult<FlowOutcome> {
        let token = self.token.clone().unwrap_or_default();
        let validation = self
            .token
            .as_deref()
            .ok_or_else(|| Failure::validation("Reset link is missing its token"))
            .and_then(|_| check_password_length(new_password));

        self.state
            .run(validation, Self::call(client, &token, new_password))
            .await
    }

    async fn call(client: &ApiClient, token: &str, new_password: &str) -> ApiResult<FlowOutcome> {
        client.reset_password(token, new_password).await?;
        Ok(FlowOutcome::Navigate {
            to: Route::Login,
            notice: "Password updated! You can now sign in.".to_string(),
        })
    }
}
