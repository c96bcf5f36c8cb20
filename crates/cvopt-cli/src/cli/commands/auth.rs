//! Account commands: sign in/out, registration, password reset, status.

use anyhow::{Result, anyhow};
use cvopt_core::auth::{
    self, FlowOutcome, ForgotPasswordFlow, LoginFlow, LoginForm, RegisterFlow, RegisterForm,
    ResetPasswordFlow,
};
use cvopt_core::client::FailureKind;
use cvopt_core::gate::Route;
use cvopt_core::report;

use super::{Context, failure_error, password_or_stdin};

fn announce(outcome: &FlowOutcome) {
    println!("{}", outcome.notice());
    if let Some(Route::Login) = outcome.destination() {
        println!("Next: cvopt login --email <EMAIL>");
    }
}

pub async fn login(ctx: &Context, email: &str, password: Option<String>) -> Result<()> {
    let form = LoginForm {
        email: email.to_string(),
        password: password_or_stdin(password, "Password")?,
    };
    let outcome = LoginFlow::default()
        .submit(&ctx.client, &form)
        .await
        .map_err(|f| failure_error(&f))?;
    announce(&outcome);
    Ok(())
}

pub async fn register(
    ctx: &Context,
    email: &str,
    password: Option<String>,
    confirm: Option<String>,
) -> Result<()> {
    let password = password_or_stdin(password, "Password")?;
    let form = RegisterForm {
        email: email.to_string(),
        confirm: confirm.unwrap_or_else(|| password.clone()),
        password,
    };
    let outcome = RegisterFlow::default()
        .submit(&ctx.client, &form)
        .await
        .map_err(|f| failure_error(&f))?;
    announce(&outcome);
    Ok(())
}

pub async fn forgot_password(ctx: &Context, email: &str) -> Result<()> {
    let outcome = ForgotPasswordFlow::default()
        .submit(&ctx.client, email)
        .await
        .map_err(|f| failure_error(&f))?;
    announce(&outcome);
    Ok(())
}

pub async fn reset_password(
    ctx: &Context,
    link: Option<String>,
    token: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let route = match (link, token) {
        (Some(link), _) => Route::parse(&link),
        (None, token) => Route::ResetPassword { token },
    };
    let mut flow = ResetPasswordFlow::from_route(&route);
    let password = password_or_stdin(password, "New password")?;
    let outcome = flow
        .submit(&ctx.client, &password)
        .await
        .map_err(|f| failure_error(&f))?;
    announce(&outcome);
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    if auth::logout(&ctx.tokens)? {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
    Ok(())
}

pub async fn status(ctx: &Context) -> Result<()> {
    let Some(credential) = ctx.tokens.get() else {
        println!("Not signed in.");
        return Ok(());
    };

    match ctx.client.current_user().await {
        Ok(account) => {
            print!("{}", report::render_account(&account));
            println!("Token: {}", credential.masked());
            Ok(())
        }
        Err(failure) if failure.kind == FailureKind::Unauthenticated => Err(anyhow!(
            "Your session has expired. Run `cvopt login` to sign in again."
        )),
        Err(failure) => Err(failure_error(&failure)),
    }
}
