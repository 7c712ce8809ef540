//! Login, logout, signup and account removal.

use bookshelf_client::models::SignupRequest;
use bookshelf_events::Toast;

use super::{describe, non_blank, PageCtx, View, LOGIN_REQUIRED};

/// Input of the signup form.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub id: String,
    pub pw: String,
    pub pw_confirm: String,
    pub name: String,
    pub api_key: Option<String>,
}

pub async fn login(ctx: &PageCtx, id: &str, pw: &str) -> View {
    let (Some(id), Some(pw)) = (non_blank(id), non_blank(pw)) else {
        ctx.toast(Toast::danger("Enter both your ID and password."));
        return View::Stay;
    };

    let outcome = match ctx.api.login(id, pw).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(error = %err, "login request failed");
            ctx.toast(Toast::danger(describe(&err, "Login failed.")));
            return View::Stay;
        }
    };

    if !outcome.result.is_success() {
        let message = outcome
            .result
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| "Login failed.".to_string());
        ctx.toast(Toast::danger(message));
        return View::Stay;
    }

    match outcome.access_token {
        Some(token) => {
            if let Err(err) = ctx.session.set_token(&token) {
                tracing::error!(error = %err, "failed to persist session token");
                ctx.toast(Toast::danger("Could not save your session."));
                return View::Stay;
            }
        }
        None => tracing::warn!("login succeeded without an authorization header"),
    }

    tracing::info!(user = id, "logged in");
    ctx.stash(Toast::success("Logged in!"));
    View::Home
}

pub async fn logout(ctx: &PageCtx) -> View {
    if !ctx.session.is_authenticated() {
        ctx.toast(Toast::danger("You are already logged out."));
        return View::Home;
    }

    if let Err(err) = ctx.api.logout().await {
        tracing::warn!(error = %err, "logout request failed; clearing local session anyway");
    }

    ctx.forget_session();
    ctx.toast(Toast::success("Logged out!"));
    View::Home
}

pub async fn signup(ctx: &PageCtx, form: &SignupForm) -> View {
    let (Some(id), Some(pw), Some(name)) =
        (non_blank(&form.id), non_blank(&form.pw), non_blank(&form.name))
    else {
        ctx.toast(Toast::danger("ID, password and name are required."));
        return View::Stay;
    };

    if pw != form.pw_confirm {
        ctx.toast(Toast::danger("Passwords do not match."));
        return View::Stay;
    }

    let request = SignupRequest {
        id: id.to_string(),
        pw: pw.to_string(),
        name: name.to_string(),
    };
    let api_key = form.api_key.as_deref().and_then(non_blank);

    match ctx.api.signup(&request, api_key).await {
        Ok(response) if response.is_success() => {
            ctx.stash(Toast::success(response.message_or("Signed up! Please log in.")));
            View::Login
        }
        Ok(response) => {
            ctx.toast(Toast::danger(response.message_or("Signup failed.")));
            View::Stay
        }
        Err(err) => {
            tracing::warn!(error = %err, "signup request failed");
            ctx.toast(Toast::danger(describe(&err, "Signup failed.")));
            View::Stay
        }
    }
}

pub async fn unregister(ctx: &PageCtx, pw: &str) -> View {
    if !ctx.require_login() {
        return View::Home;
    }

    let Some(pw) = non_blank(pw) else {
        ctx.toast(Toast::danger("Enter your password."));
        return View::Stay;
    };

    if !ctx
        .confirm
        .confirm("Delete account", "Delete your account? This cannot be undone.")
    {
        return View::Stay;
    }

    match ctx.api.delete_account(pw).await {
        Ok(response) if response.is_success() => {
            ctx.forget_session();
            ctx.toast(Toast::success("Your account has been deleted."));
            View::Home
        }
        Ok(response) => {
            ctx.toast(Toast::danger(response.message_or("Account deletion failed.")));
            View::Stay
        }
        Err(err) if err.is_unauthorized() => {
            ctx.toast(Toast::danger(LOGIN_REQUIRED));
            View::Login
        }
        Err(err) => {
            tracing::warn!(error = %err, "account deletion failed");
            ctx.toast(Toast::danger(describe(&err, "Account deletion failed.")));
            View::Stay
        }
    }
}
