//! Profile page: show the current user and update name, password or API key.

use bookshelf_client::models::{UpdateUserRequest, UserProfile};
use bookshelf_events::Toast;

use super::{describe, non_blank, Outcome, PageCtx, View};

const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

/// Input of the profile form. Blank fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub pw: Option<String>,
    pub pw_confirm: Option<String>,
    pub api_key: Option<String>,
}

impl ProfileUpdate {
    fn field(value: &Option<String>) -> Option<&str> {
        value.as_deref().and_then(non_blank)
    }
}

pub async fn load(ctx: &PageCtx) -> Outcome<UserProfile> {
    if !ctx.require_login() {
        return Outcome::navigate(View::Home);
    }

    match ctx.api.user_profile().await {
        Ok(profile) => Outcome::show(profile),
        Err(err) if err.is_unauthorized() => {
            ctx.toast(Toast::danger(SESSION_EXPIRED));
            Outcome::navigate(View::Login)
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load user info");
            ctx.toast(Toast::danger(describe(&err, "Could not load your profile.")));
            Outcome::navigate(View::Home)
        }
    }
}

pub async fn update(ctx: &PageCtx, form: &ProfileUpdate) -> View {
    if !ctx.require_login() {
        return View::Home;
    }

    let name = ProfileUpdate::field(&form.name);
    let pw = ProfileUpdate::field(&form.pw);
    let pw_confirm = ProfileUpdate::field(&form.pw_confirm);
    let api_key = ProfileUpdate::field(&form.api_key);

    if name.is_none() && pw.is_none() && pw_confirm.is_none() && api_key.is_none() {
        ctx.toast(Toast::warning("Enter something to change."));
        return View::Stay;
    }

    if (pw.is_some() || pw_confirm.is_some()) && pw != pw_confirm {
        ctx.toast(Toast::danger("Passwords do not match."));
        return View::Stay;
    }

    let request = UpdateUserRequest {
        name: name.map(str::to_string),
        pw: pw.map(str::to_string),
    };

    match ctx.api.update_user(&request, api_key).await {
        Ok(response) if response.is_success() => {
            ctx.toast(Toast::success("Your profile has been updated."));
            View::Profile
        }
        Ok(response) => {
            ctx.toast(Toast::danger(response.message_or("Profile update failed.")));
            View::Stay
        }
        Err(err) if err.is_unauthorized() => {
            ctx.toast(Toast::danger(SESSION_EXPIRED));
            View::Login
        }
        Err(err) => {
            tracing::warn!(error = %err, "profile update failed");
            ctx.toast(Toast::danger(describe(&err, "Profile update failed.")));
            View::Stay
        }
    }
}
