use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use jobcache_core::models::{Registration, User};
use jobcache_core::{CredentialStore, Session, SessionData};
use tracing::{info, warn};

use super::{parse_json_arg, unless_queued, ProfileCommand};
use crate::context::AppContext;
use crate::output::{field, print_json};

fn prompt(label: &str) -> Result<String> {
    eprint!("{}: ", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("{} is required", label);
    }
    Ok(value)
}

fn prompt_password() -> Result<String> {
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

/// Save the new session and remember the email for next time.
fn start_session(ctx: &AppContext, data: SessionData, email: &str) -> Result<User> {
    let user = data.user.clone();
    let mut session = Session::new(ctx.cache_dir.clone());
    session.update(data);
    session.save()?;

    let mut config = ctx.config.clone();
    config.last_email = Some(email.to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to remember email");
    }
    Ok(user)
}

pub async fn login(ctx: &AppContext, email: Option<String>, remember: bool) -> Result<()> {
    let email = match email.or_else(|| ctx.config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email")?,
    };

    let stored = if remember && CredentialStore::has_credentials(&email) {
        info!(email = %email, "Using password from keychain");
        CredentialStore::get_password(&email).ok()
    } else {
        None
    };
    let password = match stored {
        Some(password) => password,
        None => prompt_password()?,
    };

    // Log in without the old session's cookies
    let api = ctx.api_for(&Session::new(ctx.cache_dir.clone()))?;
    let data = api.login(&email, &password).await?;

    if remember {
        if let Err(e) = CredentialStore::store(&email, &password) {
            warn!(error = %e, "Failed to store password in keychain");
        }
    }

    let user = start_session(ctx, data, &email)?;
    println!("Logged in as {} ({})", user.full_name(), user.initials());
    Ok(())
}

pub async fn register(
    ctx: &AppContext,
    first_name: String,
    last_name: String,
    email: String,
) -> Result<()> {
    let password = prompt_password()?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }

    let registration = Registration {
        first_name,
        last_name,
        email: email.clone(),
        password,
    };
    let api = ctx.api_for(&Session::new(ctx.cache_dir.clone()))?;
    let data = api.register(&registration).await?;

    let user = start_session(ctx, data, &email)?;
    println!("Account created. Logged in as {}", user.full_name());
    Ok(())
}

/// The session is dropped locally even if the server call fails.
pub async fn logout(ctx: &AppContext) -> Result<()> {
    let mut session = ctx.session()?;
    if session.is_valid() {
        if let Err(e) = ctx.api_for(&session)?.logout().await {
            warn!(error = %e, "Server logout failed, clearing local session anyway");
        }
    }
    session.clear()?;
    println!("Logged out");
    Ok(())
}

pub async fn me(ctx: &AppContext) -> Result<()> {
    let user = ctx.api()?.current_user().await?;
    if ctx.json {
        return print_json(&user);
    }
    field("Name", Some(user.full_name().as_str()));
    field("Email", user.email.as_deref());
    field("Initials", Some(user.initials().as_str()));
    field("Plan", user.subscription.as_deref());
    Ok(())
}

pub async fn profile(ctx: &AppContext, action: ProfileCommand) -> Result<()> {
    let api = ctx.api()?;
    match action {
        ProfileCommand::Show => print_json(&api.profile().await?),
        ProfileCommand::Update { data } => {
            let data = parse_json_arg("profile data", &data)?;
            if !data.is_object() {
                anyhow::bail!("Profile data must be a JSON object");
            }
            if let Some(updated) = unless_queued(api.update_profile(&data).await)? {
                if ctx.json {
                    print_json(&updated)?;
                } else {
                    println!("Profile updated");
                }
            }
            Ok(())
        }
    }
}
