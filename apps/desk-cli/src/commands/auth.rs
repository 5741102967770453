//! Authentication commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use desk_session::SessionView;
use std::io::{self, Write};

/// Login with username and password.
pub async fn login(ctx: &Context, username: Option<&str>) -> Result<()> {
    let desk = ctx.connect().await?;

    if desk.session.session().view() == SessionView::Dashboard {
        let who = desk
            .session
            .identity()
            .map(|identity| identity.display_name().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        output::print_success(&format!("Already logged in as {}", who), &ctx.format);
        return Ok(());
    }

    let username = match username {
        Some(name) => name.trim().to_string(),
        None => {
            print!("Username: ");
            io::stdout().flush()?;
            let mut name = String::new();
            io::stdin().read_line(&mut name)?;
            name.trim().to_string()
        }
    };

    if username.is_empty() {
        output::print_error("Username is required", &ctx.format);
        return Ok(());
    }

    // Prompt for password (hidden)
    let password = rpassword::prompt_password("Password: ")?;

    if password.is_empty() {
        output::print_error("Password is required", &ctx.format);
        return Ok(());
    }

    if ctx.format == OutputFormat::Text {
        println!("Logging in...");
    }

    match desk.session.login(&username, &password).await {
        Ok(_) => match desk.session.identity() {
            Some(identity) => output::print_success(
                &format!("Logged in as {}", identity.display_name()),
                &ctx.format,
            ),
            None => output::print_success("Logged in successfully", &ctx.format),
        },
        Err(e) => {
            output::print_error(&format!("Login failed: {}", e.user_message()), &ctx.format);
        }
    }

    Ok(())
}

/// Logout and clear the stored credential.
pub async fn logout(ctx: &Context) -> Result<()> {
    let desk = ctx.connect().await?;

    match desk.session.logout().await {
        Ok(_) => output::print_success("Logged out successfully", &ctx.format),
        Err(e) => output::print_error(&e.user_message(), &ctx.format),
    }

    Ok(())
}

/// Check authentication status.
pub async fn status(ctx: &Context) -> Result<()> {
    let desk = ctx.connect().await?;
    let session = desk.session.session();
    let logged_in = session.view() == SessionView::Dashboard;

    match ctx.format {
        OutputFormat::Text => {
            println!("Server:   {}", desk.client.pipeline().base_url());
            println!("State:    {}", session.state);
            if logged_in {
                match &session.identity {
                    Some(identity) => {
                        println!("Auth:     logged in");
                        println!("User:     {}", identity.username);
                        println!("Nickname: {}", output::or_dash(Some(identity.nickname.as_str())));
                        println!("Account:  {}", identity.status);
                    }
                    None => println!("Auth:     logged in (identity not yet available)"),
                }
            } else {
                println!("Auth:     not logged in");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "server": desk.client.pipeline().base_url(),
                "state": session.state,
                "logged_in": logged_in,
                "identity": session.identity,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}
