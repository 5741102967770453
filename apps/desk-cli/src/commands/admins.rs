//! Administrator account commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use desk_api::{AccountStatus, AdminDraft, AdminSearchParams, AdminUpdate, AdminUser};

fn print_admin(admin: &AdminUser, format: &OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("Administrator");
            output::print_divider();
            output::print_row("ID", &admin.id);
            output::print_row("Username", &admin.username);
            output::print_row("Nickname", output::or_dash(Some(admin.nickname.as_str())));
            output::print_row("Avatar", output::or_dash(admin.avatar.as_deref()));
            output::print_row("Status", &admin.status.to_string());
            output::print_row("Created", output::or_dash(Some(admin.create_time.as_str())));
        }
        OutputFormat::Json => output::print_json(admin),
    }
}

/// List administrator accounts.
pub async fn admins_list(ctx: &Context, params: AdminSearchParams) -> Result<()> {
    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    let page = match desk.client.admins.list(&params).await {
        Ok(page) => page,
        Err(e) => {
            ctx.report(&e);
            return Ok(());
        }
    };

    match ctx.format {
        OutputFormat::Text => {
            if page.records.is_empty() {
                println!("No administrators found");
            } else {
                println!(
                    "{:<8} {:<20} {:<20} {:<10} {}",
                    "ID", "Username", "Nickname", "Status", "Created"
                );
                println!("{}", "-".repeat(80));
                for admin in &page.records {
                    println!(
                        "{:<8} {:<20} {:<20} {:<10} {}",
                        admin.id,
                        admin.username,
                        output::or_dash(Some(admin.nickname.as_str())),
                        admin.status.to_string(),
                        output::or_dash(Some(admin.create_time.as_str()))
                    );
                }
            }
            println!(
                "\nPage {} of {} ({} administrators)",
                page.current.max(1),
                page.total_pages(u64::from(params.size)),
                page.total
            );
        }
        OutputFormat::Json => output::print_json(&page),
    }

    Ok(())
}

/// Create an administrator. The password is prompted for.
pub async fn admins_create(
    ctx: &Context,
    username: &str,
    nickname: &str,
    avatar: Option<String>,
    status: AccountStatus,
) -> Result<()> {
    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    let password = rpassword::prompt_password("Password for new administrator: ")?;
    let draft = AdminDraft {
        username: username.to_string(),
        password,
        nickname: nickname.to_string(),
        avatar,
        status,
    };

    match desk.client.admins.create(&draft).await {
        Ok(Some(admin)) => print_admin(&admin, &ctx.format),
        Ok(None) => output::print_success(
            &format!("Administrator {} created", username),
            &ctx.format,
        ),
        Err(e) => ctx.report(&e),
    }

    Ok(())
}

/// Update an administrator. With `change_password` the new password is
/// prompted for; otherwise the current one is kept.
pub async fn admins_update(
    ctx: &Context,
    id: &str,
    nickname: &str,
    avatar: Option<String>,
    status: Option<AccountStatus>,
    change_password: bool,
) -> Result<()> {
    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    let password = if change_password {
        Some(rpassword::prompt_password("New password: ")?)
    } else {
        None
    };
    let update = AdminUpdate {
        nickname: nickname.to_string(),
        password,
        avatar,
        status,
    };

    match desk.client.admins.update(id, &update).await {
        Ok(Some(admin)) => print_admin(&admin, &ctx.format),
        Ok(None) => output::print_success(&format!("Administrator {} updated", id), &ctx.format),
        Err(e) => ctx.report(&e),
    }

    Ok(())
}

/// Delete an administrator.
pub async fn admins_delete(ctx: &Context, id: &str) -> Result<()> {
    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    match desk.client.admins.delete(id).await {
        Ok(()) => output::print_success(&format!("Administrator {} deleted", id), &ctx.format),
        Err(e) => ctx.report(&e),
    }

    Ok(())
}

/// Enable or disable an administrator account.
pub async fn admins_status(ctx: &Context, id: &str, status: AccountStatus) -> Result<()> {
    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    match desk.client.admins.update_status(id, status).await {
        Ok(()) => output::print_success(
            &format!("Administrator {} {}", id, status),
            &ctx.format,
        ),
        Err(e) => ctx.report(&e),
    }

    Ok(())
}
