//! ordersdesk - command-line client for the order-tracking admin API.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::{Context, OrderFields};
use desk_api::{AccountStatus, AdminSearchParams, OrderSearchParams, OrderStatus, RecordId};
use desk_config_and_utils::{init_logging, Config, Paths};
use std::path::PathBuf;
use tracing::debug;

/// ordersdesk - manage orders and administrator accounts.
#[derive(Parser)]
#[command(name = "ordersdesk")]
#[command(about = "Command-line client for the order-tracking admin API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error). Defaults to the
    /// configured level.
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with username and password
    Login {
        /// Username (prompted for when omitted)
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Logout and clear the stored credential
    Logout,

    /// Check authentication status
    Status,

    /// Look up orders by license plate (no login required)
    Lookup {
        /// License plate
        plate: String,
    },

    /// Manage orders
    Orders {
        #[command(subcommand)]
        command: OrderCommands,
    },

    /// Manage administrator accounts
    Admins {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Manage uploaded images
    Upload {
        #[command(subcommand)]
        command: UploadCommands,
    },
}

#[derive(Subcommand)]
enum OrderCommands {
    /// List orders
    List {
        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: u32,
        /// Orders per page
        #[arg(short, long, default_value = "10")]
        size: u32,
        /// Keyword filter
        #[arg(short, long)]
        keyword: Option<String>,
    },
    /// Search orders
    Search {
        #[arg(short, long, default_value = "1")]
        page: u32,
        #[arg(short, long, default_value = "10")]
        size: u32,
        #[arg(short, long)]
        keyword: Option<String>,
        /// Order number
        #[arg(long)]
        order_no: Option<String>,
        /// Customer name
        #[arg(long)]
        customer: Option<String>,
        /// License plate
        #[arg(long)]
        plate: Option<String>,
        /// Order status (pending, completed, cancelled)
        #[arg(long)]
        status: Option<OrderStatus>,
        /// Created on or after (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Created on or before (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
    /// Show order details
    Show {
        /// Order ID
        id: String,
    },
    /// Create an order
    Create {
        #[command(flatten)]
        fields: OrderFields,
    },
    /// Update an order
    Update {
        /// Order ID
        id: String,
        #[command(flatten)]
        fields: OrderFields,
    },
    /// Delete one or more orders
    Delete {
        /// Order IDs
        #[arg(required = true)]
        ids: Vec<RecordId>,
    },
    /// Change an order's status
    Status {
        /// Order ID
        id: String,
        /// New status (pending, completed, cancelled)
        status: OrderStatus,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// List administrators
    List {
        #[arg(short, long, default_value = "1")]
        page: u32,
        #[arg(short, long, default_value = "10")]
        size: u32,
        /// Username filter
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Create an administrator (password is prompted for)
    Create {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        nickname: String,
        #[arg(long)]
        avatar: Option<String>,
        /// Account status (enabled, disabled)
        #[arg(long, default_value = "enabled")]
        status: AccountStatus,
    },
    /// Update an administrator
    Update {
        /// Administrator ID
        id: String,
        #[arg(short, long)]
        nickname: String,
        #[arg(long)]
        avatar: Option<String>,
        #[arg(long)]
        status: Option<AccountStatus>,
        /// Prompt for a new password
        #[arg(long)]
        password: bool,
    },
    /// Delete an administrator
    Delete {
        /// Administrator ID
        id: String,
    },
    /// Enable or disable an administrator
    Status {
        /// Administrator ID
        id: String,
        /// enabled or disabled
        status: AccountStatus,
    },
}

#[derive(Subcommand)]
enum UploadCommands {
    /// Upload an image (jpg, png, gif, webp; at most 2 MiB)
    Image {
        /// Path to the image file
        path: PathBuf,
    },
    /// Delete an uploaded image
    Delete {
        /// Image ID
        id: i64,
    },
}

async fn run(command: Commands, ctx: &Context) -> anyhow::Result<()> {
    match command {
        Commands::Login { username } => commands::login(ctx, username.as_deref()).await,
        Commands::Logout => commands::logout(ctx).await,
        Commands::Status => commands::status(ctx).await,
        Commands::Lookup { plate } => commands::lookup(ctx, &plate).await,
        Commands::Orders { command } => match command {
            OrderCommands::List {
                page,
                size,
                keyword,
            } => commands::orders_list(ctx, page, size, keyword.as_deref()).await,
            OrderCommands::Search {
                page,
                size,
                keyword,
                order_no,
                customer,
                plate,
                status,
                from,
                to,
            } => {
                let params = OrderSearchParams {
                    current_page: page,
                    page_size: size,
                    keyword,
                    order_no,
                    customer_name: customer,
                    license_plate: plate,
                    order_status: status,
                    start_date: from,
                    end_date: to,
                };
                commands::orders_search(ctx, params).await
            }
            OrderCommands::Show { id } => commands::orders_show(ctx, &id).await,
            OrderCommands::Create { fields } => commands::orders_create(ctx, fields).await,
            OrderCommands::Update { id, fields } => {
                commands::orders_update(ctx, &id, fields).await
            }
            OrderCommands::Delete { ids } => commands::orders_delete(ctx, &ids).await,
            OrderCommands::Status { id, status } => {
                commands::orders_status(ctx, &id, status).await
            }
        },
        Commands::Admins { command } => match command {
            AdminCommands::List {
                page,
                size,
                username,
            } => {
                let params = AdminSearchParams {
                    current: page,
                    size,
                    username,
                };
                commands::admins_list(ctx, params).await
            }
            AdminCommands::Create {
                username,
                nickname,
                avatar,
                status,
            } => commands::admins_create(ctx, &username, &nickname, avatar, status).await,
            AdminCommands::Update {
                id,
                nickname,
                avatar,
                status,
                password,
            } => commands::admins_update(ctx, &id, &nickname, avatar, status, password).await,
            AdminCommands::Delete { id } => commands::admins_delete(ctx, &id).await,
            AdminCommands::Status { id, status } => {
                commands::admins_status(ctx, &id, status).await
            }
        },
        Commands::Upload { command } => match command {
            UploadCommands::Image { path } => commands::upload_image(ctx, &path).await,
            UploadCommands::Delete { id } => commands::upload_delete(ctx, id).await,
        },
    }
}

fn load_context(format: output::OutputFormat) -> anyhow::Result<Context> {
    let paths = Paths::new()?;
    let config = Config::load(&paths)?;
    Ok(Context {
        paths,
        config,
        format,
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let ctx = match load_context(cli.format) {
        Ok(ctx) => ctx,
        Err(e) => {
            output::print_error(&e.to_string(), &cli.format);
            std::process::exit(1);
        }
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| ctx.config.log_level.clone());
    init_logging("cli", &level, false);
    debug!(api_base_url = %ctx.config.api_base_url, "Configuration loaded");

    if let Err(e) = run(cli.command, &ctx).await {
        output::print_error(&e.to_string(), &ctx.format);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_order_status_names() {
        let cli = Cli::try_parse_from(["ordersdesk", "orders", "status", "42", "completed"]).unwrap();
        match cli.command {
            Commands::Orders {
                command: OrderCommands::Status { id, status },
            } => {
                assert_eq!(id, "42");
                assert_eq!(status, OrderStatus::Completed);
            }
            _ => panic!("expected orders status"),
        }
    }

    #[test]
    fn rejects_unknown_order_status() {
        assert!(Cli::try_parse_from(["ordersdesk", "orders", "status", "42", "lost"]).is_err());
    }

    #[test]
    fn global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["ordersdesk", "lookup", "ABC123", "--format", "json"]).unwrap();
        assert_eq!(cli.format, output::OutputFormat::Json);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn delete_requires_an_id() {
        assert!(Cli::try_parse_from(["ordersdesk", "orders", "delete"]).is_err());
        let cli = Cli::try_parse_from(["ordersdesk", "orders", "delete", "1", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Orders {
                command: OrderCommands::Delete { ref ids }
            } if ids.len() == 2
        ));
    }

    #[test]
    fn admin_status_parses_account_status() {
        let cli = Cli::try_parse_from(["ordersdesk", "admins", "status", "3", "disabled"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Admins {
                command: AdminCommands::Status {
                    status: AccountStatus::Disabled,
                    ..
                }
            }
        ));
    }
}
