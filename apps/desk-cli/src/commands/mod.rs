//! CLI command implementations.

mod admins;
mod auth;
mod orders;
mod uploads;

pub use admins::{admins_create, admins_delete, admins_list, admins_status, admins_update};
pub use auth::{login, logout, status};
pub use orders::{
    lookup, orders_create, orders_delete, orders_list, orders_search, orders_show, orders_status,
    orders_update, OrderFields,
};
pub use uploads::{upload_delete, upload_image};

use crate::output::{self, OutputFormat};
use anyhow::Result;
use desk_api::{ApiClient, ApiError, PipelineConfig, RequestPipeline};
use desk_config_and_utils::{Config, Paths};
use desk_session::{SessionManager, SessionView};
use std::sync::Arc;
use tracing::debug;

/// Settings shared by every command.
pub struct Context {
    pub paths: Paths,
    pub config: Config,
    pub format: OutputFormat,
}

/// A bootstrapped session plus the resource clients over the same pipeline.
pub struct Desk {
    pub session: SessionManager,
    pub client: ApiClient,
}

impl Context {
    /// Build the pipeline and run session bootstrap.
    pub async fn connect(&self) -> Result<Desk> {
        let credentials = Arc::new(desk_storage::create_credential_store(&self.paths));
        let pipeline = RequestPipeline::new(PipelineConfig::from_config(&self.config)?, credentials)?;
        let session = SessionManager::new(pipeline.clone());

        let state = session.init().await?;
        debug!(state = %state, base_url = %pipeline.base_url(), "Session bootstrapped");

        Ok(Desk {
            session,
            client: ApiClient::new(pipeline),
        })
    }

    /// Connect and require a logged-in session. Prints "Not logged in" and
    /// returns `None` otherwise.
    pub async fn connect_logged_in(&self) -> Result<Option<Desk>> {
        let desk = self.connect().await?;
        if desk.session.session().view() == SessionView::Login {
            output::print_error("Not logged in", &self.format);
            return Ok(None);
        }
        Ok(Some(desk))
    }

    pub fn report(&self, error: &ApiError) {
        output::print_error(&error.user_message(), &self.format);
    }
}
