//! `/admin` endpoints.

use crate::error::ApiResult;
use crate::pipeline::{path_segment, RequestPipeline};
use crate::types::{AccountStatus, AdminDraft, AdminSearchParams, AdminUpdate, AdminUser, Page};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

#[derive(Serialize)]
struct StatusQuery {
    status: AccountStatus,
}

#[derive(Clone)]
pub struct AdminsApi {
    pipeline: RequestPipeline,
}

impl AdminsApi {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self { pipeline }
    }

    /// `GET /admin`.
    pub async fn list(&self, params: &AdminSearchParams) -> ApiResult<Page<AdminUser>> {
        self.pipeline.get_with_query("/admin", params).await?.into_data()
    }

    /// `POST /admin`.
    pub async fn create(&self, draft: &AdminDraft) -> ApiResult<Option<AdminUser>> {
        draft.validate()?;
        let created = self.pipeline.post("/admin", Some(draft)).await?.into_result()?;
        info!(username = %draft.username, "Administrator created");
        Ok(created)
    }

    /// `PUT /admin/{id}`.
    pub async fn update(&self, id: &str, update: &AdminUpdate) -> ApiResult<Option<AdminUser>> {
        update.validate()?;
        let updated = self
            .pipeline
            .put(&format!("/admin/{}", path_segment(id)), &update.normalized())
            .await?
            .into_result()?;
        info!(admin_id = %id, "Administrator updated");
        Ok(updated)
    }

    /// `DELETE /admin/{id}`.
    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.pipeline
            .delete::<Value>(&format!("/admin/{}", path_segment(id)))
            .await?
            .into_result()?;
        info!(admin_id = %id, "Administrator deleted");
        Ok(())
    }

    /// `PUT /admin/{id}/status?status=`.
    pub async fn update_status(&self, id: &str, status: AccountStatus) -> ApiResult<()> {
        self.pipeline
            .put_with_query::<Value, _>(
                &format!("/admin/{}/status", path_segment(id)),
                &StatusQuery { status },
            )
            .await?
            .into_result()?;
        info!(admin_id = %id, status = %status, "Administrator status updated");
        Ok(())
    }
}
