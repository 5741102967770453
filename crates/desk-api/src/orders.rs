//! `/orders` endpoints.

use crate::error::{ApiError, ApiResult};
use crate::pipeline::{path_segment, RequestPipeline};
use crate::types::{Order, OrderDraft, OrderSearchParams, OrderStatus, Page, RecordId};
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Page size used by the public license-plate lookup.
pub const LOOKUP_PAGE_SIZE: u32 = 50;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery<'a> {
    current_page: u32,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    keyword: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    order_status: OrderStatus,
}

/// Outcome of a batch delete. Every id lands in exactly one list.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<RecordId>,
    pub failed: Vec<(RecordId, ApiError)>,
}

impl BatchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct OrdersApi {
    pipeline: RequestPipeline,
}

impl OrdersApi {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self { pipeline }
    }

    /// `GET /orders`.
    pub async fn list(
        &self,
        current_page: u32,
        page_size: u32,
        keyword: Option<&str>,
    ) -> ApiResult<Page<Order>> {
        let query = ListQuery {
            current_page,
            page_size,
            keyword: keyword.map(str::trim).filter(|k| !k.is_empty()),
        };
        self.pipeline
            .get_with_query("/orders", &query)
            .await?
            .into_data()
    }

    /// `GET /orders/search`.
    pub async fn search(&self, params: &OrderSearchParams) -> ApiResult<Page<Order>> {
        self.pipeline
            .get_with_query("/orders/search", params)
            .await?
            .into_data()
    }

    /// Public lookup of every order attached to a license plate.
    ///
    /// A blank plate yields no orders without contacting the server.
    pub async fn lookup_by_license_plate(&self, plate: &str) -> ApiResult<Vec<Order>> {
        let plate = plate.trim();
        if plate.is_empty() {
            return Ok(Vec::new());
        }

        let params = OrderSearchParams {
            current_page: 1,
            page_size: LOOKUP_PAGE_SIZE,
            license_plate: Some(plate.to_string()),
            ..Default::default()
        };
        let page = self.search(&params).await?;
        debug!(plate = %plate, found = page.records.len(), "License plate lookup");
        Ok(page.records)
    }

    /// `GET /orders/{id}`.
    pub async fn get(&self, id: &str) -> ApiResult<Order> {
        self.pipeline
            .get(&format!("/orders/{}", path_segment(id)))
            .await?
            .into_data()
    }

    /// `POST /orders`. Returns the stored order when the server echoes it.
    pub async fn create(&self, draft: &OrderDraft) -> ApiResult<Option<Order>> {
        draft.validate()?;
        let created = self.pipeline.post("/orders", Some(draft)).await?.into_result()?;
        info!(customer = %draft.customer_name, "Order created");
        Ok(created)
    }

    /// `PUT /orders/{id}`.
    pub async fn update(&self, id: &str, draft: &OrderDraft) -> ApiResult<Option<Order>> {
        draft.validate()?;
        let updated = self
            .pipeline
            .put(&format!("/orders/{}", path_segment(id)), draft)
            .await?
            .into_result()?;
        info!(order_id = %id, "Order updated");
        Ok(updated)
    }

    /// `DELETE /orders/{id}`.
    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.pipeline
            .delete::<Value>(&format!("/orders/{}", path_segment(id)))
            .await?
            .into_result()?;
        info!(order_id = %id, "Order deleted");
        Ok(())
    }

    /// `PUT /orders/{id}/status`.
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> ApiResult<()> {
        let body = StatusBody {
            order_status: status,
        };
        self.pipeline
            .put::<Value, _>(&format!("/orders/{}/status", path_segment(id)), &body)
            .await?
            .into_result()?;
        info!(order_id = %id, status = %status, "Order status updated");
        Ok(())
    }

    /// Delete several orders concurrently. A failure does not stop the
    /// other deletes.
    pub async fn delete_many(&self, ids: &[RecordId]) -> BatchOutcome {
        let results = join_all(ids.iter().map(|id| self.delete(id))).await;

        let mut outcome = BatchOutcome::default();
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(()) => outcome.succeeded.push(id.clone()),
                Err(e) => {
                    warn!(order_id = %id, error = %e, "Batch delete entry failed");
                    outcome.failed.push((id.clone(), e));
                }
            }
        }

        info!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Batch delete finished"
        );
        outcome
    }
}
