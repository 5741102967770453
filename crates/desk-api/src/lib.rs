//! Client for the order-tracking admin API.
//!
//! Every call goes through [`RequestPipeline`], which attaches the stored
//! credential, classifies failures into [`FailureClassification`], and on
//! HTTP 401 clears the credential and broadcasts session invalidation.
//!
//! Resource clients ([`AuthApi`], [`OrdersApi`], [`AdminsApi`],
//! [`UploadsApi`]) are thin wrappers that share one pipeline.

mod admins;
mod auth;
mod classification;
mod envelope;
mod error;
mod invalidation;
mod orders;
mod pipeline;
mod types;
mod uploads;
mod validation;

pub use admins::AdminsApi;
pub use auth::AuthApi;
pub use classification::FailureClassification;
pub use envelope::{ApiEnvelope, SUCCESS_CODE, UNAUTHORIZED_CODE};
pub use error::{ApiError, ApiResult, ErrorKind};
pub use invalidation::{InvalidationHub, Subscription, SESSION_INVALIDATED_EVENT};
pub use orders::{BatchOutcome, OrdersApi, LOOKUP_PAGE_SIZE};
pub use pipeline::{PipelineConfig, RequestPipeline, SATOKEN_HEADER, TOKEN_HEADER};
pub use types::{
    AccountStatus, AdminDraft, AdminSearchParams, AdminUpdate, AdminUser, LoginParams, Order,
    OrderDraft, OrderSearchParams, OrderStatus, Page, RecordId, UploadImageResponse, UserIdentity,
};
pub use uploads::{image_url, mime_from_extension, UploadsApi, MAX_IMAGE_BYTES};
pub use validation::{is_valid_phone, ValidationErrors};

/// All resource clients over one shared pipeline.
#[derive(Clone)]
pub struct ApiClient {
    pub auth: AuthApi,
    pub orders: OrdersApi,
    pub admins: AdminsApi,
    pub uploads: UploadsApi,
    pipeline: RequestPipeline,
}

impl ApiClient {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self {
            auth: AuthApi::new(pipeline.clone()),
            orders: OrdersApi::new(pipeline.clone()),
            admins: AdminsApi::new(pipeline.clone()),
            uploads: UploadsApi::new(pipeline.clone()),
            pipeline,
        }
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }
}
