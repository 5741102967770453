//! `/auth` endpoints.
//!
//! These return the raw envelope: the session manager reacts to business
//! codes itself instead of treating every non-200 code as an error.

use crate::envelope::ApiEnvelope;
use crate::error::ApiResult;
use crate::pipeline::RequestPipeline;
use crate::types::{LoginParams, UserIdentity};
use serde_json::Value;

#[derive(Clone)]
pub struct AuthApi {
    pipeline: RequestPipeline,
}

impl AuthApi {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self { pipeline }
    }

    /// `POST /auth/login`. The token arrives as a bare string or as an object
    /// carrying `tokenValue` / `token`, so the payload stays untyped.
    pub async fn login(&self, params: &LoginParams) -> ApiResult<ApiEnvelope<Value>> {
        self.pipeline.post("/auth/login", Some(params)).await
    }

    /// `POST /auth/logout`.
    pub async fn logout(&self) -> ApiResult<ApiEnvelope<Value>> {
        self.pipeline.post::<Value, Value>("/auth/logout", None).await
    }

    /// `GET /auth/info`, the identity behind the current credential.
    pub async fn info(&self) -> ApiResult<ApiEnvelope<UserIdentity>> {
        self.pipeline.get("/auth/info").await
    }
}
