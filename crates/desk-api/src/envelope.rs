//! The `{code, message, data}` response envelope.

use crate::error::{ApiError, ApiResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Envelope code signalling success.
pub const SUCCESS_CODE: i64 = 200;

/// Envelope code signalling a business-level "not authenticated" result,
/// delivered over HTTP 200.
pub const UNAUTHORIZED_CODE: i64 = 401;

/// Wrapper carried by every API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    pub fn is_business_unauthorized(&self) -> bool {
        self.code == UNAUTHORIZED_CODE
    }

    /// The business error this envelope represents, if its code is not 200.
    pub fn business_error(&self) -> Option<ApiError> {
        if self.is_success() {
            None
        } else {
            Some(ApiError::Business {
                code: self.code,
                message: self.message.clone(),
            })
        }
    }

    /// Unwrap a success envelope that must carry data.
    pub fn into_data(self) -> ApiResult<T> {
        match self.into_result()? {
            Some(data) => Ok(data),
            None => Err(ApiError::MalformedResponse(
                "success envelope without data".to_string(),
            )),
        }
    }

    /// Unwrap a success envelope whose data may be null.
    pub fn into_result(self) -> ApiResult<Option<T>> {
        if let Some(err) = self.business_error() {
            return Err(err);
        }
        Ok(self.data)
    }
}

impl ApiEnvelope<Value> {
    /// Convert the untyped payload into `T`.
    ///
    /// A payload that does not fit `T` is malformed only on a success
    /// envelope. Error envelopes often carry unrelated data and keep their
    /// code and message with the data dropped.
    pub(crate) fn decode<T: DeserializeOwned>(self) -> ApiResult<ApiEnvelope<T>> {
        let data = match self.data {
            None | Some(Value::Null) => None,
            Some(value) => match serde_json::from_value::<T>(value) {
                Ok(data) => Some(data),
                Err(e) if self.code == SUCCESS_CODE => {
                    return Err(ApiError::MalformedResponse(format!(
                        "unexpected data shape: {e}"
                    )))
                }
                Err(_) => None,
            },
        };

        Ok(ApiEnvelope {
            code: self.code,
            message: self.message,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn raw(value: Value) -> ApiEnvelope<Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_missing_and_null_fields_default() {
        let envelope = raw(json!({ "code": 200, "message": null }));
        assert_eq!(envelope.message, "");
        assert_eq!(envelope.data, None);
    }

    #[test]
    fn test_into_data_on_success() {
        let envelope: ApiEnvelope<String> = raw(json!({ "code": 200, "message": "ok", "data": "abc" }))
            .decode()
            .unwrap();
        assert_eq!(envelope.into_data().unwrap(), "abc");
    }

    #[test]
    fn test_into_data_without_data_is_malformed() {
        let envelope: ApiEnvelope<String> = raw(json!({ "code": 200, "data": null })).decode().unwrap();
        assert_eq!(envelope.into_data().unwrap_err().kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_non_success_code_becomes_business_error() {
        let envelope: ApiEnvelope<String> = raw(json!({ "code": 401, "message": "not logged in" }))
            .decode()
            .unwrap();
        assert!(envelope.is_business_unauthorized());

        match envelope.into_result().unwrap_err() {
            ApiError::Business { code, message } => {
                assert_eq!(code, 401);
                assert_eq!(message, "not logged in");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_shape_mismatch() {
        let success = raw(json!({ "code": 200, "data": { "unexpected": true } }));
        assert!(matches!(
            success.decode::<String>(),
            Err(ApiError::MalformedResponse(_))
        ));

        let failure = raw(json!({ "code": 500, "message": "boom", "data": { "trace": 1 } }));
        let envelope = failure.decode::<String>().unwrap();
        assert_eq!(envelope.code, 500);
        assert_eq!(envelope.data, None);
    }
}
