//! Wire types for the admin REST API.

use crate::error::ApiResult;
use crate::validation::{is_valid_phone, ValidationErrors};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record identifier. The server sends ids as strings or as integers.
pub type RecordId = String;

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<RecordId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

// ============================================================================
// Orders
// ============================================================================

/// Lifecycle of an order, sent over the wire as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OrderStatus {
    PendingPickup,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::PendingPickup,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::PendingPickup => "pending pickup",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<u8> for OrderStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OrderStatus::PendingPickup),
            1 => Ok(OrderStatus::Completed),
            2 => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

impl From<OrderStatus> for u8 {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::PendingPickup => 0,
            OrderStatus::Completed => 1,
            OrderStatus::Cancelled => 2,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "pending" | "pending-pickup" | "pending_pickup" => Ok(OrderStatus::PendingPickup),
            "1" | "completed" | "done" => Ok(OrderStatus::Completed),
            "2" | "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            other => Err(format!(
                "unknown order status '{other}' (expected pending, completed or cancelled)"
            )),
        }
    }
}

/// An order as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: RecordId,
    #[serde(default)]
    pub order_no: String,
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    pub product_name: String,
    pub product_quantity: i64,
    pub order_status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Payload for creating or editing an order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    pub product_name: String,
    pub product_quantity: i64,
    pub order_status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Default for OrderDraft {
    fn default() -> Self {
        Self {
            customer_name: String::new(),
            customer_phone: String::new(),
            customer_email: None,
            license_plate: None,
            product_name: String::new(),
            product_quantity: 1,
            order_status: OrderStatus::PendingPickup,
            remarks: None,
        }
    }
}

impl OrderDraft {
    /// Prefill a draft from an existing order for editing.
    pub fn from_order(order: &Order) -> Self {
        Self {
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            customer_email: order.customer_email.clone(),
            license_plate: order.license_plate.clone(),
            product_name: order.product_name.clone(),
            product_quantity: order.product_quantity,
            order_status: order.order_status,
            remarks: order.remarks.clone(),
        }
    }

    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = ValidationErrors::new();

        errors.require("customerName", &self.customer_name, "customer name is required");
        if errors.require("customerPhone", &self.customer_phone, "phone number is required")
            && !is_valid_phone(self.customer_phone.trim())
        {
            errors.add("customerPhone", "phone number must be 11 digits");
        }
        errors.require("productName", &self.product_name, "product name is required");
        if self.product_quantity <= 0 {
            errors.add("productQuantity", "quantity must be greater than 0");
        }

        errors.into_result()
    }
}

/// Search filters for `GET /orders/search`. Absent filters are omitted from
/// the query string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSearchParams {
    pub current_page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl Default for OrderSearchParams {
    fn default() -> Self {
        Self {
            current_page: 1,
            page_size: 10,
            keyword: None,
            order_no: None,
            customer_name: None,
            license_plate: None,
            order_status: None,
            start_date: None,
            end_date: None,
        }
    }
}

// ============================================================================
// Administrators
// ============================================================================

/// Whether an administrator account may log in. Sent as `1` / `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AccountStatus {
    Disabled,
    Enabled,
}

impl TryFrom<u8> for AccountStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AccountStatus::Disabled),
            1 => Ok(AccountStatus::Enabled),
            other => Err(format!("unknown account status: {other}")),
        }
    }
}

impl From<AccountStatus> for u8 {
    fn from(status: AccountStatus) -> Self {
        match status {
            AccountStatus::Disabled => 0,
            AccountStatus::Enabled => 1,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Disabled => f.write_str("disabled"),
            AccountStatus::Enabled => f.write_str("enabled"),
        }
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "enabled" | "enable" | "on" => Ok(AccountStatus::Enabled),
            "0" | "disabled" | "disable" | "off" => Ok(AccountStatus::Disabled),
            other => Err(format!(
                "unknown account status '{other}' (expected enabled or disabled)"
            )),
        }
    }
}

/// Administrator profile. Also the resolved identity of the logged-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: RecordId,
    pub username: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub status: AccountStatus,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub update_time: String,
    #[serde(default)]
    pub deleted: i32,
}

impl UserIdentity {
    pub fn is_enabled(&self) -> bool {
        self.status == AccountStatus::Enabled
    }

    /// Nickname when set, otherwise the username.
    pub fn display_name(&self) -> &str {
        if self.nickname.trim().is_empty() {
            &self.username
        } else {
            &self.nickname
        }
    }
}

/// Rows of the administrator table share the identity shape.
pub type AdminUser = UserIdentity;

/// Payload for creating an administrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDraft {
    pub username: String,
    pub password: String,
    pub nickname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub status: AccountStatus,
}

impl AdminDraft {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = ValidationErrors::new();
        errors.require("username", &self.username, "username is required");
        errors.require("password", &self.password, "password is required");
        errors.require("nickname", &self.nickname, "nickname is required");
        errors.into_result()
    }
}

/// Payload for editing an administrator. The username cannot change; the
/// password is only sent when a new one is supplied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdate {
    pub nickname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AccountStatus>,
}

impl AdminUpdate {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = ValidationErrors::new();
        errors.require("nickname", &self.nickname, "nickname is required");
        errors.into_result()
    }

    /// Drop a blank password so the server keeps the current one.
    pub(crate) fn normalized(&self) -> Self {
        let mut update = self.clone();
        if update
            .password
            .as_deref()
            .is_some_and(|password| password.trim().is_empty())
        {
            update.password = None;
        }
        update
    }
}

/// Filters for `GET /admin`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminSearchParams {
    pub current: u32,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Default for AdminSearchParams {
    fn default() -> Self {
        Self {
            current: 1,
            size: 10,
            username: None,
        }
    }
}

// ============================================================================
// Shared
// ============================================================================

/// Login request body.
#[derive(Clone, PartialEq, Serialize)]
pub struct LoginParams {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginParams")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub current: u64,
    #[serde(default)]
    pub pages: u64,
}

impl<T> Page<T> {
    /// Number of pages needed to show `total` records at `page_size` per
    /// page. An empty listing still has one (empty) page.
    pub fn total_pages(&self, page_size: u64) -> u64 {
        if page_size == 0 {
            return 1;
        }
        self.total.div_ceil(page_size).max(1)
    }

    /// Whether records exist beyond page `current_page` (1-based).
    pub fn has_next(&self, current_page: u64, page_size: u64) -> bool {
        current_page.saturating_mul(page_size) < self.total
    }
}

/// Result of `POST /upload/image`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub image_url: String,
    pub image_id: i64,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub original_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use serde_json::json;

    fn valid_draft() -> OrderDraft {
        OrderDraft {
            customer_name: "Li Wei".to_string(),
            customer_phone: "13800138000".to_string(),
            product_name: "Winter tyres".to_string(),
            product_quantity: 4,
            ..Default::default()
        }
    }

    fn validation_errors(result: ApiResult<()>) -> ValidationErrors {
        match result {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_order_deserializes_camel_case_and_numeric_ids() {
        let order: Order = serde_json::from_value(json!({
            "id": 1024,
            "orderNo": "ORD-1",
            "customerName": "Li Wei",
            "customerPhone": "13800138000",
            "licensePlate": "ABC123",
            "productName": "Winter tyres",
            "productQuantity": 4,
            "orderStatus": 1,
            "createdAt": "2024-03-01T10:00:00",
            "updatedAt": "2024-03-02T10:00:00"
        }))
        .unwrap();

        assert_eq!(order.id, "1024");
        assert_eq!(order.order_status, OrderStatus::Completed);
        assert_eq!(order.license_plate.as_deref(), Some("ABC123"));
        assert_eq!(order.remarks, None);
    }

    #[test]
    fn test_unknown_order_status_is_rejected() {
        let value = json!({
            "id": "1",
            "customerName": "a",
            "customerPhone": "b",
            "productName": "c",
            "productQuantity": 1,
            "orderStatus": 7
        });
        assert!(serde_json::from_value::<Order>(value).is_err());
    }

    #[test]
    fn test_order_status_parse() {
        assert_eq!("pending".parse::<OrderStatus>().unwrap(), OrderStatus::PendingPickup);
        assert_eq!("2".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert_eq!(serde_json::to_value(OrderStatus::Completed).unwrap(), json!(1));
    }

    #[test]
    fn test_order_draft_validation() {
        assert!(valid_draft().validate().is_ok());

        let draft = OrderDraft {
            customer_name: "  ".to_string(),
            customer_phone: "12345".to_string(),
            product_name: String::new(),
            product_quantity: 0,
            ..Default::default()
        };
        let errors = validation_errors(draft.validate());
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get("customerPhone"), Some("phone number must be 11 digits"));

        let missing_phone = OrderDraft {
            customer_phone: String::new(),
            ..valid_draft()
        };
        let errors = validation_errors(missing_phone.validate());
        assert_eq!(errors.get("customerPhone"), Some("phone number is required"));
    }

    #[test]
    fn test_order_draft_omits_absent_fields() {
        let value = serde_json::to_value(valid_draft()).unwrap();
        assert_eq!(value["customerPhone"], json!("13800138000"));
        assert_eq!(value["orderStatus"], json!(0));
        assert!(value.get("remarks").is_none());
        assert!(value.get("licensePlate").is_none());
    }

    #[test]
    fn test_search_params_omit_absent_filters() {
        let params = OrderSearchParams {
            license_plate: Some("ABC123".to_string()),
            order_status: Some(OrderStatus::Cancelled),
            ..Default::default()
        };
        let value = serde_json::to_value(params).unwrap();
        assert_eq!(
            value,
            json!({ "currentPage": 1, "pageSize": 10, "licensePlate": "ABC123", "orderStatus": 2 })
        );
    }

    #[test]
    fn test_admin_validation() {
        let draft = AdminDraft {
            username: "ops".to_string(),
            password: String::new(),
            nickname: String::new(),
            avatar: None,
            status: AccountStatus::Enabled,
        };
        let errors = validation_errors(draft.validate());
        assert_eq!(errors.len(), 2);
        assert!(errors.get("password").is_some());
        assert!(errors.get("nickname").is_some());

        let update = AdminUpdate {
            nickname: "Ops".to_string(),
            password: Some("  ".to_string()),
            avatar: None,
            status: None,
        };
        assert!(update.validate().is_ok());
        assert_eq!(update.normalized().password, None);
    }

    #[test]
    fn test_identity_display_name() {
        let identity: UserIdentity = serde_json::from_value(json!({
            "id": "1",
            "username": "admin",
            "nickname": "",
            "status": 1
        }))
        .unwrap();
        assert!(identity.is_enabled());
        assert_eq!(identity.display_name(), "admin");
    }

    #[test]
    fn test_login_params_debug_hides_password() {
        let params = LoginParams {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{params:?}").contains("hunter2"));
    }

    #[test]
    fn test_total_pages() {
        let page: Page<Order> = serde_json::from_value(json!({ "total": 21 })).unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.total_pages(10), 3);
        assert_eq!(page.total_pages(21), 1);
        assert_eq!(page.total_pages(0), 1);
        assert!(page.has_next(2, 10));
        assert!(!page.has_next(3, 10));

        let empty: Page<Order> = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.total_pages(10), 1);
    }
}
