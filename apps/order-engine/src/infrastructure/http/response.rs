//! HTTP response DTOs.

use serde::{Deserialize, Serialize};

use crate::application::dto::{ExecutionDto, OrderDto, OrderLimitDto};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
}

/// Response from order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderResponse {
    /// False when an existing order was returned for a repeated key.
    pub created: bool,
    /// The stored order.
    pub order: OrderDto,
}

/// Orders of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListResponse {
    /// Orders, newest first.
    pub orders: Vec<OrderDto>,
}

/// Execution history of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionListResponse {
    /// Order ID.
    pub order_id: String,
    /// Attempts in order.
    pub executions: Vec<ExecutionDto>,
}

/// Quota buckets of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitListResponse {
    /// Buckets sorted by id.
    pub limits: Vec<OrderLimitDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_lists_serialize() {
        let json = serde_json::to_string(&OrderListResponse { orders: vec![] }).unwrap();
        assert_eq!(json, r#"{"orders":[]}"#);

        let json = serde_json::to_string(&LimitListResponse { limits: vec![] }).unwrap();
        assert_eq!(json, r#"{"limits":[]}"#);
    }
}
