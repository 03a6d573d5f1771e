//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to application use cases.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::application::dto::{ExecutionDto, OrderDto, OrderLimitDto};
use crate::application::use_cases::{
    CancelOrderUseCase, ConfigureLimitsUseCase, QueryOrdersUseCase, SubmitOrderUseCase,
};
use crate::domain::order_management::OrderLedger;
use crate::domain::quota::QuotaLedger;
use crate::domain::shared::{OrderId, Timestamp, UserId};
use crate::error::EngineError;

use super::request::{
    CancelOrderRequest, ListLimitsQuery, ListOrdersQuery, SubmitOrderRequest, UpsertLimitRequest,
};
use super::response::{
    ExecutionListResponse, HealthResponse, LimitListResponse, OrderListResponse,
    SubmitOrderResponse,
};

/// Application state shared across handlers.
pub struct AppState<L, Q>
where
    L: OrderLedger,
    Q: QuotaLedger,
{
    /// Use case for submitting orders.
    pub submit_order: Arc<SubmitOrderUseCase<L>>,
    /// Use case for cancelling orders.
    pub cancel_order: Arc<CancelOrderUseCase<L>>,
    /// Use case for order queries.
    pub query_orders: Arc<QueryOrdersUseCase<L>>,
    /// Use case for quota administration.
    pub configure_limits: Arc<ConfigureLimitsUseCase<Q>>,
    /// Application version.
    pub version: String,
}

impl<L, Q> AppState<L, Q>
where
    L: OrderLedger,
    Q: QuotaLedger,
{
    /// Build the state from the two ledgers.
    pub fn new(ledger: &Arc<L>, quota: &Arc<Q>, version: impl Into<String>) -> Self {
        Self {
            submit_order: Arc::new(SubmitOrderUseCase::new(Arc::clone(ledger))),
            cancel_order: Arc::new(CancelOrderUseCase::new(Arc::clone(ledger))),
            query_orders: Arc::new(QueryOrdersUseCase::new(Arc::clone(ledger))),
            configure_limits: Arc::new(ConfigureLimitsUseCase::new(Arc::clone(quota))),
            version: version.into(),
        }
    }
}

impl<L, Q> Clone for AppState<L, Q>
where
    L: OrderLedger,
    Q: QuotaLedger,
{
    fn clone(&self) -> Self {
        Self {
            submit_order: Arc::clone(&self.submit_order),
            cancel_order: Arc::clone(&self.cancel_order),
            query_orders: Arc::clone(&self.query_orders),
            configure_limits: Arc::clone(&self.configure_limits),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<L, Q>(state: AppState<L, Q>) -> Router
where
    L: OrderLedger + 'static,
    Q: QuotaLedger + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/orders", post(submit_order).get(list_orders))
        .route("/api/v1/orders/{order_id}", get(get_order))
        .route("/api/v1/orders/{order_id}/cancel", post(cancel_order))
        .route("/api/v1/orders/{order_id}/executions", get(list_executions))
        .route("/api/v1/limits", get(list_limits).put(upsert_limit))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check<L, Q>(State(state): State<AppState<L, Q>>) -> impl IntoResponse
where
    L: OrderLedger,
    Q: QuotaLedger,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

/// Submit an order. `201` when created, `200` for a repeated key.
async fn submit_order<L, Q>(
    State(state): State<AppState<L, Q>>,
    Json(request): Json<SubmitOrderRequest>,
) -> Result<impl IntoResponse, EngineError>
where
    L: OrderLedger,
    Q: QuotaLedger,
{
    let outcome = state.submit_order.execute(request.into_command()).await?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(SubmitOrderResponse {
            created: outcome.created,
            order: OrderDto::from_order(&outcome.order),
        }),
    ))
}

async fn list_orders<L, Q>(
    State(state): State<AppState<L, Q>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrderListResponse>, EngineError>
where
    L: OrderLedger,
    Q: QuotaLedger,
{
    if query.user_id.trim().is_empty() {
        return Err(EngineError::invalid_request("user_id is required"));
    }

    let orders = state
        .query_orders
        .list(&UserId::new(query.user_id), query.status)
        .await?;

    Ok(Json(OrderListResponse {
        orders: orders.iter().map(OrderDto::from_order).collect(),
    }))
}

async fn get_order<L, Q>(
    State(state): State<AppState<L, Q>>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderDto>, EngineError>
where
    L: OrderLedger,
    Q: QuotaLedger,
{
    let order = state.query_orders.get(&OrderId::new(order_id)).await?;
    Ok(Json(OrderDto::from_order(&order)))
}

/// Cancel an order. `409` once the order is submitting or terminal.
async fn cancel_order<L, Q>(
    State(state): State<AppState<L, Q>>,
    Path(order_id): Path<String>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<Json<OrderDto>, EngineError>
where
    L: OrderLedger,
    Q: QuotaLedger,
{
    let order = state
        .cancel_order
        .execute(&OrderId::new(order_id), &UserId::new(request.user_id))
        .await?;
    Ok(Json(OrderDto::from_order(&order)))
}

async fn list_executions<L, Q>(
    State(state): State<AppState<L, Q>>,
    Path(order_id): Path<String>,
) -> Result<Json<ExecutionListResponse>, EngineError>
where
    L: OrderLedger,
    Q: QuotaLedger,
{
    let executions = state
        .query_orders
        .executions(&OrderId::new(order_id.clone()))
        .await?;

    Ok(Json(ExecutionListResponse {
        order_id,
        executions: executions.iter().map(ExecutionDto::from_execution).collect(),
    }))
}

async fn upsert_limit<L, Q>(
    State(state): State<AppState<L, Q>>,
    Json(request): Json<UpsertLimitRequest>,
) -> Result<Json<OrderLimitDto>, EngineError>
where
    L: OrderLedger,
    Q: QuotaLedger,
{
    let limit = state
        .configure_limits
        .upsert(request.into_command(), Timestamp::now())
        .await?;
    Ok(Json(OrderLimitDto::from_limit(&limit)))
}

async fn list_limits<L, Q>(
    State(state): State<AppState<L, Q>>,
    Query(query): Query<ListLimitsQuery>,
) -> Result<Json<LimitListResponse>, EngineError>
where
    L: OrderLedger,
    Q: QuotaLedger,
{
    let limits = state
        .configure_limits
        .list(&UserId::new(query.user_id))
        .await?;

    Ok(Json(LimitListResponse {
        limits: limits.iter().map(OrderLimitDto::from_limit).collect(),
    }))
}
