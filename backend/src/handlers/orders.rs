//! Order pipeline HTTP handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::Order;

use crate::error::AppResult;
use crate::middleware::Actor;
use crate::services::orders::{AdvanceResult, CreateOrderInput, OrderDetail, OrderService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub stage: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceInput {
    pub stage: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelInput {
    pub justification: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPaidInput {
    pub paid: bool,
}

/// Create an order in the first pipeline stage
pub async fn create_order(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.db);
    let order = service.create_order(&actor, input).await?;
    Ok(Json(order))
}

/// List orders, optionally filtered by stage
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let service = OrderService::new(state.db);
    let orders = service.list_orders(query.stage.as_deref()).await?;
    Ok(Json(orders))
}

/// Get an order with lines, requirements and shortages
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.db);
    let order = service.get_order(order_id).await?;
    Ok(Json(order))
}

/// Advance an order to the next stage
pub async fn advance_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(order_id): Path<Uuid>,
    Json(input): Json<AdvanceInput>,
) -> AppResult<Json<AdvanceResult>> {
    let service = OrderService::new(state.db);
    let result = service.advance(&actor, order_id, &input.stage).await?;
    Ok(Json(result))
}

/// Cancel an order with a justification
pub async fn cancel_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(order_id): Path<Uuid>,
    Json(input): Json<CancelInput>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    let order = service.cancel(&actor, order_id, &input.justification).await?;
    Ok(Json(order))
}

/// Set the paid flag on an order
pub async fn set_order_paid(
    State(state): State<AppState>,
    actor: Actor,
    Path(order_id): Path<Uuid>,
    Json(input): Json<SetPaidInput>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    let order = service.set_paid(&actor, order_id, input.paid).await?;
    Ok(Json(order))
}
