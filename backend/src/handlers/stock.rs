//! Stock management HTTP handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use shared::{ExpiredLot, StockLot, StockMove};

use crate::error::AppResult;
use crate::middleware::Actor;
use crate::services::stock::{CreateLotInput, StockService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DiscardInput {
    pub quantity: Decimal,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpireSweepQuery {
    /// Sweep cutoff; defaults to today.
    pub as_of: Option<NaiveDate>,
}

/// Register a purchase as a new stock lot
pub async fn create_lot(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<CreateLotInput>,
) -> AppResult<Json<StockLot>> {
    let service = StockService::new(state.db);
    let lot = service.add_lot(&actor, input).await?;
    Ok(Json(lot))
}

/// List an ingredient's lots in FIFO order
pub async fn list_lots(
    State(state): State<AppState>,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockLot>>> {
    let service = StockService::new(state.db);
    let lots = service.list_lots(ingredient_id).await?;
    Ok(Json(lots))
}

/// Get a single lot
pub async fn get_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<StockLot>> {
    let service = StockService::new(state.db);
    let lot = service.get_lot(lot_id).await?;
    Ok(Json(lot))
}

/// Movement log for a lot
pub async fn list_lot_moves(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockMove>>> {
    let service = StockService::new(state.db);
    let moves = service.list_moves(lot_id).await?;
    Ok(Json(moves))
}

/// Discard a quantity from a lot
pub async fn discard_from_lot(
    State(state): State<AppState>,
    actor: Actor,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<DiscardInput>,
) -> AppResult<Json<StockMove>> {
    let service = StockService::new(state.db);
    let recorded = service
        .discard(&actor, lot_id, input.quantity, input.reason)
        .await?;
    Ok(Json(recorded))
}

/// Discard every expired lot's remaining quantity
pub async fn expire_sweep(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ExpireSweepQuery>,
) -> AppResult<Json<Vec<ExpiredLot>>> {
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let service = StockService::new(state.db);
    let swept = service.expire_sweep(&actor, as_of).await?;
    Ok(Json(swept))
}
