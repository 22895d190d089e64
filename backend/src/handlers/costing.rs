//! Cost and valuation HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::costing::{CostingService, IngredientCost, IngredientValuation};
use crate::AppState;

/// Current unit cost of an ingredient
pub async fn get_ingredient_cost(
    State(state): State<AppState>,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<IngredientCost>> {
    let service = CostingService::new(state.db);
    let cost = service.current_unit_cost(ingredient_id).await?;
    Ok(Json(cost))
}

/// Stock valuation across all ingredients
pub async fn get_stock_valuation(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<IngredientValuation>>> {
    let service = CostingService::new(state.db);
    let valuation = service.valuation().await?;
    Ok(Json(valuation))
}
