//! Ingredient catalog HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use shared::Ingredient;

use crate::error::AppResult;
use crate::services::ingredients::{CreateIngredientInput, IngredientService};
use crate::AppState;

/// Register a new ingredient
pub async fn create_ingredient(
    State(state): State<AppState>,
    Json(input): Json<CreateIngredientInput>,
) -> AppResult<Json<Ingredient>> {
    let service = IngredientService::new(state.db);
    let ingredient = service.create(input).await?;
    Ok(Json(ingredient))
}

/// List active ingredients
pub async fn list_ingredients(State(state): State<AppState>) -> AppResult<Json<Vec<Ingredient>>> {
    let service = IngredientService::new(state.db);
    let ingredients = service.list().await?;
    Ok(Json(ingredients))
}

/// Get one ingredient
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<Ingredient>> {
    let service = IngredientService::new(state.db);
    let ingredient = service.get(ingredient_id).await?;
    Ok(Json(ingredient))
}
