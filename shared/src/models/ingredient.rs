//! Ingredient catalog models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Unit;

/// A raw material tracked in batch inventory
///
/// Identity and unit of measure are immutable once lots exist; display
/// attributes are owned by the external catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub unit: Unit,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A flattened ingredient requirement for one order
///
/// Supplied by the external recipe collaborator: recipe expansion has already
/// happened, quantities are aggregated per ingredient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngredientRequirement {
    pub ingredient_id: Uuid,
    pub quantity: rust_decimal::Decimal,
}
