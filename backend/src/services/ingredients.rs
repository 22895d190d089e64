//! Minimal ingredient catalog
//!
//! Display attributes and richer catalog management live in an external
//! collaborator; this service only maintains the identities and units that
//! stock lots and requirements reference.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{Ingredient, Unit};

use crate::error::{AppError, AppResult};

/// Ingredient catalog service
#[derive(Clone)]
pub struct IngredientService {
    db: PgPool,
}

/// Input for registering an ingredient
#[derive(Debug, Deserialize)]
pub struct CreateIngredientInput {
    pub name: String,
    #[serde(default)]
    pub unit: Unit,
}

#[derive(Debug, FromRow)]
struct IngredientRow {
    id: Uuid,
    name: String,
    unit: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

fn ingredient_from_row(row: IngredientRow) -> AppResult<Ingredient> {
    let unit = Unit::from_code(&row.unit)
        .ok_or_else(|| AppError::Configuration(format!("unknown unit {}", row.unit)))?;
    Ok(Ingredient {
        id: row.id,
        name: row.name,
        unit,
        is_active: row.is_active,
        created_at: row.created_at,
    })
}

impl IngredientService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a new ingredient
    pub async fn create(&self, input: CreateIngredientInput) -> AppResult<Ingredient> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name must not be empty".to_string(),
                message_pt: "O nome não pode ser vazio".to_string(),
            });
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM ingredients WHERE name = $1)",
        )
        .bind(&name)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }

        let row = sqlx::query_as::<_, IngredientRow>(
            r#"
            INSERT INTO ingredients (name, unit)
            VALUES ($1, $2)
            RETURNING id, name, unit, is_active, created_at
            "#,
        )
        .bind(&name)
        .bind(input.unit.code())
        .fetch_one(&self.db)
        .await?;

        ingredient_from_row(row)
    }

    /// List active ingredients
    pub async fn list(&self) -> AppResult<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, IngredientRow>(
            "SELECT id, name, unit, is_active, created_at FROM ingredients WHERE is_active ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(ingredient_from_row).collect()
    }

    /// Get one ingredient
    pub async fn get(&self, ingredient_id: Uuid) -> AppResult<Ingredient> {
        let row = sqlx::query_as::<_, IngredientRow>(
            "SELECT id, name, unit, is_active, created_at FROM ingredients WHERE id = $1",
        )
        .bind(ingredient_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?;

        ingredient_from_row(row)
    }
}
