//! Cost estimator: weighted-average ingredient costs and stock valuation

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::costing::{self, LotCost};

use crate::error::{AppError, AppResult};

/// Costing service computing ingredient costs on query
#[derive(Clone)]
pub struct CostingService {
    db: PgPool,
}

/// Current cost report for one ingredient
#[derive(Debug, Clone, Serialize)]
pub struct IngredientCost {
    pub ingredient_id: Uuid,
    pub name: String,
    pub unit: String,
    pub on_hand: Decimal,
    /// Weighted average over stocked lots, or the last known purchase price
    /// when nothing remains.
    pub unit_cost: Decimal,
}

/// Valuation line for the stock report
#[derive(Debug, Clone, Serialize)]
pub struct IngredientValuation {
    pub ingredient_id: Uuid,
    pub name: String,
    pub unit: String,
    pub on_hand: Decimal,
    pub unit_cost: Decimal,
    pub total_value: Decimal,
}

#[derive(Debug, FromRow)]
struct CostLotRow {
    ingredient_id: Uuid,
    name: String,
    unit: String,
    seq: i64,
    remaining: Decimal,
    unit_cost: Decimal,
}

impl CostingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Current unit cost of an ingredient
    ///
    /// Fails with `NoPriceHistory` when the ingredient has no lots at all;
    /// the caller may then supply a manual price.
    pub async fn current_unit_cost(&self, ingredient_id: Uuid) -> AppResult<IngredientCost> {
        let ingredient = sqlx::query_as::<_, (String, String)>(
            "SELECT name, unit FROM ingredients WHERE id = $1",
        )
        .bind(ingredient_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?;

        let lots = self.lot_costs(ingredient_id).await?;
        let unit_cost = costing::current_unit_cost(&lots)
            .map_err(|e| AppError::from_costing(e, &ingredient.0))?;

        Ok(IngredientCost {
            ingredient_id,
            name: ingredient.0,
            unit: ingredient.1,
            on_hand: costing::stock_on_hand(&lots),
            unit_cost,
        })
    }

    /// Unit cost used for order cost snapshots: zero when no price history
    ///
    /// Snapshot capture must not fail order creation; the missing price is a
    /// recoverable condition reported through the cost endpoint instead.
    pub async fn snapshot_unit_cost(&self, ingredient_id: Uuid) -> AppResult<Decimal> {
        let lots = self.lot_costs(ingredient_id).await?;
        Ok(costing::current_unit_cost(&lots).unwrap_or(Decimal::ZERO))
    }

    /// Stock valuation across all active ingredients that have lots
    pub async fn valuation(&self) -> AppResult<Vec<IngredientValuation>> {
        let rows = sqlx::query_as::<_, CostLotRow>(
            r#"
            SELECT i.id AS ingredient_id, i.name, i.unit, l.seq, l.remaining, l.unit_cost
            FROM ingredients i
            JOIN stock_lots l ON l.ingredient_id = i.id
            WHERE i.is_active
            ORDER BY i.name, l.seq
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        // Rows arrive grouped by ingredient; fold each group into one line.
        let mut out: Vec<IngredientValuation> = Vec::new();
        let mut lots: Vec<LotCost> = Vec::new();
        let mut current: Option<&CostLotRow> = None;
        for row in &rows {
            if let Some(cur) = current {
                if cur.ingredient_id != row.ingredient_id {
                    out.push(Self::valuation_line(cur, &lots));
                    lots.clear();
                }
            }
            lots.push(LotCost {
                seq: row.seq,
                remaining: row.remaining,
                unit_cost: row.unit_cost,
            });
            current = Some(row);
        }
        if let Some(cur) = current {
            out.push(Self::valuation_line(cur, &lots));
        }
        Ok(out)
    }

    fn valuation_line(row: &CostLotRow, lots: &[LotCost]) -> IngredientValuation {
        let on_hand = costing::stock_on_hand(lots);
        let unit_cost = costing::current_unit_cost(lots).unwrap_or(Decimal::ZERO);
        IngredientValuation {
            ingredient_id: row.ingredient_id,
            name: row.name.clone(),
            unit: row.unit.clone(),
            on_hand,
            unit_cost,
            total_value: on_hand * unit_cost,
        }
    }

    async fn lot_costs(&self, ingredient_id: Uuid) -> AppResult<Vec<LotCost>> {
        let lots = sqlx::query_as::<_, (i64, Decimal, Decimal)>(
            "SELECT seq, remaining, unit_cost FROM stock_lots WHERE ingredient_id = $1",
        )
        .bind(ingredient_id)
        .fetch_all(&self.db)
        .await?;

        Ok(lots
            .into_iter()
            .map(|(seq, remaining, unit_cost)| LotCost {
                seq,
                remaining,
                unit_cost,
            })
            .collect())
    }
}
