//! FIFO consumer: executes consumption plans inside a caller's transaction
//!
//! This is the only path that debits stock for orders. It performs no
//! idempotence deduplication; the order pipeline's persisted guard is the
//! at-most-once mechanism. Shortfall is a normal result, never an error.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use shared::{plan_consumption, validate_quantity, LotSnapshot, MoveKind, StockMove};

use crate::error::{AppError, AppResult};
use crate::middleware::Actor;
use crate::services::stock::{self, LotRow, FIFO_ORDER, LOT_COLUMNS};

/// Outcome of one ingredient's FIFO consumption
#[derive(Debug, Clone, Serialize)]
pub struct ConsumptionOutcome {
    pub ingredient_id: Uuid,
    pub required: Decimal,
    pub consumed: Decimal,
    pub shortfall: Decimal,
    pub moves: Vec<StockMove>,
}

impl ConsumptionOutcome {
    pub fn is_short(&self) -> bool {
        self.shortfall > Decimal::ZERO
    }
}

/// Consume `required` units of an ingredient in canonical FIFO order
///
/// Locks the ingredient's stocked lots `FOR UPDATE` in the canonical order
/// (a consistent lock order across concurrent consumers), plans against the
/// locked snapshot and applies each debit. Everything commits or rolls back
/// with the caller's transaction.
pub async fn consume_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    actor: &Actor,
    ingredient_id: Uuid,
    required: Decimal,
    order_id: Option<Uuid>,
) -> AppResult<ConsumptionOutcome> {
    validate_quantity(required).map_err(|e| AppError::InvalidQuantity(e.to_string()))?;

    let lots = sqlx::query_as::<_, LotRow>(&format!(
        r#"
        SELECT {LOT_COLUMNS} FROM stock_lots
        WHERE ingredient_id = $1 AND remaining > 0
        ORDER BY {FIFO_ORDER}
        FOR UPDATE
        "#,
    ))
    .bind(ingredient_id)
    .fetch_all(&mut **tx)
    .await?;

    let snapshot: Vec<LotSnapshot> = lots
        .iter()
        .map(|l| LotSnapshot {
            lot_id: l.id,
            seq: l.seq,
            expiry: l.expiry,
            remaining: l.remaining,
        })
        .collect();

    let plan = plan_consumption(&snapshot, required);

    let mut moves = Vec::with_capacity(plan.debits.len());
    for debit in &plan.debits {
        // The planner only names lots from the locked set.
        let lot = lots
            .iter()
            .find(|l| l.id == debit.lot_id)
            .ok_or_else(|| AppError::Configuration("planned debit on unknown lot".to_string()))?;
        let recorded = stock::debit_lot(
            tx,
            actor,
            lot,
            MoveKind::Consumption,
            debit.quantity,
            order_id,
            Some("fifo consumption"),
        )
        .await?;
        moves.push(recorded);
    }

    Ok(ConsumptionOutcome {
        ingredient_id,
        required,
        consumed: plan.consumed,
        shortfall: plan.shortfall,
        moves,
    })
}
