//! Batch store: stock lots and the append-only movement log
//!
//! This service owns the lot/move lifecycle. Every mutation pairs a movement
//! record with the lot's remaining-quantity update inside one transaction;
//! `remaining` is a cache over the log and the guarded UPDATE keeps it from
//! ever going negative, also under concurrent debits.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::{validate_quantity, validate_unit_cost, ExpiredLot, MoveKind, StockLot, StockMove};

use crate::error::{AppError, AppResult};
use crate::middleware::Actor;

/// Stock service for managing lots and movements
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Input for registering a purchase or manual stock-in
#[derive(Debug, Deserialize)]
pub struct CreateLotInput {
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub expiry: Option<NaiveDate>,
    pub note: Option<String>,
}

#[derive(Debug, FromRow)]
pub(crate) struct LotRow {
    pub(crate) id: Uuid,
    pub(crate) seq: i64,
    pub(crate) ingredient_id: Uuid,
    pub(crate) quantity: Decimal,
    pub(crate) remaining: Decimal,
    pub(crate) unit_cost: Decimal,
    pub(crate) expiry: Option<NaiveDate>,
    pub(crate) note: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) created_by: Option<String>,
}

impl From<LotRow> for StockLot {
    fn from(row: LotRow) -> Self {
        StockLot {
            id: row.id,
            seq: row.seq,
            ingredient_id: row.ingredient_id,
            quantity: row.quantity,
            remaining: row.remaining,
            unit_cost: row.unit_cost,
            expiry: row.expiry,
            note: row.note,
            created_at: row.created_at,
            created_by: row.created_by,
        }
    }
}

#[derive(Debug, FromRow)]
struct MoveRow {
    id: Uuid,
    lot_id: Uuid,
    ingredient_id: Uuid,
    kind: String,
    quantity: Decimal,
    cost: Decimal,
    order_id: Option<Uuid>,
    reason: Option<String>,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
}

fn move_from_row(row: MoveRow) -> AppResult<StockMove> {
    let kind = MoveKind::from_code(&row.kind)
        .ok_or_else(|| AppError::Configuration(format!("unknown move kind {}", row.kind)))?;
    Ok(StockMove {
        id: row.id,
        lot_id: row.lot_id,
        ingredient_id: row.ingredient_id,
        kind,
        quantity: row.quantity,
        cost: row.cost,
        order_id: row.order_id,
        reason: row.reason,
        created_at: row.created_at,
        created_by: row.created_by,
    })
}

pub(crate) const LOT_COLUMNS: &str =
    "id, seq, ingredient_id, quantity, remaining, unit_cost, expiry, note, created_at, created_by";

/// Canonical FIFO ordering clause; must match `shared::fifo::canonical_cmp`.
pub(crate) const FIFO_ORDER: &str = "expiry ASC NULLS LAST, created_at ASC, seq ASC";

impl StockService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a new stock lot together with its IN move
    pub async fn add_lot(&self, actor: &Actor, input: CreateLotInput) -> AppResult<StockLot> {
        validate_quantity(input.quantity)
            .map_err(|e| AppError::InvalidQuantity(e.to_string()))?;
        validate_unit_cost(input.unit_cost).map_err(|e| AppError::Validation {
            field: "unit_cost".to_string(),
            message: e.to_string(),
            message_pt: "O custo unitário não pode ser negativo".to_string(),
        })?;

        let ingredient_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM ingredients WHERE id = $1)",
        )
        .bind(input.ingredient_id)
        .fetch_one(&self.db)
        .await?;

        if !ingredient_exists {
            return Err(AppError::NotFound("Ingredient".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let lot = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            INSERT INTO stock_lots (ingredient_id, quantity, remaining, unit_cost, expiry, note, created_by)
            VALUES ($1, $2, $2, $3, $4, $5, $6)
            RETURNING {LOT_COLUMNS}
            "#,
        ))
        .bind(input.ingredient_id)
        .bind(input.quantity)
        .bind(input.unit_cost)
        .bind(input.expiry)
        .bind(&input.note)
        .bind(actor.name())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO stock_moves (lot_id, ingredient_id, kind, quantity, cost, reason, created_by)
            VALUES ($1, $2, 'in', $3, $4, $5, $6)
            "#,
        )
        .bind(lot.id)
        .bind(lot.ingredient_id)
        .bind(lot.quantity)
        .bind(lot.quantity * lot.unit_cost)
        .bind("purchase")
        .bind(actor.name())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(lot_id = %lot.id, ingredient_id = %lot.ingredient_id, "stock lot created");
        Ok(lot.into())
    }

    /// List an ingredient's lots in canonical FIFO order
    pub async fn list_lots(&self, ingredient_id: Uuid) -> AppResult<Vec<StockLot>> {
        let rows = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {LOT_COLUMNS} FROM stock_lots WHERE ingredient_id = $1 ORDER BY {FIFO_ORDER}",
        ))
        .bind(ingredient_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockLot::from).collect())
    }

    /// Get a single lot
    pub async fn get_lot(&self, lot_id: Uuid) -> AppResult<StockLot> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {LOT_COLUMNS} FROM stock_lots WHERE id = $1",
        ))
        .bind(lot_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock lot".to_string()))?;

        Ok(row.into())
    }

    /// List the movement log for a lot
    pub async fn list_moves(&self, lot_id: Uuid) -> AppResult<Vec<StockMove>> {
        let rows = sqlx::query_as::<_, MoveRow>(
            r#"
            SELECT id, lot_id, ingredient_id, kind, quantity, cost, order_id, reason, created_at, created_by
            FROM stock_moves
            WHERE lot_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(move_from_row).collect()
    }

    /// Append an outbound move against a lot
    ///
    /// This is the unconditional mutation primitive: confirmation, FIFO
    /// selection and idempotence guards all live upstream. IN moves are only
    /// created by `add_lot`.
    pub async fn record_move(
        &self,
        actor: &Actor,
        lot_id: Uuid,
        kind: MoveKind,
        quantity: Decimal,
        order_id: Option<Uuid>,
        reason: Option<String>,
    ) -> AppResult<StockMove> {
        if !kind.is_outbound() {
            return Err(AppError::Validation {
                field: "kind".to_string(),
                message: "IN moves are created by add_lot".to_string(),
                message_pt: "Movimentos de entrada são criados pela compra de lote".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;
        let lot = lock_lot(&mut tx, lot_id).await?;
        let recorded = debit_lot(
            &mut tx,
            actor,
            &lot,
            kind,
            quantity,
            order_id,
            reason.as_deref(),
        )
        .await?;
        tx.commit().await?;

        Ok(recorded)
    }

    /// Discard a quantity from a lot with an explicit reason
    pub async fn discard(
        &self,
        actor: &Actor,
        lot_id: Uuid,
        quantity: Decimal,
        reason: String,
    ) -> AppResult<StockMove> {
        if reason.trim().is_empty() {
            return Err(AppError::Validation {
                field: "reason".to_string(),
                message: "Discard requires a reason".to_string(),
                message_pt: "O descarte exige um motivo".to_string(),
            });
        }
        self.record_move(actor, lot_id, MoveKind::Discard, quantity, None, Some(reason))
            .await
    }

    /// Discard the full remaining quantity of every lot expired before `as_of`
    ///
    /// Takes the same per-lot locks as consumption so a sweep never races an
    /// in-flight FIFO debit. Running twice with the same `as_of` and no
    /// intervening purchases is a no-op the second time.
    pub async fn expire_sweep(&self, actor: &Actor, as_of: NaiveDate) -> AppResult<Vec<ExpiredLot>> {
        let mut tx = self.db.begin().await?;

        let expired = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            SELECT {LOT_COLUMNS} FROM stock_lots
            WHERE expiry IS NOT NULL AND expiry < $1 AND remaining > 0
            ORDER BY {FIFO_ORDER}
            FOR UPDATE
            "#,
        ))
        .bind(as_of)
        .fetch_all(&mut *tx)
        .await?;

        let mut swept = Vec::with_capacity(expired.len());
        for lot in expired {
            let quantity = lot.remaining;
            debit_lot(
                &mut tx,
                actor,
                &lot,
                MoveKind::Discard,
                quantity,
                None,
                Some("expired"),
            )
            .await?;
            // expiry is non-null by the WHERE clause
            if let Some(expiry) = lot.expiry {
                swept.push(ExpiredLot {
                    lot_id: lot.id,
                    ingredient_id: lot.ingredient_id,
                    discarded: quantity,
                    expiry,
                });
            }
        }

        tx.commit().await?;

        if !swept.is_empty() {
            tracing::info!(count = swept.len(), %as_of, "expired lots discarded");
        }
        Ok(swept)
    }
}

/// Lock a lot row for the duration of the surrounding transaction
async fn lock_lot(tx: &mut Transaction<'_, Postgres>, lot_id: Uuid) -> AppResult<LotRow> {
    sqlx::query_as::<_, LotRow>(&format!(
        "SELECT {LOT_COLUMNS} FROM stock_lots WHERE id = $1 FOR UPDATE",
    ))
    .bind(lot_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Stock lot".to_string()))
}

/// Debit a locked lot: decrement remaining and append the move, atomically
///
/// The UPDATE predicate re-checks the remaining quantity, so even a caller
/// holding a stale row can never drive `remaining` below zero.
pub(crate) async fn debit_lot(
    tx: &mut Transaction<'_, Postgres>,
    actor: &Actor,
    lot: &LotRow,
    kind: MoveKind,
    quantity: Decimal,
    order_id: Option<Uuid>,
    reason: Option<&str>,
) -> AppResult<StockMove> {
    validate_quantity(quantity).map_err(|e| AppError::InvalidQuantity(e.to_string()))?;

    let updated = sqlx::query(
        "UPDATE stock_lots SET remaining = remaining - $2 WHERE id = $1 AND remaining >= $2",
    )
    .bind(lot.id)
    .bind(quantity)
    .execute(&mut **tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::InsufficientLot(format!(
            "lot {} has less than {} remaining",
            lot.id, quantity
        )));
    }

    let row = sqlx::query_as::<_, MoveRow>(
        r#"
        INSERT INTO stock_moves (lot_id, ingredient_id, kind, quantity, cost, order_id, reason, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, lot_id, ingredient_id, kind, quantity, cost, order_id, reason, created_at, created_by
        "#,
    )
    .bind(lot.id)
    .bind(lot.ingredient_id)
    .bind(kind.as_str())
    .bind(quantity)
    .bind(quantity * lot.unit_cost)
    .bind(order_id)
    .bind(reason)
    .bind(actor.name())
    .fetch_one(&mut **tx)
    .await?;

    move_from_row(row)
}

