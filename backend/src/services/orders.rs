//! Order pipeline: creation, stage transitions, cancellation and payment
//!
//! A stage transition is the sole trigger for stock mutation. Advancing an
//! order runs as one transaction covering the stage write, the
//! consumed-guard write and every stock movement the FIFO consumer produces,
//! so a failure anywhere leaves the order in its prior stage with no partial
//! movement recorded.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::costing::{self, LotCost};
use shared::{
    aggregate_requirements, validate_quantity, IngredientRequirement, Order, OrderLine,
    OrderShortage, ShortagePolicy, CANCELLED_STAGE,
};

use crate::error::{AppError, AppResult};
use crate::middleware::Actor;
use crate::services::consumption::{self, ConsumptionOutcome};
use crate::services::pipeline_config;

/// Order pipeline service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

/// Input for one order line
#[derive(Debug, Deserialize)]
pub struct OrderLineInput {
    pub product_ref: Option<Uuid>,
    pub description: String,
    pub quantity: Decimal,
    /// Manual price; when absent a price is suggested from the cost snapshot
    /// and the configured margin.
    pub unit_price: Option<Decimal>,
    /// Per-line cost snapshot supplied by the recipe collaborator.
    #[serde(default)]
    pub unit_cost_snapshot: Option<Decimal>,
}

/// Input for creating an order
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub customer_ref: Option<Uuid>,
    pub delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lines: Vec<OrderLineInput>,
    /// Flattened ingredient requirements from the recipe collaborator.
    #[serde(default)]
    pub requirements: Vec<IngredientRequirement>,
}

/// An order with its lines, requirements and recorded shortages
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub requirements: Vec<IngredientRequirement>,
    pub shortages: Vec<OrderShortage>,
}

/// Result of advancing an order one stage
#[derive(Debug, Serialize)]
pub struct AdvanceResult {
    #[serde(flatten)]
    pub order: Order,
    /// Per-ingredient consumption outcomes when the trigger stage was
    /// entered; empty otherwise.
    pub consumption: Vec<ConsumptionOutcome>,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    customer_ref: Option<Uuid>,
    stage: String,
    paid: bool,
    total: Decimal,
    delivery_date: Option<NaiveDate>,
    notes: Option<String>,
    ingredient_cost_snapshot: Decimal,
    stock_consumed: bool,
    has_shortage: bool,
    cancelled_reason: Option<String>,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            customer_ref: row.customer_ref,
            stage: row.stage,
            paid: row.paid,
            total: row.total,
            delivery_date: row.delivery_date,
            notes: row.notes,
            ingredient_cost_snapshot: row.ingredient_cost_snapshot,
            stock_consumed: row.stock_consumed,
            has_shortage: row.has_shortage,
            cancelled_reason: row.cancelled_reason,
            created_at: row.created_at,
            created_by: row.created_by,
        }
    }
}

#[derive(Debug, FromRow)]
struct LineRow {
    id: Uuid,
    order_id: Uuid,
    product_ref: Option<Uuid>,
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    unit_cost_snapshot: Decimal,
}

impl From<LineRow> for OrderLine {
    fn from(row: LineRow) -> Self {
        OrderLine {
            id: row.id,
            order_id: row.order_id,
            product_ref: row.product_ref,
            description: row.description,
            quantity: row.quantity,
            unit_price: row.unit_price,
            unit_cost_snapshot: row.unit_cost_snapshot,
        }
    }
}

const ORDER_COLUMNS: &str = "id, customer_ref, stage, paid, total, delivery_date, notes, \
     ingredient_cost_snapshot, stock_consumed, has_shortage, cancelled_reason, created_at, created_by";

const LINE_COLUMNS: &str =
    "id, order_id, product_ref, description, quantity, unit_price, unit_cost_snapshot";

impl OrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create an order in the first configured stage
    ///
    /// Captures the ingredient cost snapshot at creation time; it is never
    /// recomputed afterwards. Missing price history values at zero rather
    /// than failing creation.
    pub async fn create_order(&self, actor: &Actor, input: CreateOrderInput) -> AppResult<OrderDetail> {
        if input.lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "An order needs at least one line".to_string(),
                message_pt: "O pedido precisa de pelo menos um item".to_string(),
            });
        }
        for line in &input.lines {
            validate_quantity(line.quantity)
                .map_err(|e| AppError::InvalidQuantity(format!("line quantity: {e}")))?;
            if line.description.trim().is_empty() {
                return Err(AppError::Validation {
                    field: "description".to_string(),
                    message: "Line description must not be empty".to_string(),
                    message_pt: "A descrição do item não pode ser vazia".to_string(),
                });
            }
        }
        let requirements = aggregate_requirements(input.requirements);
        for req in &requirements {
            validate_quantity(req.quantity)
                .map_err(|e| AppError::InvalidQuantity(format!("requirement quantity: {e}")))?;
        }

        let mut tx = self.db.begin().await?;

        let config = pipeline_config::stage_config_in_tx(&mut tx).await?;
        let margin = pipeline_config::margin_in_tx(&mut tx).await?;

        // Ingredient cost at creation time, across the flattened requirements.
        let mut cost_snapshot = Decimal::ZERO;
        for req in &requirements {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM ingredients WHERE id = $1)",
            )
            .bind(req.ingredient_id)
            .fetch_one(&mut *tx)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Ingredient".to_string()));
            }
            let unit_cost = snapshot_unit_cost_in_tx(&mut tx, req.ingredient_id).await?;
            cost_snapshot += req.quantity * unit_cost;
        }

        let mut total = Decimal::ZERO;
        let mut priced_lines = Vec::with_capacity(input.lines.len());
        for line in input.lines {
            let snapshot = line.unit_cost_snapshot.unwrap_or(Decimal::ZERO);
            let unit_price = match line.unit_price {
                Some(price) if price >= Decimal::ZERO => price,
                Some(_) => {
                    return Err(AppError::Validation {
                        field: "unit_price".to_string(),
                        message: "Price cannot be negative".to_string(),
                        message_pt: "O preço não pode ser negativo".to_string(),
                    })
                }
                None => snapshot * (Decimal::ONE + margin),
            };
            total += line.quantity * unit_price;
            priced_lines.push((line, unit_price, snapshot));
        }

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (customer_ref, stage, total, delivery_date, notes, ingredient_cost_snapshot, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ORDER_COLUMNS}
            "#,
        ))
        .bind(input.customer_ref)
        .bind(config.first_stage())
        .bind(total)
        .bind(input.delivery_date)
        .bind(&input.notes)
        .bind(cost_snapshot)
        .bind(actor.name())
        .fetch_one(&mut *tx)
        .await?;

        let mut lines = Vec::with_capacity(priced_lines.len());
        for (line, unit_price, snapshot) in priced_lines {
            let row = sqlx::query_as::<_, LineRow>(&format!(
                r#"
                INSERT INTO order_lines (order_id, product_ref, description, quantity, unit_price, unit_cost_snapshot)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {LINE_COLUMNS}
                "#,
            ))
            .bind(order.id)
            .bind(line.product_ref)
            .bind(line.description.trim())
            .bind(line.quantity)
            .bind(unit_price)
            .bind(snapshot)
            .fetch_one(&mut *tx)
            .await?;
            lines.push(row.into());
        }

        for req in &requirements {
            sqlx::query(
                "INSERT INTO order_requirements (order_id, ingredient_id, quantity) VALUES ($1, $2, $3)",
            )
            .bind(order.id)
            .bind(req.ingredient_id)
            .bind(req.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(order_id = %order.id, stage = %order.stage, "order created");
        Ok(OrderDetail {
            order: order.into(),
            lines,
            requirements,
            shortages: Vec::new(),
        })
    }

    /// Advance an order to the next stage
    ///
    /// Forward-only and sequential. Entering the configured trigger stage
    /// consumes stock FIFO for every requirement, exactly once per order:
    /// the persisted `stock_consumed` guard makes a retried or re-routed
    /// entry a no-op. Shortfalls follow the configured policy.
    pub async fn advance(&self, actor: &Actor, order_id: Uuid, target_stage: &str) -> AppResult<AdvanceResult> {
        let mut tx = self.db.begin().await?;

        let order = lock_order(&mut tx, order_id).await?;
        let config = pipeline_config::stage_config_in_tx(&mut tx).await?;
        let effect = config.validate_advance(&order.stage, target_stage)?;

        let mut outcomes: Vec<ConsumptionOutcome> = Vec::new();
        let mut stock_consumed = order.stock_consumed;
        let mut has_shortage = order.has_shortage;

        if effect.enters_trigger && !order.stock_consumed {
            // Requirements in a fixed order: concurrent transitions lock
            // ingredients in the same sequence.
            let requirements = sqlx::query_as::<_, (Uuid, Decimal)>(
                "SELECT ingredient_id, quantity FROM order_requirements WHERE order_id = $1 ORDER BY ingredient_id",
            )
            .bind(order_id)
            .fetch_all(&mut *tx)
            .await?;

            for (ingredient_id, quantity) in requirements {
                let outcome =
                    consumption::consume_in_tx(&mut tx, actor, ingredient_id, quantity, Some(order_id))
                        .await?;
                outcomes.push(outcome);
            }

            let short: Vec<&ConsumptionOutcome> =
                outcomes.iter().filter(|o| o.is_short()).collect();

            if !short.is_empty() && config.shortage_policy == ShortagePolicy::Block {
                // Dropping the transaction rolls every movement back.
                return Err(AppError::InsufficientInventory(format!(
                    "{} ingredient(s) short for order {order_id}",
                    short.len()
                )));
            }

            for outcome in &short {
                sqlx::query(
                    "INSERT INTO order_shortages (order_id, ingredient_id, missing) VALUES ($1, $2, $3)",
                )
                .bind(order_id)
                .bind(outcome.ingredient_id)
                .bind(outcome.shortfall)
                .execute(&mut *tx)
                .await?;
            }

            stock_consumed = true;
            has_shortage = has_shortage || !short.is_empty();
        }

        let updated = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE orders
            SET stage = $2, stock_consumed = $3, has_shortage = $4
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#,
        ))
        .bind(order_id)
        .bind(target_stage)
        .bind(stock_consumed)
        .bind(has_shortage)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            from = %order.stage,
            to = %target_stage,
            consumed = !outcomes.is_empty(),
            "order advanced"
        );
        Ok(AdvanceResult {
            order: updated.into(),
            consumption: outcomes,
        })
    }

    /// Cancel an order with a mandatory justification
    ///
    /// Allowed from any non-terminal stage; the reason is stored verbatim.
    pub async fn cancel(&self, actor: &Actor, order_id: Uuid, justification: &str) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;

        let order = lock_order(&mut tx, order_id).await?;
        let config = pipeline_config::stage_config_in_tx(&mut tx).await?;
        config.validate_cancel(&order.stage, justification)?;

        let updated = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE orders
            SET stage = $2, cancelled_reason = $3
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#,
        ))
        .bind(order_id)
        .bind(CANCELLED_STAGE)
        .bind(justification)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, actor = ?actor.name(), "order cancelled");
        Ok(updated.into())
    }

    /// Toggle the paid flag
    ///
    /// Independent of stage, allowed even on cancelled orders: it models
    /// payment/refund bookkeeping, not production state.
    pub async fn set_paid(&self, actor: &Actor, order_id: Uuid, paid: bool) -> AppResult<Order> {
        let updated = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET paid = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}",
        ))
        .bind(order_id)
        .bind(paid)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        tracing::info!(order_id = %order_id, paid, actor = ?actor.name(), "paid flag updated");
        Ok(updated.into())
    }

    /// Get an order with lines, requirements and shortages
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<OrderDetail> {
        let order = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1",
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let lines = sqlx::query_as::<_, LineRow>(&format!(
            "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = $1 ORDER BY id",
        ))
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        let requirements = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT ingredient_id, quantity FROM order_requirements WHERE order_id = $1 ORDER BY ingredient_id",
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        let shortages = self.shortages(order_id).await?;

        Ok(OrderDetail {
            order: order.into(),
            lines: lines.into_iter().map(OrderLine::from).collect(),
            requirements: requirements
                .into_iter()
                .map(|(ingredient_id, quantity)| IngredientRequirement {
                    ingredient_id,
                    quantity,
                })
                .collect(),
            shortages,
        })
    }

    /// List orders, optionally filtered by stage (the kanban board read)
    pub async fn list_orders(&self, stage: Option<&str>) -> AppResult<Vec<Order>> {
        let rows = match stage {
            Some(stage) => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE stage = $1 ORDER BY created_at",
                ))
                .bind(stage)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at",
                ))
                .fetch_all(&self.db)
                .await?
            }
        };

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Recorded shortages for an order
    pub async fn shortages(&self, order_id: Uuid) -> AppResult<Vec<OrderShortage>> {
        let rows = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT ingredient_id, missing FROM order_shortages WHERE order_id = $1 ORDER BY ingredient_id",
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(ingredient_id, missing)| OrderShortage {
                ingredient_id,
                missing,
            })
            .collect())
    }
}

/// Lock an order row for the duration of the surrounding transaction
async fn lock_order(tx: &mut Transaction<'_, Postgres>, order_id: Uuid) -> AppResult<OrderRow> {
    sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE",
    ))
    .bind(order_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

/// Current unit cost for snapshot purposes; zero when no price history
async fn snapshot_unit_cost_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    ingredient_id: Uuid,
) -> AppResult<Decimal> {
    let lots = sqlx::query_as::<_, (i64, Decimal, Decimal)>(
        "SELECT seq, remaining, unit_cost FROM stock_lots WHERE ingredient_id = $1",
    )
    .bind(ingredient_id)
    .fetch_all(&mut **tx)
    .await?;

    let lots: Vec<LotCost> = lots
        .into_iter()
        .map(|(seq, remaining, unit_cost)| LotCost {
            seq,
            remaining,
            unit_cost,
        })
        .collect();

    Ok(costing::current_unit_cost(&lots).unwrap_or(Decimal::ZERO))
}
