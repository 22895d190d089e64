//! Customer order models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer order moving through the production pipeline
///
/// Orders are never deleted; cancelled orders keep their justification and
/// full history. `stock_consumed` is the persisted guard that makes the
/// trigger-stage consumption idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    /// External customer reference; customer records live elsewhere.
    pub customer_ref: Option<Uuid>,
    pub stage: String,
    pub paid: bool,
    /// Sum of line quantity x unit price, fixed at creation.
    pub total: Decimal,
    pub delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Ingredient cost of the order's requirements valued at creation time,
    /// never recomputed afterwards.
    pub ingredient_cost_snapshot: Decimal,
    pub stock_consumed: bool,
    pub has_shortage: bool,
    pub cancelled_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

/// A line item on an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: Uuid,
    pub order_id: Uuid,
    /// External product reference; the product catalog lives elsewhere.
    pub product_ref: Option<Uuid>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Ingredient cost captured at order creation, never recomputed.
    pub unit_cost_snapshot: Decimal,
}

/// An unmet ingredient quantity recorded when the trigger stage consumed stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderShortage {
    pub ingredient_id: Uuid,
    pub missing: Decimal,
}
