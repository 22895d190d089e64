//! Stock lot and movement models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A batch of an ingredient acquired at one time
///
/// `remaining` is a cached value reconciled with the movement log inside the
/// same transaction that writes a move; the log is the source of truth.
/// A lot with `remaining == 0` is inert but kept for cost history and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLot {
    pub id: Uuid,
    /// Monotone creation sequence; the deterministic FIFO tie-break.
    pub seq: i64,
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub remaining: Decimal,
    pub unit_cost: Decimal,
    pub expiry: Option<NaiveDate>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

/// Movement kinds in the append-only stock log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    /// Purchase or manual stock-in; creates a lot.
    In,
    /// FIFO debit against an order.
    Consumption,
    /// Loss, expiry or manual adjustment out.
    Discard,
}

impl MoveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveKind::In => "in",
            MoveKind::Consumption => "consumption",
            MoveKind::Discard => "discard",
        }
    }

    pub fn is_outbound(&self) -> bool {
        matches!(self, MoveKind::Consumption | MoveKind::Discard)
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "in" => Some(MoveKind::In),
            "consumption" => Some(MoveKind::Consumption),
            "discard" => Some(MoveKind::Discard),
            _ => None,
        }
    }
}

/// An immutable entry in the stock movement log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMove {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub ingredient_id: Uuid,
    pub kind: MoveKind,
    pub quantity: Decimal,
    /// Quantity valued at the lot's acquisition unit cost.
    pub cost: Decimal,
    pub order_id: Option<Uuid>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

/// One lot affected by an expiry sweep
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpiredLot {
    pub lot_id: Uuid,
    pub ingredient_id: Uuid,
    pub discarded: Decimal,
    pub expiry: NaiveDate,
}
