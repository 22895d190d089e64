//! Common types used across the system

use serde::{Deserialize, Serialize};

/// Unit of measure for an ingredient
///
/// The operation tracks raw materials either by mass (grams) or by count
/// (discrete pieces, e.g. eggs).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[default]
    Grams,
    Piece,
}

impl Unit {
    pub fn code(&self) -> &'static str {
        match self {
            Unit::Grams => "g",
            Unit::Piece => "un",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "g" => Some(Unit::Grams),
            "un" => Some(Unit::Piece),
            _ => None,
        }
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

/// Date range for reporting queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_codes() {
        assert_eq!(Unit::Grams.code(), "g");
        assert_eq!(Unit::Piece.code(), "un");
    }

    #[test]
    fn test_default_pagination() {
        let p = Pagination::default();
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 20);
    }
}
