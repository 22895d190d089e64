//! Input validations shared by services and handlers

use rust_decimal::Decimal;

use crate::models::IngredientRequirement;

/// Quantities entering the stock ledger must be strictly positive
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("quantity must be positive");
    }
    Ok(())
}

/// Acquisition unit costs may be zero (donated stock) but never negative
pub fn validate_unit_cost(unit_cost: Decimal) -> Result<(), &'static str> {
    if unit_cost < Decimal::ZERO {
        return Err("unit cost cannot be negative");
    }
    Ok(())
}

/// Cancellation justifications must carry actual text
pub fn validate_justification(justification: &str) -> Result<(), &'static str> {
    if justification.trim().is_empty() {
        return Err("justification must not be empty");
    }
    Ok(())
}

/// Merge duplicate ingredient entries in a flattened requirement list
///
/// The recipe collaborator aggregates per line item; across line items the
/// same ingredient may repeat. First-seen order is preserved so downstream
/// consumption is deterministic.
pub fn aggregate_requirements(requirements: Vec<IngredientRequirement>) -> Vec<IngredientRequirement> {
    let mut merged: Vec<IngredientRequirement> = Vec::new();
    for req in requirements {
        match merged.iter_mut().find(|r| r.ingredient_id == req.ingredient_id) {
            Some(existing) => existing.quantity += req.quantity,
            None => merged.push(req),
        }
    }
    merged
}
