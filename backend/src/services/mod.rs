//! Business logic services

pub mod consumption;
pub mod costing;
pub mod ingredients;
pub mod orders;
pub mod pipeline_config;
pub mod stock;
