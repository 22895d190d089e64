//! HTTP handlers

pub mod costing;
pub mod health;
pub mod ingredients;
pub mod orders;
pub mod pipeline_config;
pub mod stock;

pub use costing::*;
pub use health::*;
pub use ingredients::*;
pub use orders::*;
pub use pipeline_config::*;
pub use stock::*;
