//! Domain models for the Bakery Production Management system

mod ingredient;
mod order;
mod stock;

pub use ingredient::*;
pub use order::*;
pub use stock::*;
