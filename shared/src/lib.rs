//! Shared types and domain logic for the Bakery Production Management system
//!
//! This crate contains the database-free core: domain models, the canonical
//! FIFO lot ordering and consumption planning, cost estimation math, and the
//! order pipeline stage rules. The backend wraps these in transactional
//! services; everything here is deterministic and unit-testable in isolation.

pub mod costing;
pub mod fifo;
pub mod models;
pub mod pipeline;
pub mod types;
pub mod validation;

pub use costing::*;
pub use fifo::*;
pub use models::*;
pub use pipeline::*;
pub use types::*;
pub use validation::*;
