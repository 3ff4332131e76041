//! Shared types and models for the FarmGate collection and settlement platform
//!
//! This crate contains domain types shared between the backend and other
//! components of the system: entity status enums with their transition
//! tables, common value types, and the pure settlement arithmetic.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
