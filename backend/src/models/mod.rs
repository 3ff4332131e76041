//! Database models for the FarmGate backend
//!
//! Re-exports models from the shared crate and adds backend-specific models

pub use shared::models::*;
