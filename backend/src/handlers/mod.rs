//! HTTP handlers for the FarmGate API

pub mod booking;
pub mod collection;
pub mod health;
pub mod ledger;
pub mod pricing;
pub mod route;

pub use booking::*;
pub use collection::*;
pub use health::*;
pub use ledger::*;
pub use pricing::*;
pub use route::*;
