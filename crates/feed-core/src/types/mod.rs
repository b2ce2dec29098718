//! Core data types flowing from the exchange adapters to the aggregator.

pub mod enums;
pub mod trade;

pub use enums::*;
pub use trade::*;
