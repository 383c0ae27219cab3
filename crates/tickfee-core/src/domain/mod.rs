//! Domain types shared across the fetch, resolution, and reconciliation layers.

pub mod instant;
pub mod symbol;

pub use instant::{day_stamp, parse_day, UtcInstant};
pub use symbol::Symbol;
