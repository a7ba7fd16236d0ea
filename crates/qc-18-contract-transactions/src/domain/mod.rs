//! # Domain Layer (Inner Hexagon)
//!
//! Pure ledger logic for contract transactions.
//! NO I/O, NO storage access beyond the port traits passed in.

pub mod entities;
pub mod fuel;
pub mod identity;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use identity::*;
pub use value_objects::*;
