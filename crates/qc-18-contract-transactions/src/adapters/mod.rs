//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete implementations of the driven ports:
//! - `StateOverlay`: layered copy-on-write ledger view
//! - `InMemoryLedger`: persistent backend for tests and tooling
//! - `Secp256k1Verifier`: `k256` ECDSA verification
//! - `FixedFuelRate` / `FuelRateSchedule`: fuel price providers

pub mod fuel_rate;
pub mod memory_ledger;
pub mod overlay;
pub mod signature;

pub use fuel_rate::{FixedFuelRate, FuelRateSchedule};
pub use memory_ledger::InMemoryLedger;
pub use overlay::StateOverlay;
pub use signature::Secp256k1Verifier;
