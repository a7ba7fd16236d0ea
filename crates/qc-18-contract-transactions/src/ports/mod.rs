//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for contract transaction processing.
//!
//! - **Driving Ports (Inbound)**: `ContractTxApi`
//! - **Driven Ports (Outbound)**: `AccountStore`, `ContractStore`,
//!   `LedgerBackend`, `FuelRateProvider`, `SignatureVerifier`, `VmAdapter`

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
