//! Infrastructure Layer
//!
//! Adapters for the ports and ledger traits, following hexagonal
//! architecture:
//!
//! - **Driven Adapters (Outbound)**
//!   - `persistence/`: in-memory order and quota ledgers
//!   - `venue/`: HTTP and scripted execution venues
//!   - `market_data/`: HTTP and static price feeds
//!
//! - **Driver Adapters (Inbound)**
//!   - `http/`: REST API controllers

pub mod http;
pub mod market_data;
pub mod persistence;
pub mod venue;
