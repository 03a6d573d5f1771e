//! Application Ports (Driven)
//!
//! Interfaces the engine uses to reach external collaborators. Ledger
//! traits live with their aggregates in the domain layer.

mod market_data_port;
mod venue_port;

pub use market_data_port::{MarketDataError, MarketDataPort};
pub use venue_port::{ExecutionVenuePort, VenueError, VenueOrderRequest};
