//! Execution Venue Adapters
//!
//! - `http`: JSON-over-HTTP venue client
//! - `scripted`: queue-driven venue for tests and local runs

pub mod http;
pub mod scripted;

pub use http::HttpVenue;
pub use scripted::ScriptedVenue;
