//! HTTP/REST API adapter.
//!
//! Axum router exposing order submission, cancellation, queries and quota
//! administration.

mod controller;
mod request;
mod response;

pub use controller::{AppState, create_router};
pub use request::*;
pub use response::*;
