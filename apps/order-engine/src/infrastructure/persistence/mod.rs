//! Persistence Adapters
//!
//! In-process implementations of the order and quota ledger traits.

pub mod in_memory;
pub mod in_memory_quota;

pub use in_memory::InMemoryOrderLedger;
pub use in_memory_quota::InMemoryQuotaLedger;
