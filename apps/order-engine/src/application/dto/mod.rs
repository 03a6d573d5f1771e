//! Data Transfer Objects (DTOs)
//!
//! DTOs are used for API boundaries and use case inputs/outputs.

mod limit_dto;
mod order_dto;

pub use limit_dto::OrderLimitDto;
pub use order_dto::{ExecutionDto, OrderDto};
