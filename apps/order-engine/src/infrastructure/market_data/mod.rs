//! Market Data Adapters

pub mod http;
pub mod static_feed;

pub use http::HttpMarketData;
pub use static_feed::StaticPriceFeed;
