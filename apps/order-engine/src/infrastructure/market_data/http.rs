//! HTTP market data client.
//!
//! Reads `GET {base_url}/prices/{symbol}`, which answers
//! `{"symbol": "BTC", "price": "42000.5", "observed_at": "..."}`. A missing
//! `observed_at` is taken as the time the response arrived.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::ports::{MarketDataError, MarketDataPort};
use crate::config::MarketDataConfig;
use crate::domain::shared::{Symbol, Timestamp};
use crate::domain::triggers::PriceObservation;

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: Decimal,
    #[serde(default)]
    observed_at: Option<Timestamp>,
}

/// Market data feed reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpMarketData {
    client: Client,
    base_url: String,
}

impl HttpMarketData {
    /// Create a client from config.
    pub fn new(config: &MarketDataConfig) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| MarketDataError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MarketDataPort for HttpMarketData {
    async fn latest_price(&self, symbol: &Symbol) -> Result<PriceObservation, MarketDataError> {
        let url = format!("{}/prices/{}", self.base_url, symbol.as_str());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketDataError::Connection {
                message: e.to_string(),
            })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(MarketDataError::Unavailable {
                    symbol: symbol.to_string(),
                });
            }
            status => {
                return Err(MarketDataError::Connection {
                    message: format!("price feed answered {}", status.as_u16()),
                });
            }
        }

        let body: PriceResponse =
            response
                .json()
                .await
                .map_err(|e| MarketDataError::InvalidResponse {
                    message: e.to_string(),
                })?;

        if body.price <= Decimal::ZERO {
            return Err(MarketDataError::InvalidResponse {
                message: format!("non-positive price {} for {symbol}", body.price),
            });
        }

        Ok(PriceObservation::new(
            symbol.clone(),
            body.price,
            body.observed_at.unwrap_or_else(Timestamp::now),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed(server: &MockServer) -> HttpMarketData {
        HttpMarketData::new(&MarketDataConfig {
            base_url: server.uri(),
            timeout_ms: 2_000,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn reads_price_and_observation_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prices/BTC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbol": "BTC",
                "price": "42000.5",
                "observed_at": "2026-01-19T12:00:00Z"
            })))
            .mount(&server)
            .await;

        let observation = feed(&server)
            .latest_price(&Symbol::new("BTC"))
            .await
            .unwrap();

        assert_eq!(observation.price, dec!(42000.5));
        assert_eq!(
            observation.observed_at,
            Timestamp::parse("2026-01-19T12:00:00Z").unwrap()
        );
    }

    #[tokio::test]
    async fn not_found_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prices/DOGE"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = feed(&server)
            .latest_price(&Symbol::new("DOGE"))
            .await
            .unwrap_err();

        assert!(matches!(err, MarketDataError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn garbage_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prices/BTC"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = feed(&server)
            .latest_price(&Symbol::new("BTC"))
            .await
            .unwrap_err();

        assert!(matches!(err, MarketDataError::InvalidResponse { .. }));
    }
}
