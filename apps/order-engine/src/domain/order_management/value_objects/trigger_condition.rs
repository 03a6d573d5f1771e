//! Price/schedule condition attached to an order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::OrderSide;
use crate::domain::shared::DomainError;

/// The condition that must hold before an order is dispatched.
///
/// OCO orders keep both legs on one condition so a single status
/// compare-and-swap decides which leg fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerCondition {
    /// Fire on the first evaluation (or when the recurrence schedule is due).
    Market,
    /// Buy when `p <= target_price`, sell when `p >= target_price`.
    Limit {
        /// Limit price.
        target_price: Decimal,
    },
    /// Sell when `p <= stop_price`, buy (breakout) when `p >= stop_price`.
    StopLoss {
        /// Stop price.
        stop_price: Decimal,
    },
    /// Sell when `p <= highest * (1 - trailing_percent / 100)`.
    TrailingStop {
        /// Gap below the observed peak, in percent.
        trailing_percent: Decimal,
    },
    /// One-cancels-other stop and take-profit legs.
    Oco {
        /// Stop leg price.
        stop_price: Decimal,
        /// Take-profit leg price.
        take_profit_price: Decimal,
    },
}

/// Classification of an order derived from its condition and recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancedType {
    /// Plain market or limit order.
    None,
    /// Stop-loss order.
    StopLoss,
    /// Trailing-stop order.
    TrailingStop,
    /// One-cancels-other pair.
    Oco,
    /// Recurring dollar-cost-averaging order.
    RecurringDca,
}

impl AdvancedType {
    /// Wire name of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::StopLoss => "stop_loss",
            Self::TrailingStop => "trailing_stop",
            Self::Oco => "oco",
            Self::RecurringDca => "recurring_dca",
        }
    }
}

impl TriggerCondition {
    /// Returns true if evaluating this condition needs a market price.
    #[must_use]
    pub const fn needs_price(&self) -> bool {
        !matches!(self, Self::Market)
    }

    /// Advanced type implied by the condition alone.
    #[must_use]
    pub const fn advanced_type(&self) -> AdvancedType {
        match self {
            Self::Market | Self::Limit { .. } => AdvancedType::None,
            Self::StopLoss { .. } => AdvancedType::StopLoss,
            Self::TrailingStop { .. } => AdvancedType::TrailingStop,
            Self::Oco { .. } => AdvancedType::Oco,
        }
    }

    /// Reference price forwarded to the venue, if the condition carries one.
    #[must_use]
    pub const fn reference_price(&self) -> Option<Decimal> {
        match self {
            Self::Limit { target_price } => Some(*target_price),
            Self::StopLoss { stop_price } => Some(*stop_price),
            Self::Market | Self::TrailingStop { .. } | Self::Oco { .. } => None,
        }
    }

    /// Validate the condition's parameters for the given side.
    ///
    /// # Errors
    ///
    /// Returns error if a price is not positive, the trailing percent is
    /// outside `(0, 100)`, a trailing stop is not a sell, or OCO legs are
    /// ordered the wrong way for the side.
    pub fn validate(&self, side: OrderSide) -> Result<(), DomainError> {
        match *self {
            Self::Market => Ok(()),
            Self::Limit { target_price } => positive("target_price", target_price),
            Self::StopLoss { stop_price } => positive("stop_price", stop_price),
            Self::TrailingStop { trailing_percent } => {
                if side != OrderSide::Sell {
                    return Err(DomainError::invalid(
                        "condition",
                        "trailing stops are sell-only",
                    ));
                }
                if trailing_percent <= Decimal::ZERO || trailing_percent >= Decimal::ONE_HUNDRED {
                    return Err(DomainError::invalid(
                        "trailing_percent",
                        "must be between 0 and 100 (exclusive)",
                    ));
                }
                Ok(())
            }
            Self::Oco {
                stop_price,
                take_profit_price,
            } => {
                positive("stop_price", stop_price)?;
                positive("take_profit_price", take_profit_price)?;
                let ordered = match side {
                    OrderSide::Sell => stop_price < take_profit_price,
                    OrderSide::Buy => take_profit_price < stop_price,
                };
                if !ordered {
                    return Err(DomainError::invalid(
                        "take_profit_price",
                        match side {
                            OrderSide::Sell => "sell OCO requires stop_price < take_profit_price",
                            OrderSide::Buy => "buy OCO requires take_profit_price < stop_price",
                        },
                    ));
                }
                Ok(())
            }
        }
    }
}

fn positive(field: &str, value: Decimal) -> Result<(), DomainError> {
    if value <= Decimal::ZERO {
        return Err(DomainError::invalid(field, "must be positive"));
    }
    Ok(())
}

impl fmt::Display for TriggerCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "market"),
            Self::Limit { target_price } => write!(f, "limit@{target_price}"),
            Self::StopLoss { stop_price } => write!(f, "stop_loss@{stop_price}"),
            Self::TrailingStop { trailing_percent } => {
                write!(f, "trailing_stop({trailing_percent}%)")
            }
            Self::Oco {
                stop_price,
                take_profit_price,
            } => write!(f, "oco(stop={stop_price}, take_profit={take_profit_price})"),
        }
    }
}
