//! Status enums for orders.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a persisted order.
///
/// Orders are created as [`OrderStatus::Processed`]. The only transition is
/// a customer-initiated return, which moves the order to
/// [`OrderStatus::ReturnInitiated`] exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Processed,
    ReturnInitiated,
}

impl OrderStatus {
    /// Whether a return may be started from this status.
    #[must_use]
    pub const fn can_initiate_return(self) -> bool {
        matches!(self, Self::Processed)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processed => write!(f, "processed"),
            Self::ReturnInitiated => write!(f, "return_initiated"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(Self::Processed),
            "return_initiated" => Ok(Self::ReturnInitiated),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
