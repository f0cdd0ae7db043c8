use serde::{Deserialize, Serialize};

/// Lifecycle of a checkout order.
///
/// `created -> paid` and `created -> failed` are the transitions driven by
/// gateway confirmations. `refunded` is reachable only from `paid` and is
/// reserved for manual reconciliation - no inbound trigger produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Paid,
    Failed,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An order against the payment gateway, keyed by the gateway's order id.
///
/// After creation only status, the gateway payment id/signature, paid_at and
/// email_sent mutate. Once paid, repeated confirmation signals are no-ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub razorpay_order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_signature: Option<String>,
    /// Amount in paise
    pub amount: i64,
    pub status: OrderStatus,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    pub email_sent: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrder {
    pub user_id: String,
    pub razorpay_order_id: String,
    /// Amount in paise
    pub amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_order_status_round_trip() {
        for status in [
            OrderStatus::Created,
            OrderStatus::Paid,
            OrderStatus::Failed,
            OrderStatus::Refunded,
        ] {
            assert_eq!(OrderStatus::from_str(status.as_str()), Ok(status));
        }
        assert!(OrderStatus::from_str("captured").is_err());
    }
}
