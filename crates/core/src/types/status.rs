//! Status enums for orders and payments.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order as understood by the order backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Payment reported by the customer, awaiting verification.
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Processing => write!(f, "processing"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// How the customer paid.
///
/// Unknown values coming from checkout storage deserialize to [`PaymentMethod::Other`]
/// rather than failing the whole payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Upi,
    Card,
    NetBanking,
    Cod,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upi => write!(f, "upi"),
            Self::Card => write!(f, "card"),
            Self::NetBanking => write!(f, "net_banking"),
            Self::Cod => write!(f, "cod"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upi" => Ok(Self::Upi),
            "card" => Ok(Self::Card),
            "net_banking" | "netbanking" => Ok(Self::NetBanking),
            "cod" => Ok(Self::Cod),
            "" => Err("empty payment method".to_string()),
            _ => Ok(Self::Other),
        }
    }
}

/// Where a locally recorded order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    /// Freshly created by the order backend.
    Created,
    /// The backend already had an order for this payment and returned it.
    Existing,
    /// Backend unreachable; the record was synthesized in the storefront.
    LocalFallback,
}

impl OrderSource {
    /// Whether the order backend knows about this order.
    #[must_use]
    pub const fn is_server_backed(self) -> bool {
        matches!(self, Self::Created | Self::Existing)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_unknown_value() {
        let method: PaymentMethod = serde_json::from_str("\"wallet\"").unwrap();
        assert_eq!(method, PaymentMethod::Other);
    }

    #[test]
    fn test_payment_method_from_str() {
        assert_eq!("UPI".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert_eq!(
            "netbanking".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::NetBanking
        );
        assert!("  ".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_order_source_server_backed() {
        assert!(OrderSource::Created.is_server_backed());
        assert!(OrderSource::Existing.is_server_backed());
        assert!(!OrderSource::LocalFallback.is_server_backed());
    }
}
