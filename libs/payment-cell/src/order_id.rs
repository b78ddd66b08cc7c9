use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use shared_models::AppointmentId;

use crate::models::PaymentError;

static ORDER_ID_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^ORDER_(\d+)_(\d+)$").ok());

/// Gateway order reference: `ORDER_<appointmentId>_<epochMillis>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderId {
    pub appointment_id: AppointmentId,
    pub issued_at_millis: i64,
}

impl OrderId {
    pub fn new(appointment_id: AppointmentId, issued_at_millis: i64) -> Self {
        Self { appointment_id, issued_at_millis }
    }

    pub fn parse(raw: &str) -> Result<Self, PaymentError> {
        let invalid = || PaymentError::InvalidOrderId(raw.to_string());

        let pattern = ORDER_ID_PATTERN.as_ref().ok_or_else(invalid)?;
        let captures = pattern.captures(raw.trim()).ok_or_else(invalid)?;

        let appointment_id = captures[1].parse().map_err(|_| invalid())?;
        let issued_at_millis = captures[2].parse().map_err(|_| invalid())?;

        Ok(Self { appointment_id, issued_at_millis })
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ORDER_{}_{}", self.appointment_id, self.issued_at_millis)
    }
}

impl FromStr for OrderId {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_extracts_appointment_id() {
        let order = OrderId::parse("ORDER_42_1700000000000").unwrap();
        assert_eq!(order.appointment_id, 42);
        assert_eq!(order.issued_at_millis, 1_700_000_000_000);
    }

    #[test]
    fn test_display_matches_wire_format() {
        assert_eq!(OrderId::new(5, 1769372867357).to_string(), "ORDER_5_1769372867357");
    }

    #[test]
    fn test_rejects_malformed_ids() {
        for raw in ["", "ORDER_", "ORDER_abc_1", "ORDER_5", "order_5_1", "ORDER_5_1_2", "ORDER_-5_1",
                    "ORDER_99999999999999999999_1"] {
            assert_matches!(OrderId::parse(raw), Err(PaymentError::InvalidOrderId(_)), "{raw}");
        }
    }
}
