use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::ports::{GatewaySession, PaymentGatewayClient};

type HmacSha256 = Hmac<Sha256>;

/// Convert a decimal amount into the gateway's minor units:
/// `round(amount × 100)`.
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, DomainError> {
    (amount * BigDecimal::from(100))
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_i64()
        .ok_or_else(|| DomainError::Internal(format!("amount {amount} out of range for gateway")))
}

/// HMAC-SHA256 over `gateway_order_id + "|" + payment_id`, hex-encoded.
///
/// This is the signature the gateway attaches to payment confirmations; the
/// mock gateway in the test suite signs with the same function.
pub fn sign(secret: &str, gateway_order_id: &str, payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Gateway-facing half of the payment pipeline: creates gateway-side payment
/// orders and verifies confirmation signatures.
///
/// Verification is the sole trust boundary for "money has moved" — no other
/// code path may settle an order from a payment event.
#[derive(Clone)]
pub struct PaymentGatewayAdapter<G> {
    client: G,
    secret: String,
    currency: String,
}

impl<G: PaymentGatewayClient> PaymentGatewayAdapter<G> {
    pub fn new(client: G, secret: impl Into<String>, currency: impl Into<String>) -> Self {
        PaymentGatewayAdapter {
            client,
            secret: secret.into(),
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Create a gateway-side payment order for the order's current total.
    ///
    /// Legal only while the order may still be paid; anything settled or
    /// rejected is refused so payment cannot be re-initiated on it.
    pub fn initiate(&self, order: &Order) -> Result<GatewaySession, DomainError> {
        match order.status {
            OrderStatus::PendingApproval | OrderStatus::Approved | OrderStatus::PaymentPending => {}
            from => {
                return Err(DomainError::InvalidTransition {
                    from,
                    action: "initiate-payment",
                })
            }
        }
        let amount = to_minor_units(&order.total_amount)?;
        self.client
            .create_payment_order(amount, &self.currency, &order.id.to_string())
    }

    /// Constant-time check of a confirmation signature.
    ///
    /// Any failure collapses to [`DomainError::SignatureInvalid`]; the caller
    /// never learns which part of the check missed.
    pub fn verify(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), DomainError> {
        let supplied = hex::decode(signature).map_err(|_| DomainError::SignatureInvalid)?;
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| DomainError::Internal(format!("gateway secret unusable: {e}")))?;
        mac.update(gateway_order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        mac.verify_slice(&supplied)
            .map_err(|_| DomainError::SignatureInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use uuid::Uuid;

    struct NoGateway;

    impl PaymentGatewayClient for NoGateway {
        fn create_payment_order(
            &self,
            _amount_minor_units: i64,
            _currency: &str,
            _receipt: &str,
        ) -> Result<GatewaySession, DomainError> {
            panic!("gateway must not be called in these tests");
        }
    }

    fn adapter() -> PaymentGatewayAdapter<NoGateway> {
        PaymentGatewayAdapter::new(NoGateway, "test-secret", "INR")
    }

    #[test]
    fn valid_signature_verifies() {
        let sig = sign("test-secret", "order_abc", "pay_xyz");
        adapter().verify("order_abc", "pay_xyz", &sig).unwrap();
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let mut sig = sign("test-secret", "order_abc", "pay_xyz");
        // Flip one hex digit.
        let last = sig.pop().unwrap();
        sig.push(if last == '0' { '1' } else { '0' });
        let err = adapter().verify("order_abc", "pay_xyz", &sig).unwrap_err();
        assert!(matches!(err, DomainError::SignatureInvalid));
    }

    #[test]
    fn signature_for_other_payment_is_rejected() {
        let sig = sign("test-secret", "order_abc", "pay_other");
        let err = adapter().verify("order_abc", "pay_xyz", &sig).unwrap_err();
        assert!(matches!(err, DomainError::SignatureInvalid));
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        let err = adapter().verify("order_abc", "pay_xyz", "not hex!").unwrap_err();
        assert!(matches!(err, DomainError::SignatureInvalid));
    }

    #[test]
    fn initiate_refuses_settled_orders() {
        let mut order = Order::create(
            Uuid::new_v4(),
            false,
            false,
            BigDecimal::from(100),
            BigDecimal::from(0),
            None,
            None,
        );
        order.approve(Uuid::new_v4(), None).unwrap();
        order.note_payment_initiated("gw".into()).unwrap();
        order.confirm_payment("pay".into()).unwrap();
        let err = adapter().initiate(&order).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn minor_units_round_half_up() {
        let amount = BigDecimal::from_str("12.345").unwrap();
        assert_eq!(to_minor_units(&amount).unwrap(), 1235);
        let amount = BigDecimal::from_str("1700").unwrap();
        assert_eq!(to_minor_units(&amount).unwrap(), 170_000);
    }
}
