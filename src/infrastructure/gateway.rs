use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::domain::errors::DomainError;
use crate::domain::ports::{GatewaySession, PaymentGatewayClient};

#[derive(Debug, Deserialize)]
struct GatewayOrderResponse {
    id: String,
}

/// HTTP client for the payment provider's order API.
///
/// Only called from `web::block` / worker threads, never on the async
/// reactor.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    http: reqwest::blocking::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>, key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build gateway HTTP client");
        HttpPaymentGateway {
            http,
            base_url: base_url.into(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }
}

impl PaymentGatewayClient for HttpPaymentGateway {
    fn create_payment_order(
        &self,
        amount_minor_units: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewaySession, DomainError> {
        let response = self
            .http
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": amount_minor_units,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .map_err(|e| DomainError::GatewayUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DomainError::GatewayUnavailable(format!(
                "gateway returned {}",
                response.status()
            )));
        }

        let body: GatewayOrderResponse = response
            .json()
            .map_err(|e| DomainError::GatewayUnavailable(format!("malformed gateway response: {e}")))?;

        Ok(GatewaySession {
            gateway_order_id: body.id,
            // The publishable key id is what the client-side checkout needs.
            client_token: self.key_id.clone(),
        })
    }
}
