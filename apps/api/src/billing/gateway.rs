//! Payment gateway boundary — pluggable, trait-based client for the
//! hosted payment provider.
//!
//! `AppState` holds an `Arc<dyn PaymentGateway>`; production wires in
//! `PaystackGateway`, tests substitute a mock. The contract is exactly
//! initialize(amount, reference) -> redirect URL and
//! verify(reference) -> settled status.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;

const PAYSTACK_BASE_URL: &str = "https://api.paystack.co";

/// Gateway-reported outcome of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Success,
    Failed,
    Cancelled,
    /// Still in flight at the gateway; nothing to record yet.
    Pending,
}

#[derive(Debug, Clone)]
pub struct InitializedPayment {
    pub reference: String,
    pub authorization_url: String,
}

#[derive(Debug, Clone)]
pub struct GatewayVerification {
    pub status: GatewayStatus,
    pub amount_cents: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Starts a checkout for `amount_cents` under our `reference`, returning
    /// the URL the user is redirected to.
    async fn initialize(
        &self,
        email: &str,
        amount_cents: i64,
        reference: &str,
    ) -> Result<InitializedPayment, AppError>;

    /// Asks the gateway for the settled outcome of `reference`.
    async fn verify(&self, reference: &str) -> Result<GatewayVerification, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PaystackGateway — production implementation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PaystackEnvelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PaystackInitData {
    authorization_url: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct PaystackVerifyData {
    status: String,
    amount: i64,
    currency: String,
}

pub struct PaystackGateway {
    client: Client,
    secret_key: String,
}

impl PaystackGateway {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            secret_key,
        }
    }

    async fn unwrap_envelope<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Payment(format!("Failed to read gateway response: {e}")))?;

        if !status.is_success() {
            return Err(AppError::Payment(format!(
                "Gateway returned {status}: {body}"
            )));
        }

        let envelope: PaystackEnvelope<T> = serde_json::from_str(&body)
            .map_err(|e| AppError::Payment(format!("Malformed gateway response: {e}")))?;

        if !envelope.status {
            return Err(AppError::Payment(envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| AppError::Payment("Gateway response missing data".to_string()))
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize(
        &self,
        email: &str,
        amount_cents: i64,
        reference: &str,
    ) -> Result<InitializedPayment, AppError> {
        let response = self
            .client
            .post(format!("{PAYSTACK_BASE_URL}/transaction/initialize"))
            .bearer_auth(&self.secret_key)
            .json(&serde_json::json!({
                "email": email,
                // Paystack amounts are in the currency's subunit.
                "amount": amount_cents,
                "reference": reference,
            }))
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Gateway unreachable: {e}")))?;

        let data: PaystackInitData = Self::unwrap_envelope(response).await?;
        debug!("Initialized payment {} at gateway", data.reference);

        Ok(InitializedPayment {
            reference: data.reference,
            authorization_url: data.authorization_url,
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification, AppError> {
        let response = self
            .client
            .get(format!("{PAYSTACK_BASE_URL}/transaction/verify/{reference}"))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Gateway unreachable: {e}")))?;

        let data: PaystackVerifyData = Self::unwrap_envelope(response).await?;

        Ok(GatewayVerification {
            status: parse_gateway_status(&data.status),
            amount_cents: data.amount,
            currency: data.currency,
        })
    }
}

/// Maps Paystack transaction states onto ours. "abandoned" is the gateway's
/// word for a checkout the user walked away from.
fn parse_gateway_status(raw: &str) -> GatewayStatus {
    match raw {
        "success" => GatewayStatus::Success,
        "failed" => GatewayStatus::Failed,
        "abandoned" => GatewayStatus::Cancelled,
        _ => GatewayStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gateway_status_success() {
        assert_eq!(parse_gateway_status("success"), GatewayStatus::Success);
    }

    #[test]
    fn test_parse_gateway_status_failed() {
        assert_eq!(parse_gateway_status("failed"), GatewayStatus::Failed);
    }

    #[test]
    fn test_parse_gateway_status_abandoned_is_cancelled() {
        assert_eq!(parse_gateway_status("abandoned"), GatewayStatus::Cancelled);
    }

    #[test]
    fn test_parse_gateway_status_unknown_is_pending() {
        assert_eq!(parse_gateway_status("ongoing"), GatewayStatus::Pending);
        assert_eq!(parse_gateway_status(""), GatewayStatus::Pending);
    }

    #[test]
    fn test_envelope_deserializes() {
        let json = r#"{
            "status": true,
            "message": "Verification successful",
            "data": {"status": "success", "amount": 500000, "currency": "NGN"}
        }"#;
        let envelope: PaystackEnvelope<PaystackVerifyData> = serde_json::from_str(json).unwrap();
        assert!(envelope.status);
        let data = envelope.data.unwrap();
        assert_eq!(data.amount, 500000);
        assert_eq!(data.status, "success");
    }
}
