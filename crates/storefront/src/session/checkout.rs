//! Checkout session: cart to order conversion and optional manual payment.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

use epcc_storefront_core::{CartId, CheckoutRequest};

use super::SessionError;
use crate::epcc::{EpccClient, Order, PaymentTransaction};
use crate::storage::{self, SessionStore, keys};

/// Where a [`CheckoutSession`] is in its lifecycle.
///
/// `Idle -> Submitting -> Complete | Failed`. `Complete` holds until
/// [`CheckoutSession::clear`]; `Failed` may be resubmitted. A submission
/// whose future is dropped leaves the phase it started from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    #[default]
    Idle,
    Submitting,
    Complete,
    Failed,
}

/// A placed order and, when manual payment is enabled, its transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedOrder {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_transaction: Option<PaymentTransaction>,
}

#[derive(Debug, Default)]
struct CheckoutState {
    /// Last settled phase; `Submitting` is derived from the in-flight lock.
    phase: CheckoutPhase,
    order: Option<CompletedOrder>,
    error: Option<String>,
}

/// Point-in-time view of a [`CheckoutSession`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckoutSnapshot {
    pub phase: CheckoutPhase,
    pub loading: bool,
    pub is_complete: bool,
    pub order: Option<CompletedOrder>,
    pub error: Option<String>,
}

/// Converts the shopper's cart into an order.
pub struct CheckoutSession {
    client: EpccClient,
    store: Arc<dyn SessionStore>,
    state: RwLock<CheckoutState>,
    in_flight: Mutex<()>,
}

impl CheckoutSession {
    #[must_use]
    pub fn new(client: EpccClient, store: Arc<dyn SessionStore>) -> Self {
        Self {
            client,
            store,
            state: RwLock::new(CheckoutState::default()),
            in_flight: Mutex::new(()),
        }
    }

    /// Place an order for the persisted cart.
    ///
    /// On success the persisted cart ID is removed so the next cart refresh
    /// starts a new cart. If payment fails the order remains unpaid and the
    /// cart ID is kept.
    ///
    /// # Errors
    ///
    /// - `CheckoutComplete` / `CheckoutInProgress` if the session is not
    ///   ready for a new submission
    /// - `InvalidCheckout` if a required field is missing
    /// - `NoCartToCheckout` if no cart ID is persisted (no request is sent)
    /// - `OrderCreationFailed` if EPCC returns no order ID
    /// - `PaymentFailed` if the manual payment returns no transaction
    #[instrument(skip(self, request))]
    pub async fn submit(&self, request: CheckoutRequest) -> Result<CompletedOrder, SessionError> {
        let Ok(_submitting) = self.in_flight.try_lock() else {
            return Err(SessionError::CheckoutInProgress);
        };
        {
            let mut state = self.state.write().await;
            if state.phase == CheckoutPhase::Complete {
                return Err(SessionError::CheckoutComplete);
            }
            state.error = None;
        }

        let result = self.place_order(&request).await;

        let mut state = self.state.write().await;
        match &result {
            Ok(completed) => {
                state.phase = CheckoutPhase::Complete;
                state.order = Some(completed.clone());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Checkout failed");
                state.phase = CheckoutPhase::Failed;
                state.error = Some(e.to_string());
            }
        }
        result
    }

    async fn place_order(&self, request: &CheckoutRequest) -> Result<CompletedOrder, SessionError> {
        request.validate()?;

        let cart_id: CartId = storage::load(self.store.as_ref(), keys::CART_ID)
            .await?
            .ok_or(SessionError::NoCartToCheckout)?;

        let order = self.client.checkout(&cart_id, request).await?;
        let Some((order, order_id)) = order.and_then(|o| o.id.clone().map(|id| (o, id))) else {
            return Err(SessionError::OrderCreationFailed);
        };
        tracing::info!(order_id = %order_id, cart_id = %cart_id, "Order created");

        let payment_transaction = if self.client.manual_payment() {
            let transaction = self
                .client
                .pay_manual(&order_id)
                .await?
                .ok_or(SessionError::PaymentFailed {
                    order_id: order_id.clone(),
                })?;
            tracing::info!(order_id = %order_id, transaction_id = %transaction.id, "Order paid");
            Some(transaction)
        } else {
            None
        };

        self.store.remove(keys::CART_ID).await?;

        Ok(CompletedOrder {
            order,
            payment_transaction,
        })
    }

    /// Reset local state to `Idle`. Persisted data is untouched.
    pub async fn clear(&self) {
        *self.state.write().await = CheckoutState::default();
    }

    pub async fn phase(&self) -> CheckoutPhase {
        let settled = self.state.read().await.phase;
        self.effective_phase(settled)
    }

    pub async fn is_complete(&self) -> bool {
        self.phase().await == CheckoutPhase::Complete
    }

    pub async fn order(&self) -> Option<CompletedOrder> {
        self.state.read().await.order.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn snapshot(&self) -> CheckoutSnapshot {
        let state = self.state.read().await;
        let phase = self.effective_phase(state.phase);
        CheckoutSnapshot {
            phase,
            loading: phase == CheckoutPhase::Submitting,
            is_complete: phase == CheckoutPhase::Complete,
            order: state.order.clone(),
            error: state.error.clone(),
        }
    }

    fn effective_phase(&self, settled: CheckoutPhase) -> CheckoutPhase {
        if self.in_flight.try_lock().is_err() {
            CheckoutPhase::Submitting
        } else {
            settled
        }
    }
}

impl std::fmt::Debug for CheckoutSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutSession").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use epcc_storefront_core::{Address, Email};
    use serde_json::json;
    use tokio::time::{sleep, timeout};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::EpccConfig;
    use crate::storage::MemoryStore;

    fn request() -> CheckoutRequest {
        CheckoutRequest::shipping_to_billing(
            Email::parse("ron@pawnee.gov").unwrap(),
            Address {
                first_name: "Ron".to_string(),
                last_name: "Swanson".to_string(),
                line_1: "1 Cabin Rd".to_string(),
                city: "Pawnee".to_string(),
                county: Some("Wamapoke".to_string()),
                postcode: "47998".to_string(),
                country: "US".to_string(),
                ..Address::default()
            },
        )
    }

    async fn session(server: &MockServer, manual_payment: bool) -> (CheckoutSession, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                keys::CREDENTIALS,
                json!({"access_token": "tok", "expires": Utc::now().timestamp() + 3600}),
            )
            .await
            .unwrap();
        store.set(keys::CART_ID, json!("cart-1")).await.unwrap();

        let config = EpccConfig::new(server.uri(), "client-abc").with_manual_payment(manual_payment);
        let client = EpccClient::new(config, store.clone());
        (CheckoutSession::new(client, store.clone()), store)
    }

    async fn mount_checkout(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/v2/carts/cart-1/checkout"))
            .respond_with(ResponseTemplate::new(201).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_complete_rejects_resubmission_until_cleared() {
        let server = MockServer::start().await;
        mount_checkout(&server, json!({"data": {"id": "order-1", "type": "order"}})).await;

        let (session, store) = session(&server, false).await;
        let completed = session.submit(request()).await.unwrap();
        assert_eq!(completed.order.id.unwrap().as_str(), "order-1");
        assert!(completed.payment_transaction.is_none());
        assert!(session.is_complete().await);
        assert!(store.get(keys::CART_ID).await.unwrap().is_none());

        let err = session.submit(request()).await.unwrap_err();
        assert!(matches!(err, SessionError::CheckoutComplete));
        assert!(session.is_complete().await);

        session.clear().await;
        assert_eq!(session.phase().await, CheckoutPhase::Idle);
        assert!(session.order().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_order_id_fails() {
        let server = MockServer::start().await;
        mount_checkout(&server, json!({"data": {"type": "order"}})).await;

        let (session, store) = session(&server, false).await;
        let err = session.submit(request()).await.unwrap_err();
        assert!(matches!(err, SessionError::OrderCreationFailed));
        assert_eq!(session.phase().await, CheckoutPhase::Failed);
        assert_eq!(session.error().await.as_deref(), Some("Failed to create order"));
        assert!(store.get(keys::CART_ID).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_manual_payment_recorded() {
        let server = MockServer::start().await;
        mount_checkout(&server, json!({"data": {"id": "order-1"}})).await;
        Mock::given(method("POST"))
            .and(path("/v2/orders/order-1/payments"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"data": {"id": "txn-1"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (session, _) = session(&server, true).await;
        let completed = session.submit(request()).await.unwrap();
        assert_eq!(completed.payment_transaction.unwrap().id.as_str(), "txn-1");
    }

    #[tokio::test]
    async fn test_missing_payment_data_keeps_cart_and_allows_retry() {
        let server = MockServer::start().await;
        mount_checkout(&server, json!({"data": {"id": "order-1"}})).await;
        Mock::given(method("POST"))
            .and(path("/v2/orders/order-1/payments"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .mount(&server)
            .await;

        let (session, store) = session(&server, true).await;
        let err = session.submit(request()).await.unwrap_err();
        assert!(
            matches!(err, SessionError::PaymentFailed { ref order_id } if order_id.as_str() == "order-1")
        );
        assert!(store.get(keys::CART_ID).await.unwrap().is_some());

        // Failed sessions accept another submission
        let again = session.submit(request()).await.unwrap_err();
        assert!(matches!(again, SessionError::PaymentFailed { .. }));
    }

    #[tokio::test]
    async fn test_invalid_request_sends_nothing() {
        let server = MockServer::start().await;
        let (session, _) = session(&server, false).await;

        let mut bad = request();
        bad.billing_address.city = String::new();
        let err = session.submit(bad).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidCheckout(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_interrupted_submit_can_be_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/carts/cart-1/checkout"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"data": {"id": "order-1"}}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let (session, _) = session(&server, false).await;

        let interrupted = timeout(Duration::from_millis(50), session.submit(request())).await;
        assert!(interrupted.is_err());
        assert_eq!(session.phase().await, CheckoutPhase::Idle);

        let completed = session.submit(request()).await.unwrap();
        assert_eq!(completed.order.id.unwrap().as_str(), "order-1");
        assert!(session.is_complete().await);
    }

    #[tokio::test]
    async fn test_concurrent_submit_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/carts/cart-1/checkout"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"data": {"id": "order-1"}}))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (session, _) = session(&server, false).await;

        let (first, (second, during)) = tokio::join!(session.submit(request()), async {
            sleep(Duration::from_millis(30)).await;
            let during = session.snapshot().await;
            (session.submit(request()).await, during)
        });

        first.unwrap();
        assert!(matches!(second, Err(SessionError::CheckoutInProgress)));
        assert_eq!(during.phase, CheckoutPhase::Submitting);
        assert!(during.loading);
        assert_eq!(session.phase().await, CheckoutPhase::Complete);
    }
}
