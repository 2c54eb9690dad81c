use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use super::catalog_service::reprice;
use super::run_blocking;
use crate::domain::cart::{Cart, PendingCheckout};
use crate::domain::errors::DomainError;
use crate::domain::order::{
    CartItem, Customer, Order, OrderDraft, OrderStatus, StatusChange, StatusEvidence,
    TransitionSource,
};
use crate::domain::payment::{IntentHandle, PaymentDetails, PaymentError, PaymentGateway};
use crate::domain::ports::{CartStore, Notifier, OrderRepository, ProductRepository};
use crate::domain::pricing::{compute_totals, PricingConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    Validating,
    PricingComputed,
    IntentCreated,
    Confirming,
    Succeeded,
    Declined,
    Failed,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer: Customer,
    pub payment_method: String,
    pub payment: PaymentDetails,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    AmountTooSmall { order_id: Uuid, message: String },
    #[error("Payment declined: {reason}")]
    Declined { order_id: Uuid, reason: String },
    #[error("Payment provider unavailable, please try again ({detail})")]
    Provider {
        order_id: Option<Uuid>,
        detail: String,
    },
    #[error("Order {order_id} is in an inconsistent state: {detail}")]
    Integrity { order_id: Uuid, detail: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    pub fn order_id(&self) -> Option<Uuid> {
        match self {
            CheckoutError::AmountTooSmall { order_id, .. }
            | CheckoutError::Declined { order_id, .. }
            | CheckoutError::Integrity { order_id, .. } => Some(*order_id),
            CheckoutError::Provider { order_id, .. } => *order_id,
            CheckoutError::Validation(_) | CheckoutError::Internal(_) => None,
        }
    }
}

impl From<DomainError> for CheckoutError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidInput(msg) | DomainError::InvalidCart(msg) => {
                CheckoutError::Validation(msg)
            }
            DomainError::InvalidTransition { order_id, from, to } => {
                log::error!(
                    "Checkout hit an invalid transition on order {}: {} -> {}",
                    order_id,
                    from,
                    to
                );
                CheckoutError::Integrity {
                    order_id,
                    detail: format!("cannot move from {} to {}", from, to),
                }
            }
            other => CheckoutError::Internal(other.to_string()),
        }
    }
}

/// How this attempt relates to a previous one recorded on the cart.
enum Attempt {
    Fresh,
    Resume {
        order: Order,
        intent: Option<IntentHandle>,
    },
    AlreadyPaid(Order),
}

/// Drives one checkout attempt from cart to paid (or failed) order.
pub struct CheckoutService {
    orders: Arc<dyn OrderRepository>,
    carts: Arc<dyn CartStore>,
    products: Arc<dyn ProductRepository>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    pricing: Arc<PricingConfig>,
    currency: String,
    confirm_timeout: Duration,
}

impl CheckoutService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        carts: Arc<dyn CartStore>,
        products: Arc<dyn ProductRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        pricing: Arc<PricingConfig>,
        currency: impl Into<String>,
        confirm_timeout: Duration,
    ) -> Self {
        Self {
            orders,
            carts,
            products,
            gateway,
            notifier,
            pricing,
            currency: currency.into(),
            confirm_timeout,
        }
    }

    pub async fn checkout(
        &self,
        session_id: &str,
        request: CheckoutRequest,
    ) -> Result<Order, CheckoutError> {
        enter(session_id, CheckoutStage::Validating);
        let cart = self.load_cart(session_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::Validation("cart is empty".to_string()));
        }
        let customer = request.customer.validated()?;
        let payment_method = request.payment_method.trim().to_string();
        if payment_method.is_empty() {
            return Err(CheckoutError::Validation(
                "missing required fields: payment_method".to_string(),
            ));
        }
        if request.payment.token.trim().is_empty() {
            return Err(CheckoutError::Validation(
                "missing payment details".to_string(),
            ));
        }

        let items = self.current_prices(&cart.items).await?;
        let totals = compute_totals(&items, &customer.country, &self.pricing)?;
        enter(session_id, CheckoutStage::PricingComputed);

        let (order, intent) = match self
            .resume(&cart, &items, &customer, &payment_method)
            .await?
        {
            Attempt::AlreadyPaid(order) => {
                log::info!(
                    "Order {} was already paid, completing checkout for session {}",
                    order.order_id,
                    session_id
                );
                self.clear_cart(session_id).await?;
                enter(session_id, CheckoutStage::Succeeded);
                return Ok(order);
            }
            Attempt::Resume { order, intent } => {
                log::info!("Resuming checkout with pending order {}", order.order_id);
                (order, intent)
            }
            Attempt::Fresh => {
                let orders = Arc::clone(&self.orders);
                let draft = OrderDraft {
                    order_id: None,
                    customer,
                    items,
                    totals,
                    currency: self.currency.clone(),
                    payment_method,
                };
                let order = run_blocking(move || orders.create(draft)).await?;
                self.remember(
                    session_id,
                    Some(PendingCheckout {
                        order_id: order.order_id,
                        intent: None,
                    }),
                )
                .await?;
                (order, None)
            }
        };

        let intent = match intent {
            Some(intent) => intent,
            None => self.create_intent(session_id, &order).await?,
        };
        enter(session_id, CheckoutStage::IntentCreated);

        enter(session_id, CheckoutStage::Confirming);
        let confirmation =
            tokio::time::timeout(self.confirm_timeout, self.gateway.confirm(&intent, &request.payment))
                .await
                .unwrap_or_else(|_| {
                    Err(PaymentError::Provider(format!(
                        "confirmation timed out after {} ms",
                        self.confirm_timeout.as_millis()
                    )))
                });

        let result = match confirmation {
            Ok(result) => result,
            Err(e) => {
                enter(session_id, CheckoutStage::Failed);
                log::warn!(
                    "Confirmation of order {} failed transiently: {}",
                    order.order_id,
                    e
                );
                return Err(CheckoutError::Provider {
                    order_id: Some(order.order_id),
                    detail: e.to_string(),
                });
            }
        };

        let mut evidence =
            StatusEvidence::new(TransitionSource::Checkout).with_intent(&intent.intent_id);

        if result.success {
            if let Some(payment_id) = result.provider_payment_id {
                evidence = evidence.with_provider_payment(payment_id);
            }
            let change = self
                .update_status(order.order_id, OrderStatus::Paid, evidence)
                .await?;
            self.clear_cart(session_id).await?;
            if change.was_applied() {
                self.notify(change.order());
            } else {
                log::info!(
                    "Order {} was already marked paid by the webhook",
                    order.order_id
                );
            }
            enter(session_id, CheckoutStage::Succeeded);
            return Ok(change.into_order());
        }

        let reason = result
            .failure_reason
            .unwrap_or_else(|| "payment declined".to_string());
        self.update_status(
            order.order_id,
            OrderStatus::Failed,
            evidence.with_failure(reason.clone()),
        )
        .await?;
        // Items stay in the cart; the next attempt starts a new order.
        self.remember(session_id, None).await?;
        enter(session_id, CheckoutStage::Declined);
        log::info!("Payment for order {} declined: {}", order.order_id, reason);
        Err(CheckoutError::Declined {
            order_id: order.order_id,
            reason,
        })
    }

    /// A pending order is only reused while items, prices, customer and
    /// payment method are unchanged.
    async fn resume(
        &self,
        cart: &Cart,
        items: &[CartItem],
        customer: &Customer,
        payment_method: &str,
    ) -> Result<Attempt, CheckoutError> {
        let Some(pending) = cart.pending_checkout.clone() else {
            return Ok(Attempt::Fresh);
        };
        let orders = Arc::clone(&self.orders);
        let found = run_blocking(move || orders.find_by_id(pending.order_id)).await?;

        let attempt = match found {
            Some(order)
                if order.items == items
                    && order.customer == *customer
                    && order.payment_method == payment_method =>
            {
                match order.status {
                    OrderStatus::Pending => Attempt::Resume {
                        order,
                        intent: pending.intent,
                    },
                    OrderStatus::Paid | OrderStatus::Fulfilled => Attempt::AlreadyPaid(order),
                    OrderStatus::Failed => Attempt::Fresh,
                }
            }
            _ => Attempt::Fresh,
        };
        Ok(attempt)
    }

    async fn create_intent(
        &self,
        session_id: &str,
        order: &Order,
    ) -> Result<IntentHandle, CheckoutError> {
        let mut metadata = BTreeMap::new();
        metadata.insert("order_id".to_string(), order.order_id.to_string());
        metadata.insert("customer_email".to_string(), order.customer.email.clone());

        match self
            .gateway
            .create_intent(&order.total, &order.currency, metadata)
            .await
        {
            Ok(intent) => {
                let orders = Arc::clone(&self.orders);
                let (order_id, intent_id) = (order.order_id, intent.intent_id.clone());
                run_blocking(move || orders.attach_intent(order_id, &intent_id)).await?;
                self.remember(
                    session_id,
                    Some(PendingCheckout {
                        order_id: order.order_id,
                        intent: Some(intent.clone()),
                    }),
                )
                .await?;
                Ok(intent)
            }
            Err(e @ PaymentError::AmountTooSmall { .. }) => {
                let message = e.to_string();
                self.update_status(
                    order.order_id,
                    OrderStatus::Failed,
                    StatusEvidence::new(TransitionSource::Checkout).with_failure(&message),
                )
                .await?;
                self.remember(session_id, None).await?;
                enter(session_id, CheckoutStage::Failed);
                Err(CheckoutError::AmountTooSmall {
                    order_id: order.order_id,
                    message,
                })
            }
            Err(PaymentError::Provider(detail)) => {
                enter(session_id, CheckoutStage::Failed);
                log::warn!(
                    "Could not create intent for order {}: {}",
                    order.order_id,
                    detail
                );
                Err(CheckoutError::Provider {
                    order_id: Some(order.order_id),
                    detail,
                })
            }
        }
    }

    async fn current_prices(&self, items: &[CartItem]) -> Result<Vec<CartItem>, DomainError> {
        let products = Arc::clone(&self.products);
        let items = items.to_vec();
        run_blocking(move || reprice(products.as_ref(), &items)).await
    }

    fn notify(&self, order: &Order) {
        if let Err(e) = self.notifier.order_confirmed(order, &order.customer.email) {
            log::warn!("Confirmation for order {} not sent: {}", order.order_id, e);
        }
    }

    async fn load_cart(&self, session_id: &str) -> Result<Cart, DomainError> {
        let carts = Arc::clone(&self.carts);
        let session_id = session_id.to_string();
        run_blocking(move || carts.get(&session_id)).await
    }

    async fn clear_cart(&self, session_id: &str) -> Result<(), DomainError> {
        let carts = Arc::clone(&self.carts);
        let session_id = session_id.to_string();
        run_blocking(move || carts.clear(&session_id)).await
    }

    /// Re-reads the cart so concurrent item edits are not lost.
    async fn remember(
        &self,
        session_id: &str,
        pending: Option<PendingCheckout>,
    ) -> Result<(), DomainError> {
        let carts = Arc::clone(&self.carts);
        let session_id = session_id.to_string();
        run_blocking(move || {
            let mut cart = carts.get(&session_id)?;
            cart.pending_checkout = pending;
            carts.set(&cart)
        })
        .await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        evidence: StatusEvidence,
    ) -> Result<StatusChange, DomainError> {
        let orders = Arc::clone(&self.orders);
        run_blocking(move || orders.update_status(id, status, evidence)).await
    }
}

fn enter(session_id: &str, stage: CheckoutStage) {
    log::debug!("checkout [{}] -> {:?}", session_id, stage);
}
