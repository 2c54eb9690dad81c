pub mod cart_service;
pub mod catalog_service;
pub mod checkout_service;
pub mod order_service;
pub mod payment_service;
pub mod sales_service;
pub mod webhook_service;

use crate::domain::errors::DomainError;

/// Runs a blocking repository call on tokio's blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::Internal(format!("blocking task failed: {}", e)))?
}
