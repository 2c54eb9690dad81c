use crate::domain::errors::DomainError;
use crate::domain::order::Order;
use crate::domain::ports::Notifier;

/// Writes the confirmation to the log instead of sending mail.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn order_confirmed(&self, order: &Order, email: &str) -> Result<(), DomainError> {
        let lines: Vec<String> = order
            .items
            .iter()
            .map(|i| format!("{} x{} @ {}", i.name, i.quantity, i.unit_price))
            .collect();
        log::info!(
            "Confirmation for order {} sent to {} ({} {}): {}",
            order.order_id,
            email,
            order.total,
            order.currency.to_uppercase(),
            lines.join(", ")
        );
        Ok(())
    }
}
