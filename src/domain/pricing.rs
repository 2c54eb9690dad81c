//! Cart pricing: subtotal, shipping, tax and total.
//!
//! Shipping is looked up per destination country, waived for the free-shipping
//! country once the subtotal reaches the threshold, and then taxed together
//! with the subtotal. Rounding to cents happens once, on the total; the
//! reported tax is whatever remains of the total after subtotal and shipping.

use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use serde::Serialize;
use utoipa::ToSchema;

use super::errors::DomainError;
use super::order::CartItem;

pub const MONEY_SCALE: i64 = 2;

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub shipping_rates: HashMap<String, BigDecimal>,
    pub default_shipping_rate: BigDecimal,
    pub free_shipping_country: String,
    pub free_shipping_threshold: BigDecimal,
    pub tax_rate: BigDecimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let rate = |s: &str| BigDecimal::from_str(s).unwrap_or_default();
        let shipping_rates = [
            ("FR", "5.99"),
            ("BE", "8.99"),
            ("CH", "8.99"),
            ("CA", "15.99"),
            ("US", "15.99"),
        ]
        .into_iter()
        .map(|(country, r)| (country.to_string(), rate(r)))
        .collect();

        Self {
            shipping_rates,
            default_shipping_rate: rate("5.99"),
            free_shipping_country: "FR".to_string(),
            free_shipping_threshold: rate("50.00"),
            tax_rate: rate("0.20"),
        }
    }
}

impl PricingConfig {
    pub fn shipping_for(&self, subtotal: &BigDecimal, country: &str) -> BigDecimal {
        let country = country.trim().to_uppercase();
        if country == self.free_shipping_country && *subtotal >= self.free_shipping_threshold {
            return BigDecimal::zero();
        }
        self.shipping_rates
            .get(&country)
            .unwrap_or(&self.default_shipping_rate)
            .clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Totals {
    #[schema(value_type = String)]
    pub subtotal: BigDecimal,
    #[schema(value_type = String)]
    pub shipping: BigDecimal,
    #[schema(value_type = String)]
    pub tax: BigDecimal,
    #[schema(value_type = String)]
    pub total: BigDecimal,
}

/// Checks that a cart line can be priced: positive quantity, non-negative
/// price expressed in whole cents.
pub fn validate_item(item: &CartItem) -> Result<(), DomainError> {
    if item.quantity <= 0 {
        return Err(DomainError::InvalidCart(format!(
            "quantity for product '{}' must be positive, got {}",
            item.product_id, item.quantity
        )));
    }
    if item.unit_price < BigDecimal::zero() {
        return Err(DomainError::InvalidCart(format!(
            "unit price for product '{}' must not be negative",
            item.product_id
        )));
    }
    if item.unit_price.with_scale(MONEY_SCALE) != item.unit_price {
        return Err(DomainError::InvalidCart(format!(
            "unit price for product '{}' has more than two decimal places",
            item.product_id
        )));
    }
    Ok(())
}

pub fn compute_totals(
    items: &[CartItem],
    country: &str,
    config: &PricingConfig,
) -> Result<Totals, DomainError> {
    if items.is_empty() {
        return Err(DomainError::InvalidCart("cart is empty".to_string()));
    }
    for item in items {
        validate_item(item)?;
    }

    let subtotal = items
        .iter()
        .fold(BigDecimal::zero(), |acc, item| acc + item.line_total())
        .with_scale(MONEY_SCALE);
    let shipping = config
        .shipping_for(&subtotal, country)
        .with_scale(MONEY_SCALE);
    let raw_tax = (&subtotal + &shipping) * &config.tax_rate;
    let total =
        (&subtotal + &shipping + raw_tax).with_scale_round(MONEY_SCALE, RoundingMode::HalfUp);
    let tax = (&total - &subtotal - &shipping).with_scale(MONEY_SCALE);

    Ok(Totals {
        subtotal,
        shipping,
        tax,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn item(id: &str, price: &str, quantity: i32) -> CartItem {
        CartItem {
            product_id: id.to_string(),
            name: format!("Product {}", id),
            unit_price: dec(price),
            quantity,
        }
    }

    #[test]
    fn single_item_to_france_pays_standard_shipping() {
        let totals =
            compute_totals(&[item("1", "25.99", 1)], "FR", &PricingConfig::default()).unwrap();
        assert_eq!(totals.subtotal, dec("25.99"));
        assert_eq!(totals.shipping, dec("5.99"));
        assert_eq!(totals.tax, dec("6.40"));
        assert_eq!(totals.total, dec("38.38"));
    }

    #[test]
    fn france_over_threshold_ships_free() {
        let totals =
            compute_totals(&[item("1", "26.00", 2)], "FR", &PricingConfig::default()).unwrap();
        assert_eq!(totals.subtotal, dec("52.00"));
        assert_eq!(totals.shipping, dec("0"));
        assert_eq!(totals.tax, dec("10.40"));
        assert_eq!(totals.total, dec("62.40"));
    }

    #[test]
    fn threshold_is_inclusive() {
        let config = PricingConfig::default();
        let at = compute_totals(&[item("1", "50.00", 1)], "FR", &config).unwrap();
        assert_eq!(at.shipping, dec("0"));

        let below = compute_totals(&[item("1", "49.99", 1)], "FR", &config).unwrap();
        assert_eq!(below.shipping, dec("5.99"));
    }

    #[test]
    fn free_shipping_only_applies_to_designated_country() {
        let totals =
            compute_totals(&[item("1", "80.00", 1)], "BE", &PricingConfig::default()).unwrap();
        assert_eq!(totals.shipping, dec("8.99"));
    }

    #[test]
    fn unknown_country_uses_default_rate() {
        let totals =
            compute_totals(&[item("1", "10.00", 1)], "JP", &PricingConfig::default()).unwrap();
        assert_eq!(totals.shipping, dec("5.99"));
    }

    #[test]
    fn country_lookup_is_case_insensitive() {
        let config = PricingConfig::default();
        let lower = compute_totals(&[item("1", "10.00", 1)], "us", &config).unwrap();
        assert_eq!(lower.shipping, dec("15.99"));
    }

    #[test]
    fn total_is_the_sum_of_parts() {
        let config = PricingConfig::default();
        for (price, qty, country) in [
            ("0.01", 1, "FR"),
            ("19.99", 3, "CH"),
            ("33.33", 1, "US"),
            ("0.00", 4, "XX"),
            ("49.99", 1, "FR"),
        ] {
            let t = compute_totals(&[item("p", price, qty)], country, &config).unwrap();
            assert_eq!(&t.subtotal + &t.shipping + &t.tax, t.total);
            assert!(t.total >= t.subtotal);
        }
    }

    #[test]
    fn computation_is_deterministic() {
        let config = PricingConfig::default();
        let items = [item("1", "12.34", 3), item("2", "0.99", 7)];
        let first = compute_totals(&items, "CA", &config).unwrap();
        let second = compute_totals(&items, "CA", &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_empty_cart() {
        let err = compute_totals(&[], "FR", &PricingConfig::default()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidCart(_)));
    }

    #[test]
    fn rejects_non_positive_quantity_and_negative_price() {
        let config = PricingConfig::default();
        assert!(compute_totals(&[item("1", "10.00", 0)], "FR", &config).is_err());
        assert!(compute_totals(&[item("1", "-1.00", 1)], "FR", &config).is_err());
    }

    #[test]
    fn rejects_sub_cent_prices() {
        let err =
            compute_totals(&[item("1", "1.005", 1)], "FR", &PricingConfig::default()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidCart(_)));
    }

    #[test]
    fn custom_tax_rate_and_table_are_honoured() {
        let mut config = PricingConfig::default();
        config.tax_rate = dec("0.10");
        config.shipping_rates.insert("DE".to_string(), dec("7.00"));
        let t = compute_totals(&[item("1", "10.00", 1)], "DE", &config).unwrap();
        assert_eq!(t.shipping, dec("7.00"));
        assert_eq!(t.tax, dec("1.70"));
        assert_eq!(t.total, dec("18.70"));
    }
}
