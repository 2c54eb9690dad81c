use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use bigdecimal::{BigDecimal, Zero};
use thiserror::Error;

use crate::domain::pricing::PricingConfig;
use crate::infrastructure::stripe::DEFAULT_API_BASE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Without a database the service runs on in-memory stores.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Without a key payments go through the sandbox gateway.
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_api_base: String,
    pub payment_timeout: Duration,
    pub currency: String,
    pub min_payment_amount: BigDecimal,
    pub pricing: PricingConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = PricingConfig::default();

        let port: u16 = match var("PORT") {
            Some(v) => v.parse().map_err(|_| invalid("PORT", "a port number", &v))?,
            None => 8080,
        };
        let payment_timeout = match var("PAYMENT_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(
                v.parse::<u64>()
                    .map_err(|_| invalid("PAYMENT_TIMEOUT_MS", "a number of milliseconds", &v))?,
            ),
            None => Duration::from_secs(10),
        };

        let shipping_rates = match var("SHIPPING_RATES") {
            Some(v) => parse_rates(&v)?,
            None => defaults.shipping_rates,
        };
        let pricing = PricingConfig {
            shipping_rates,
            default_shipping_rate: decimal(var("DEFAULT_SHIPPING_RATE"), "DEFAULT_SHIPPING_RATE")?
                .unwrap_or(defaults.default_shipping_rate),
            free_shipping_country: var("FREE_SHIPPING_COUNTRY")
                .map(|c| c.to_uppercase())
                .unwrap_or(defaults.free_shipping_country),
            free_shipping_threshold: decimal(
                var("FREE_SHIPPING_THRESHOLD"),
                "FREE_SHIPPING_THRESHOLD",
            )?
            .unwrap_or(defaults.free_shipping_threshold),
            tax_rate: decimal(var("TAX_RATE"), "TAX_RATE")?.unwrap_or(defaults.tax_rate),
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            stripe_secret_key: var("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: var("STRIPE_WEBHOOK_SECRET"),
            stripe_api_base: var("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            payment_timeout,
            currency: var("CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|| "eur".to_string()),
            min_payment_amount: decimal(var("MIN_PAYMENT_AMOUNT"), "MIN_PAYMENT_AMOUNT")?
                .unwrap_or_else(|| BigDecimal::from_str("0.50").unwrap_or_default()),
            pricing,
        })
    }
}

fn invalid(key: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        expected,
        value: value.to_string(),
    }
}

fn decimal(value: Option<String>, key: &'static str) -> Result<Option<BigDecimal>, ConfigError> {
    value
        .map(|v| match BigDecimal::from_str(&v) {
            Ok(d) if d >= BigDecimal::zero() => Ok(d),
            _ => Err(invalid(key, "a non-negative decimal", &v)),
        })
        .transpose()
}

/// Parses `"FR=5.99,BE=8.99"`.
fn parse_rates(value: &str) -> Result<HashMap<String, BigDecimal>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (country, rate) = entry
                .split_once('=')
                .ok_or_else(|| invalid("SHIPPING_RATES", "a list of COUNTRY=RATE", value))?;
            let rate = decimal(Some(rate.trim().to_string()), "SHIPPING_RATES")?
                .ok_or_else(|| invalid("SHIPPING_RATES", "a list of COUNTRY=RATE", value))?;
            Ok((country.trim().to_uppercase(), rate))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_the_storefront() {
        let cfg = config(&[]).unwrap();
        assert!(cfg.database_url.is_none());
        assert!(cfg.stripe_secret_key.is_none());
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.currency, "eur");
        assert_eq!(cfg.min_payment_amount, BigDecimal::from_str("0.50").unwrap());
        assert_eq!(cfg.payment_timeout, Duration::from_secs(10));
        assert_eq!(cfg.pricing.tax_rate, BigDecimal::from_str("0.20").unwrap());
        assert_eq!(cfg.pricing.free_shipping_country, "FR");
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = config(&[
            ("PORT", "9000"),
            ("CURRENCY", "USD"),
            ("TAX_RATE", "0.1"),
            ("SHIPPING_RATES", "us=4.00, de=7.50"),
            ("PAYMENT_TIMEOUT_MS", "250"),
            ("STRIPE_SECRET_KEY", "sk_test"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.currency, "usd");
        assert_eq!(cfg.pricing.tax_rate, BigDecimal::from_str("0.1").unwrap());
        assert_eq!(cfg.pricing.shipping_rates.len(), 2);
        assert_eq!(
            cfg.pricing.shipping_rates["DE"],
            BigDecimal::from_str("7.50").unwrap()
        );
        assert_eq!(cfg.payment_timeout, Duration::from_millis(250));
        assert_eq!(cfg.stripe_secret_key.as_deref(), Some("sk_test"));
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("TAX_RATE", "-0.2")]).is_err());
        assert!(config(&[("SHIPPING_RATES", "FR:5.99")]).is_err());
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = config(&[("DATABASE_URL", "  "), ("HOST", "")]).unwrap();
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.host, "0.0.0.0");
    }
}
