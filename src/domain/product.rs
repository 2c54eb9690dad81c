//! Product catalog entries. Cart lines and orders take their name and unit
//! price from here, never from the client.

use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::errors::DomainError;
use super::order::CartItem;
use super::pricing::MONEY_SCALE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    /// Free-form grouping used by the sales dashboard, e.g. "tshirts"
    pub category: String,
    #[schema(value_type = String)]
    pub price: BigDecimal,
    pub description: Option<String>,
    /// Icon class shown by the storefront
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable fields of a product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetails {
    pub name: String,
    pub category: String,
    pub price: BigDecimal,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl ProductDetails {
    /// Trims text fields, lower-cases the category and checks the price is a
    /// non-negative amount in whole cents.
    pub fn validated(self) -> Result<Self, DomainError> {
        let name = self.name.trim().to_string();
        let category = self.category.trim().to_lowercase();
        let mut missing = Vec::new();
        if name.is_empty() {
            missing.push("name");
        }
        if category.is_empty() {
            missing.push("category");
        }
        if !missing.is_empty() {
            return Err(DomainError::InvalidInput(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
        if self.price < BigDecimal::zero() {
            return Err(DomainError::InvalidInput(
                "price must not be negative".to_string(),
            ));
        }
        if self.price.with_scale(MONEY_SCALE) != self.price {
            return Err(DomainError::InvalidInput(
                "price has more than two decimal places".to_string(),
            ));
        }

        let optional = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Ok(Self {
            name,
            category,
            price: self.price.with_scale(MONEY_SCALE),
            description: optional(self.description),
            icon: optional(self.icon),
        })
    }
}

impl Product {
    pub fn new(product_id: impl Into<String>, details: ProductDetails, now: DateTime<Utc>) -> Self {
        Self {
            product_id: product_id.into(),
            name: details.name,
            category: details.category,
            price: details.price,
            description: details.description,
            icon: details.icon,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, details: ProductDetails, now: DateTime<Utc>) {
        self.name = details.name;
        self.category = details.category;
        self.price = details.price;
        self.description = details.description;
        self.icon = details.icon;
        self.updated_at = now;
    }

    /// A cart line for `quantity` units at the catalog price.
    pub fn line(&self, quantity: i32) -> CartItem {
        CartItem {
            product_id: self.product_id.clone(),
            name: self.name.clone(),
            unit_price: self.price.clone(),
            quantity,
        }
    }
}

/// The storefront's opening catalog.
pub fn default_catalog(now: DateTime<Utc>) -> Vec<Product> {
    [
        ("1", "T-shirt Pilot Wings", "tshirts", "25.99", "fas fa-tshirt", Some("T-shirt premium avec design \"Pilot Wings\" brodé")),
        ("2", "T-shirt Cessna Vintage", "tshirts", "24.99", "fas fa-tshirt", Some("T-shirt vintage avec illustration Cessna classic")),
        ("3", "T-shirt Boeing 747", "tshirts", "26.99", "fas fa-tshirt", Some("T-shirt avec silhouette Boeing 747 et schéma technique")),
        ("4", "Casquette Pilote", "accessories", "19.99", "fas fa-user-pilot", None),
        ("5", "Boussole Aviation", "accessories", "35.99", "fas fa-compass", None),
        ("6", "Porte-clés Avion", "accessories", "12.99", "fas fa-key", None),
        ("7", "T-shirt Spitfire", "tshirts", "27.99", "fas fa-tshirt", Some("T-shirt collector avec Supermarine Spitfire")),
        ("8", "Badge Pilote", "accessories", "15.99", "fas fa-medal", None),
    ]
    .into_iter()
    .map(|(id, name, category, price, icon, description)| {
        Product::new(
            id,
            ProductDetails {
                name: name.to_string(),
                category: category.to_string(),
                price: BigDecimal::from_str(price).unwrap_or_default(),
                description: description.map(str::to_string),
                icon: Some(icon.to_string()),
            },
            now,
        )
    })
    .collect()
}
