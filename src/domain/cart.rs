use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// What a cart line or order item points at in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductKind {
    Dish,
    Setmeal,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Dish => "DISH",
            ProductKind::Setmeal => "SETMEAL",
        }
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DISH" => Ok(ProductKind::Dish),
            "SETMEAL" => Ok(ProductKind::Setmeal),
            other => Err(DomainError::Internal(format!("unknown product kind '{other}'"))),
        }
    }
}

/// Identity of a cart line for deduplication: one row per key and user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductKey {
    pub kind: ProductKind,
    pub product_id: Uuid,
    pub flavor: Option<String>,
}

impl ProductKey {
    pub const MAX_FLAVOR_CHARS: usize = 64;

    pub fn dish(product_id: Uuid, flavor: Option<String>) -> Self {
        Self {
            kind: ProductKind::Dish,
            product_id,
            // Blank selectors collapse to "no flavor" so they dedupe together.
            flavor: flavor.filter(|f| !f.trim().is_empty()),
        }
    }

    pub fn setmeal(product_id: Uuid) -> Self {
        Self {
            kind: ProductKind::Setmeal,
            product_id,
            flavor: None,
        }
    }

    pub fn new(kind: ProductKind, product_id: Uuid, flavor: Option<String>) -> Self {
        match kind {
            ProductKind::Dish => Self::dish(product_id, flavor),
            ProductKind::Setmeal => Self::setmeal(product_id),
        }
    }

    /// Rejects flavor selectors longer than the cart can store.
    pub fn validate(&self) -> Result<(), DomainError> {
        match &self.flavor {
            Some(flavor) if flavor.chars().count() > Self::MAX_FLAVOR_CHARS => {
                Err(DomainError::InvalidInput(format!(
                    "dish_flavor must be at most {} characters",
                    Self::MAX_FLAVOR_CHARS
                )))
            }
            _ => Ok(()),
        }
    }
}


/// Name, image and price as the catalog reports them right now.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSnapshot {
    pub name: String,
    pub image: Option<String>,
    pub price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartLineItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub key: ProductKey,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl CartLineItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

/// A line to upsert: inserted when the key is new for the user, otherwise
/// `quantity` is added to the existing row and its snapshot is kept.
#[derive(Debug, Clone)]
pub struct NewCartLine {
    pub user_id: Uuid,
    pub key: ProductKey,
    pub snapshot: ProductSnapshot,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// Result of taking one unit off a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartDecrement {
    Decremented { remaining: i32 },
    Removed,
    Missing,
}

pub fn cart_total(lines: &[CartLineItem]) -> BigDecimal {
    lines
        .iter()
        .fold(BigDecimal::from(0), |acc, line| acc + line.line_total())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn line(price: &str, quantity: i32) -> CartLineItem {
        CartLineItem {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            key: ProductKey::setmeal(Uuid::new_v4()),
            name: "Combo".to_string(),
            image: None,
            unit_price: BigDecimal::from_str(price).expect("valid decimal"),
            quantity,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn blank_flavor_is_treated_as_none() {
        let id = Uuid::new_v4();
        assert_eq!(
            ProductKey::dish(id, Some("  ".to_string())),
            ProductKey::dish(id, None)
        );
    }

    #[test]
    fn overlong_flavor_is_invalid_input() {
        let id = Uuid::new_v4();
        let longest = ProductKey::dish(id, Some("x".repeat(ProductKey::MAX_FLAVOR_CHARS)));
        assert!(longest.validate().is_ok());

        let too_long = ProductKey::dish(id, Some("x".repeat(ProductKey::MAX_FLAVOR_CHARS + 1)));
        assert!(matches!(
            too_long.validate(),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn setmeal_key_ignores_flavor() {
        let id = Uuid::new_v4();
        let key = ProductKey::new(ProductKind::Setmeal, id, Some("spicy".to_string()));
        assert_eq!(key.flavor, None);
    }

    #[test]
    fn cart_total_sums_price_times_quantity() {
        let total = cart_total(&[line("12.50", 2), line("3.00", 3)]);
        assert_eq!(total, BigDecimal::from_str("34.00").unwrap());
    }

    #[test]
    fn cart_total_of_nothing_is_zero() {
        assert_eq!(cart_total(&[]), BigDecimal::from(0));
    }

    #[test]
    fn product_kind_parses_its_own_representation() {
        for kind in [ProductKind::Dish, ProductKind::Setmeal] {
            assert_eq!(ProductKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(ProductKind::from_str("DRINK").is_err());
    }
}
