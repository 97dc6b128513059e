use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, OrderId, ProductId, UserId};

/// Order line: product, the name it was sold under, quantity, unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

/// Placed order. Only the paid flag ever changes after placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    user: UserId,
    order_items: Vec<OrderLine>,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl Order {
    pub fn place(
        id: OrderId,
        user: UserId,
        lines: Vec<OrderLine>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation("order must contain at least one line"));
        }
        if lines.iter().any(|l| l.quantity == 0) {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if lines.iter().any(|l| !(l.price.is_finite() && l.price >= 0.0)) {
            return Err(DomainError::validation("price must not be negative"));
        }

        Ok(Self {
            id,
            user,
            order_items: lines,
            is_paid: false,
            paid_at: None,
            created_at: now,
        })
    }

    pub fn mark_paid(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if self.is_paid {
            return Err(DomainError::conflict("order is already paid"));
        }
        self.is_paid = true;
        self.paid_at = Some(at);
        Ok(())
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.order_items
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn total_price(&self) -> f64 {
        self.order_items
            .iter()
            .map(|l| l.price * f64::from(l.quantity))
            .sum()
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
