use crate::domain::plan::PlanId;
use crate::domain::product::ProductId;
use crate::domain::user::UserId;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct OrderId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Gateway,
    Wallet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

/// What the buyer is paying for.
///
/// Product orders carry the full settlement side effects (commission,
/// product income, download token). Membership orders assign the plan to
/// the buyer; top-up orders credit the buyer's wallet. Exactly one subject
/// per order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSubject {
    Product(ProductId),
    Membership(PlanId),
    TopUp,
}

/// One purchase attempt.
///
/// Created once, mutated only through [`Order::complete`] and
/// [`Order::cancel`], never deleted. Both completed and cancelled are
/// terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Absent for guest gateway purchases.
    pub buyer: Option<UserId>,
    pub subject: OrderSubject,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: OrderStatus,
    /// Present only for gateway orders.
    pub invoice_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn product_id(&self) -> Option<ProductId> {
        match self.subject {
            OrderSubject::Product(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != OrderStatus::Pending
    }

    /// Marks the order completed. Legal only from `Pending`.
    pub fn complete(&mut self) -> Result<()> {
        if self.status != OrderStatus::Pending {
            return Err(PaymentError::ValidationError(format!(
                "order {} is not pending",
                self.id.0
            )));
        }
        self.status = OrderStatus::Completed;
        Ok(())
    }

    /// Marks the order cancelled. Legal only from `Pending`.
    pub fn cancel(&mut self) -> Result<()> {
        if self.status != OrderStatus::Pending {
            return Err(PaymentError::ValidationError(format!(
                "order {} is not pending",
                self.id.0
            )));
        }
        self.status = OrderStatus::Cancelled;
        Ok(())
    }
}

/// Input for creating an order; the ledger assigns the id.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub buyer: Option<UserId>,
    pub subject: OrderSubject,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub invoice_id: Option<String>,
}
