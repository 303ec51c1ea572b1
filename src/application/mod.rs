//! Application layer: the services that orchestrate the domain.
//!
//! Services own shared references to the storage and gateway ports. They
//! compute the pure parts of a unit of work (commission, token material)
//! and hand the ledger one atomic operation to apply; the claim semantics
//! live in the storage layer, not here.

pub mod checkout;
pub mod entitlement;
pub mod reconciliation;
pub mod wallet;
pub mod withdrawal;

use crate::domain::commission::DEFAULT_COMMISSION_PERCENT;
use crate::domain::ports::LedgerRef;
use crate::domain::user::UserId;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;

/// Resolves the commission percentage for a selling author: the
/// membership plan's percentage, or the fixed default when the author has
/// no plan (or the plan record is gone).
pub(crate) async fn author_commission_percent(
    ledger: &LedgerRef,
    author: UserId,
) -> Result<Decimal> {
    let account = ledger
        .user(author)
        .await?
        .ok_or_else(|| PaymentError::NotFound(format!("user {}", author.0)))?;
    let percent = match account.plan {
        Some(plan_id) => ledger
            .plan(plan_id)
            .await?
            .map(|plan| plan.commission_percent)
            .unwrap_or(DEFAULT_COMMISSION_PERCENT),
        None => DEFAULT_COMMISSION_PERCENT,
    };
    Ok(percent)
}
