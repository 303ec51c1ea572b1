use crate::domain::user::UserId;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WithdrawalId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

/// An author's cash-out request.
///
/// Pending and approved requests reserve balance: their summed amounts,
/// plus any new request, must never exceed the author's current income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub author: UserId,
    pub amount: Decimal,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
}

impl WithdrawalRequest {
    pub fn reserves_balance(&self) -> bool {
        matches!(
            self.status,
            WithdrawalStatus::Pending | WithdrawalStatus::Approved
        )
    }

    pub fn approve(&mut self) -> Result<()> {
        self.transition(WithdrawalStatus::Pending, WithdrawalStatus::Approved)
    }

    pub fn reject(&mut self) -> Result<()> {
        self.transition(WithdrawalStatus::Pending, WithdrawalStatus::Rejected)
    }

    pub fn complete(&mut self) -> Result<()> {
        self.transition(WithdrawalStatus::Approved, WithdrawalStatus::Completed)
    }

    fn transition(&mut self, from: WithdrawalStatus, to: WithdrawalStatus) -> Result<()> {
        if self.status != from {
            return Err(PaymentError::ValidationError(format!(
                "withdrawal {} cannot move from {:?} to {:?}",
                self.id.0, self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(status: WithdrawalStatus) -> WithdrawalRequest {
        WithdrawalRequest {
            id: WithdrawalId(1),
            author: UserId(1),
            amount: dec!(50.00),
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_pending_and_approved_reserve_balance() {
        assert!(request(WithdrawalStatus::Pending).reserves_balance());
        assert!(request(WithdrawalStatus::Approved).reserves_balance());
        assert!(!request(WithdrawalStatus::Rejected).reserves_balance());
        assert!(!request(WithdrawalStatus::Completed).reserves_balance());
    }

    #[test]
    fn test_approve_then_complete() {
        let mut r = request(WithdrawalStatus::Pending);
        r.approve().unwrap();
        r.complete().unwrap();
        assert_eq!(r.status, WithdrawalStatus::Completed);
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(request(WithdrawalStatus::Rejected).approve().is_err());
        assert!(request(WithdrawalStatus::Pending).complete().is_err());
        assert!(request(WithdrawalStatus::Approved).reject().is_err());
    }
}
