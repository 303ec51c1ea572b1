use crate::domain::money::Amount;
use crate::domain::ports::LedgerRef;
use crate::domain::user::UserId;
use crate::domain::withdrawal::{WithdrawalId, WithdrawalRequest};
use crate::error::Result;

/// Guards author cash-out requests against the available balance.
///
/// Creation reserves against income minus already-reserved requests;
/// approval re-checks income at approval time and debits it in the same
/// ledger unit, so concurrent approvals can never jointly overdraft.
#[derive(Clone)]
pub struct WithdrawalService {
    ledger: LedgerRef,
}

impl WithdrawalService {
    pub fn new(ledger: LedgerRef) -> Self {
        Self { ledger }
    }

    pub async fn create(&self, author: UserId, amount: Amount) -> Result<WithdrawalRequest> {
        let request = self
            .ledger
            .create_withdrawal(author, amount.value())
            .await?;
        tracing::info!(
            withdrawal = request.id.0,
            author = author.0,
            amount = %request.amount,
            "withdrawal requested"
        );
        Ok(request)
    }

    pub async fn approve(&self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        let request = self.ledger.approve_withdrawal(id).await?;
        tracing::info!(
            withdrawal = request.id.0,
            author = request.author.0,
            amount = %request.amount,
            "withdrawal approved"
        );
        Ok(request)
    }

    pub async fn reject(&self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        let request = self.ledger.reject_withdrawal(id).await?;
        tracing::info!(withdrawal = request.id.0, "withdrawal rejected");
        Ok(request)
    }

    pub async fn complete(&self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        let request = self.ledger.complete_withdrawal(id).await?;
        tracing::info!(withdrawal = request.id.0, "withdrawal paid out");
        Ok(request)
    }
}
