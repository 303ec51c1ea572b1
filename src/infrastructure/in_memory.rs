use crate::domain::ledger::{
    LedgerState, Redemption, SettleOutcome, Settlement, WalletReceipt,
};
use crate::domain::order::{Order, OrderDraft, OrderId};
use crate::domain::plan::{MembershipPlan, PlanId};
use crate::domain::ports::Ledger;
use crate::domain::product::{Product, ProductId};
use crate::domain::token::{DownloadToken, TokenSpec};
use crate::domain::user::{UserAccount, UserId};
use crate::domain::withdrawal::{WithdrawalId, WithdrawalRequest};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory ledger.
///
/// One `RwLock` guards the whole working set, so every port method runs
/// its precondition check and side effects under a single write guard,
/// the atomic conditional-update primitive the completion claim relies
/// on. `Clone` shares the underlying state.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState::new())),
        }
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn open_order(&self, draft: OrderDraft) -> Result<Order> {
        self.state.write().await.open_order(draft, Utc::now())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.order(id).cloned())
    }

    async fn order_by_invoice(&self, invoice_id: &str) -> Result<Option<Order>> {
        Ok(self.state.read().await.order_by_invoice(invoice_id).cloned())
    }

    async fn settle_order(&self, id: OrderId, settlement: Settlement) -> Result<SettleOutcome> {
        self.state
            .write()
            .await
            .settle_order(id, settlement, Utc::now())
    }

    async fn cancel_order(&self, id: OrderId) -> Result<Order> {
        self.state.write().await.cancel_order(id)
    }

    async fn valid_token_for_order(&self, id: OrderId) -> Result<Option<DownloadToken>> {
        Ok(self.state.read().await.valid_token_for_order(id, Utc::now()))
    }

    async fn issue_token(&self, id: OrderId, spec: TokenSpec) -> Result<DownloadToken> {
        self.state.write().await.issue_token(id, spec, Utc::now())
    }

    async fn redeem_token(&self, value: &str) -> Result<Redemption> {
        self.state.write().await.redeem_token(value, Utc::now())
    }

    async fn debit_purchase(
        &self,
        buyer: UserId,
        product: ProductId,
        amount: Decimal,
        author_credit: Decimal,
        spec: TokenSpec,
    ) -> Result<WalletReceipt> {
        self.state
            .write()
            .await
            .debit_purchase(buyer, product, amount, author_credit, spec, Utc::now())
    }

    async fn create_withdrawal(
        &self,
        author: UserId,
        amount: Decimal,
    ) -> Result<WithdrawalRequest> {
        self.state
            .write()
            .await
            .create_withdrawal(author, amount, Utc::now())
    }

    async fn approve_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        self.state.write().await.approve_withdrawal(id)
    }

    async fn reject_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        self.state.write().await.reject_withdrawal(id)
    }

    async fn complete_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        self.state.write().await.complete_withdrawal(id)
    }

    async fn withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        Ok(self.state.read().await.withdrawal(id).cloned())
    }

    async fn user(&self, id: UserId) -> Result<Option<UserAccount>> {
        Ok(self.state.read().await.user(id).cloned())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.product(id).cloned())
    }

    async fn plan(&self, id: PlanId) -> Result<Option<MembershipPlan>> {
        Ok(self.state.read().await.plan(id).cloned())
    }

    async fn resolve_product(&self, public_id: &str) -> Result<Option<ProductId>> {
        Ok(self.state.read().await.resolve_product(public_id))
    }

    async fn upsert_user(&self, user: UserAccount) -> Result<()> {
        self.state.write().await.upsert_user(user);
        Ok(())
    }

    async fn upsert_product(&self, product: Product) -> Result<()> {
        self.state.write().await.upsert_product(product);
        Ok(())
    }

    async fn upsert_plan(&self, plan: MembershipPlan) -> Result<()> {
        self.state.write().await.upsert_plan(plan);
        Ok(())
    }
}
