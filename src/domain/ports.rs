use crate::domain::ledger::{Redemption, SettleOutcome, Settlement, WalletReceipt};
use crate::domain::order::{Order, OrderDraft, OrderId};
use crate::domain::plan::{MembershipPlan, PlanId};
use crate::domain::product::{Product, ProductId};
use crate::domain::token::{DownloadToken, TokenSpec};
use crate::domain::user::{UserAccount, UserId};
use crate::domain::withdrawal::{WithdrawalId, WithdrawalRequest};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Transactional storage port for the marketplace ledger.
///
/// Every method is one atomic unit: the implementation holds its storage
/// guard across the precondition check and all side effects, which is what
/// gives `settle_order`, `debit_purchase`, `redeem_token` and
/// `approve_withdrawal` their exactly-one-winner semantics across
/// concurrent callers.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn open_order(&self, draft: OrderDraft) -> Result<Order>;
    async fn order(&self, id: OrderId) -> Result<Option<Order>>;
    async fn order_by_invoice(&self, invoice_id: &str) -> Result<Option<Order>>;
    async fn settle_order(&self, id: OrderId, settlement: Settlement) -> Result<SettleOutcome>;
    async fn cancel_order(&self, id: OrderId) -> Result<Order>;

    async fn valid_token_for_order(&self, id: OrderId) -> Result<Option<DownloadToken>>;
    async fn issue_token(&self, id: OrderId, spec: TokenSpec) -> Result<DownloadToken>;
    async fn redeem_token(&self, value: &str) -> Result<Redemption>;

    async fn debit_purchase(
        &self,
        buyer: UserId,
        product: ProductId,
        amount: Decimal,
        author_credit: Decimal,
        spec: TokenSpec,
    ) -> Result<WalletReceipt>;

    async fn create_withdrawal(&self, author: UserId, amount: Decimal)
    -> Result<WithdrawalRequest>;
    async fn approve_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalRequest>;
    async fn reject_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalRequest>;
    async fn complete_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalRequest>;
    async fn withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>>;

    async fn user(&self, id: UserId) -> Result<Option<UserAccount>>;
    async fn product(&self, id: ProductId) -> Result<Option<Product>>;
    async fn plan(&self, id: PlanId) -> Result<Option<MembershipPlan>>;
    async fn resolve_product(&self, public_id: &str) -> Result<Option<ProductId>>;

    async fn upsert_user(&self, user: UserAccount) -> Result<()>;
    async fn upsert_product(&self, product: Product) -> Result<()>;
    async fn upsert_plan(&self, plan: MembershipPlan) -> Result<()>;
}

pub type LedgerRef = Arc<dyn Ledger>;

/// Payment status as reported by the external gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GatewayStatus {
    Pending,
    Paid,
    Cancelled,
}

/// A gateway-side invoice, as returned by invoice creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceHandle {
    pub invoice_id: String,
    pub qr_image: String,
    pub qr_text: String,
}

/// Client port for the external payment gateway. The transport is an
/// external collaborator; the core only depends on these two calls.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_invoice(&self, amount: Decimal, description: &str) -> Result<InvoiceHandle>;
    async fn check_status(&self, invoice_id: &str) -> Result<GatewayStatus>;
}

pub type GatewayRef = Arc<dyn PaymentGateway>;
