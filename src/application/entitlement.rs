use crate::domain::ledger::Redemption;
use crate::domain::order::{Order, OrderId, PaymentMethod};
use crate::domain::ports::LedgerRef;
use crate::domain::token::{DownloadToken, TokenSpec};
use crate::error::Result;
use chrono::Utc;

/// Issues and redeems single-use download tokens.
///
/// Token material is minted here (random value, TTL by trust context) and
/// bound to its order by the ledger inside the atomic unit, so issuance
/// composes with the completion claim without a second round trip.
#[derive(Clone)]
pub struct EntitlementIssuer {
    ledger: LedgerRef,
}

impl EntitlementIssuer {
    pub fn new(ledger: LedgerRef) -> Self {
        Self { ledger }
    }

    pub fn mint_spec(&self, method: PaymentMethod) -> TokenSpec {
        TokenSpec::mint(method, Utc::now())
    }

    /// Idempotent issuance for a completed product order: calling this any
    /// number of times returns the same token until it expires or is
    /// redeemed.
    pub async fn issue(&self, order: &Order) -> Result<DownloadToken> {
        let spec = self.mint_spec(order.method);
        self.ledger.issue_token(order.id, spec).await
    }

    /// The idempotent lookup used by callers that lost the completion
    /// claim: never creates, only fetches.
    pub async fn existing(&self, order: OrderId) -> Result<Option<DownloadToken>> {
        self.ledger.valid_token_for_order(order).await
    }

    /// Consumes a token and returns the product file locator. Exactly one
    /// of two simultaneous attempts succeeds.
    pub async fn redeem(&self, value: &str) -> Result<Redemption> {
        let redemption = self.ledger.redeem_token(value).await?;
        tracing::info!(
            order = redemption.token.order.0,
            product = redemption.token.product.0,
            "download token redeemed"
        );
        Ok(redemption)
    }
}
