use crate::application::author_commission_percent;
use crate::application::entitlement::EntitlementIssuer;
use crate::domain::commission::commission;
use crate::domain::ledger::WalletReceipt;
use crate::domain::money::Amount;
use crate::domain::order::PaymentMethod;
use crate::domain::ports::LedgerRef;
use crate::domain::product::ProductId;
use crate::domain::user::UserId;
use crate::error::{PaymentError, Result};

/// Direct-debit purchases from an authenticated buyer's wallet balance.
///
/// Unlike the gateway flow there is no pending phase: trust is established
/// synchronously, so the debit, the completed order, the token and the
/// author credit commit as one ledger unit, or not at all. The balance
/// precondition is enforced inside that unit, never from a prior read.
#[derive(Clone)]
pub struct WalletProcessor {
    ledger: LedgerRef,
    issuer: EntitlementIssuer,
}

impl WalletProcessor {
    pub fn new(ledger: LedgerRef) -> Self {
        let issuer = EntitlementIssuer::new(ledger.clone());
        Self { ledger, issuer }
    }

    pub async fn pay_with_wallet(
        &self,
        buyer: UserId,
        product_id: ProductId,
        amount: Amount,
    ) -> Result<WalletReceipt> {
        let product = self
            .ledger
            .product(product_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("product {}", product_id.0)))?;
        let percent = author_commission_percent(&self.ledger, product.author).await?;
        let author_credit = commission(amount.value(), percent);
        let spec = self.issuer.mint_spec(PaymentMethod::Wallet);

        let receipt = self
            .ledger
            .debit_purchase(buyer, product_id, amount.value(), author_credit, spec)
            .await?;

        tracing::info!(
            order = receipt.order.id.0,
            buyer = buyer.0,
            product = product_id.0,
            amount = %receipt.order.amount,
            balance = %receipt.balance,
            "wallet purchase settled"
        );
        Ok(receipt)
    }
}
