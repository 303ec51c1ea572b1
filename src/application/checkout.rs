use crate::domain::money::Amount;
use crate::domain::order::{Order, OrderDraft, OrderSubject, PaymentMethod};
use crate::domain::ports::{GatewayRef, InvoiceHandle, LedgerRef};
use crate::domain::product::ProductId;
use crate::domain::user::UserId;
use crate::error::{PaymentError, Result};

/// A freshly opened gateway order and the invoice the buyer pays against.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub invoice: InvoiceHandle,
}

/// Opens pending gateway orders: creates the gateway invoice, then books
/// the order against it. Completion is the reconciliation engine's job.
#[derive(Clone)]
pub struct CheckoutService {
    ledger: LedgerRef,
    gateway: GatewayRef,
}

impl CheckoutService {
    pub fn new(ledger: LedgerRef, gateway: GatewayRef) -> Self {
        Self { ledger, gateway }
    }

    pub async fn open_product_order(
        &self,
        buyer: Option<UserId>,
        product_id: ProductId,
        amount: Amount,
    ) -> Result<CheckoutReceipt> {
        let product = self
            .ledger
            .product(product_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("product {}", product_id.0)))?;

        let description = format!("Purchase of {}", product.title);
        let invoice = self
            .gateway
            .create_invoice(amount.value(), &description)
            .await?;

        let order = self
            .ledger
            .open_order(OrderDraft {
                buyer,
                subject: OrderSubject::Product(product_id),
                amount: amount.value(),
                method: PaymentMethod::Gateway,
                invoice_id: Some(invoice.invoice_id.clone()),
            })
            .await?;

        tracing::info!(
            order = order.id.0,
            invoice_id = %invoice.invoice_id,
            amount = %order.amount,
            "gateway order opened"
        );
        Ok(CheckoutReceipt { order, invoice })
    }
}
