use crate::application::author_commission_percent;
use crate::application::entitlement::EntitlementIssuer;
use crate::domain::commission::commission;
use crate::domain::ledger::{SettleOutcome, Settlement};
use crate::domain::order::{Order, OrderStatus, OrderSubject};
use crate::domain::ports::{GatewayStatus, LedgerRef};
use crate::domain::token::DownloadToken;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;

/// Snapshot returned to whichever caller asked for reconciliation: the
/// order, the gateway status the caller brought, and the download token
/// once the order is completed.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub order: Order,
    pub gateway_status: GatewayStatus,
    pub token: Option<DownloadToken>,
}

/// Turns a gateway payment signal into durable order state, exactly once.
///
/// Any number of callers (webhook deliveries, webhook retries, client
/// polls) may report the same invoice as paid, sequentially or
/// concurrently; the completion claim in the ledger picks one winner, and
/// everyone else gets the already-settled snapshot with no further side
/// effects.
#[derive(Clone)]
pub struct ReconciliationEngine {
    ledger: LedgerRef,
    issuer: EntitlementIssuer,
}

impl ReconciliationEngine {
    pub fn new(ledger: LedgerRef) -> Self {
        let issuer = EntitlementIssuer::new(ledger.clone());
        Self { ledger, issuer }
    }

    /// Applies a gateway status to the order behind `invoice_id`.
    ///
    /// The caller is responsible for having obtained `status` from the
    /// gateway (webhook body or a fresh status query); this engine never
    /// talks to the gateway itself.
    pub async fn reconcile(
        &self,
        invoice_id: &str,
        status: GatewayStatus,
    ) -> Result<PaymentOutcome> {
        let order = self
            .ledger
            .order_by_invoice(invoice_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("invoice {invoice_id}")))?;

        match status {
            GatewayStatus::Pending => self.snapshot(order, status).await,
            GatewayStatus::Cancelled => {
                let order = self.ledger.cancel_order(order.id).await?;
                if order.status == OrderStatus::Cancelled {
                    tracing::info!(order = order.id.0, invoice_id, "order cancelled");
                }
                self.snapshot(order, status).await
            }
            GatewayStatus::Paid => {
                let settlement = self.prepare_settlement(&order).await?;
                let outcome = self.ledger.settle_order(order.id, settlement).await?;
                match &outcome {
                    SettleOutcome::Won { order, .. } => {
                        tracing::info!(
                            order = order.id.0,
                            invoice_id,
                            amount = %order.amount,
                            "order settled"
                        );
                    }
                    SettleOutcome::AlreadyCompleted { order, .. } => {
                        tracing::debug!(order = order.id.0, invoice_id, "already settled");
                    }
                    SettleOutcome::Cancelled { order } => {
                        tracing::warn!(
                            order = order.id.0,
                            invoice_id,
                            "paid signal for a cancelled order"
                        );
                    }
                }
                Ok(PaymentOutcome {
                    token: outcome.token().cloned(),
                    order: outcome.order().clone(),
                    gateway_status: status,
                })
            }
        }
    }

    /// Computes the side effects to apply if the claim is won. For product
    /// orders that is the author commission (single calculator) and fresh
    /// token material; membership and top-up orders settle without either.
    async fn prepare_settlement(&self, order: &Order) -> Result<Settlement> {
        match order.subject {
            OrderSubject::Product(product_id) => {
                let product = self
                    .ledger
                    .product(product_id)
                    .await?
                    .ok_or_else(|| PaymentError::NotFound(format!("product {}", product_id.0)))?;
                let percent = author_commission_percent(&self.ledger, product.author).await?;
                Ok(Settlement {
                    author_credit: commission(order.amount, percent),
                    token: Some(self.issuer.mint_spec(order.method)),
                })
            }
            OrderSubject::Membership(_) | OrderSubject::TopUp => Ok(Settlement {
                author_credit: Decimal::ZERO,
                token: None,
            }),
        }
    }

    async fn snapshot(&self, order: Order, status: GatewayStatus) -> Result<PaymentOutcome> {
        let token = if order.status == OrderStatus::Completed {
            self.issuer.existing(order.id).await?
        } else {
            None
        };
        Ok(PaymentOutcome {
            order,
            gateway_status: status,
            token,
        })
    }
}
