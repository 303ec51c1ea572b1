//! HTTP surface of the settlement core.
//!
//! Handlers resolve public identifiers into typed keys at this boundary
//! and delegate to the application services; the core never sees an
//! untyped identifier.

pub mod downloads;
pub mod payments;
pub mod responses;
pub mod withdrawals;

use crate::application::checkout::CheckoutService;
use crate::application::entitlement::EntitlementIssuer;
use crate::application::reconciliation::ReconciliationEngine;
use crate::application::wallet::WalletProcessor;
use crate::application::withdrawal::WithdrawalService;
use crate::domain::ports::{GatewayRef, LedgerRef};
use crate::domain::product::ProductId;
use crate::error::{PaymentError, Result};
use axum::Router;
use axum::routing::{get, post};

#[derive(Clone)]
pub struct AppState {
    pub checkout: CheckoutService,
    pub engine: ReconciliationEngine,
    pub issuer: EntitlementIssuer,
    pub wallet: WalletProcessor,
    pub withdrawals: WithdrawalService,
    pub ledger: LedgerRef,
    pub gateway: GatewayRef,
}

impl AppState {
    pub fn new(ledger: LedgerRef, gateway: GatewayRef) -> Self {
        Self {
            checkout: CheckoutService::new(ledger.clone(), gateway.clone()),
            engine: ReconciliationEngine::new(ledger.clone()),
            issuer: EntitlementIssuer::new(ledger.clone()),
            wallet: WalletProcessor::new(ledger.clone()),
            withdrawals: WithdrawalService::new(ledger.clone()),
            ledger,
            gateway,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/payments/invoice", post(payments::create_invoice))
        .route("/payments/status/{invoice_id}", get(payments::payment_status))
        .route("/payments/wallet", post(payments::wallet_purchase))
        .route("/webhook/payment", post(payments::webhook))
        .route("/downloads/{token}", get(downloads::redeem))
        .route("/withdrawals", post(withdrawals::create))
        .route("/withdrawals/{id}/approve", post(withdrawals::approve))
        .route("/withdrawals/{id}/reject", post(withdrawals::reject))
        .route("/withdrawals/{id}/complete", post(withdrawals::complete))
        .with_state(state)
}

/// Resolves a public product identifier into the internal typed key.
pub(crate) async fn resolve_product(state: &AppState, public_id: &str) -> Result<ProductId> {
    state
        .ledger
        .resolve_product(public_id)
        .await?
        .ok_or_else(|| PaymentError::NotFound(format!("product {public_id}")))
}
