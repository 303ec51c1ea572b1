use crate::domain::money::Amount;
use crate::domain::order::{Order, OrderStatus, PaymentMethod};
use crate::domain::ports::GatewayStatus;
use crate::domain::token::DownloadToken;
use crate::domain::user::UserId;
use crate::error::{PaymentError, Result};
use crate::interfaces::http::{AppState, resolve_product};
use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct OrderBody {
    pub id: u64,
    pub status: OrderStatus,
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
}

impl From<&Order> for OrderBody {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.0,
            status: order.status,
            amount: order.amount,
            method: order.method,
            invoice_id: order.invoice_id.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct TokenBody {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&DownloadToken> for TokenBody {
    fn from(token: &DownloadToken) -> Self {
        Self {
            token: token.value.clone(),
            expires_at: token.expires_at,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateInvoiceRequest {
    pub product_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub buyer_id: Option<u64>,
}

#[derive(Serialize)]
pub struct CreateInvoiceResponse {
    pub order: OrderBody,
    pub invoice_id: String,
    pub qr_image: String,
    pub qr_text: String,
}

/// `POST /payments/invoice`: opens a pending order and creates the
/// gateway invoice the buyer pays against.
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(body): Json<CreateInvoiceRequest>,
) -> Result<Json<CreateInvoiceResponse>> {
    let amount = Amount::new(body.amount)?;
    let product_id = resolve_product(&state, &body.product_id).await?;
    let receipt = state
        .checkout
        .open_product_order(body.buyer_id.map(UserId), product_id, amount)
        .await?;
    Ok(Json(CreateInvoiceResponse {
        order: (&receipt.order).into(),
        invoice_id: receipt.invoice.invoice_id,
        qr_image: receipt.invoice.qr_image,
        qr_text: receipt.invoice.qr_text,
    }))
}

#[derive(Serialize)]
pub struct PaymentStatusResponse {
    pub order: OrderBody,
    pub payment_status: GatewayStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<TokenBody>,
}

/// `GET /payments/status/{invoice_id}`: the client-driven poll. Fetches
/// a fresh gateway status and runs it through the same reconciliation
/// engine the webhook uses.
pub async fn payment_status(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<Json<PaymentStatusResponse>> {
    let status = state.gateway.check_status(&invoice_id).await?;
    let outcome = state.engine.reconcile(&invoice_id, status).await?;
    Ok(Json(PaymentStatusResponse {
        order: (&outcome.order).into(),
        payment_status: outcome.gateway_status,
        download: outcome.token.as_ref().map(Into::into),
    }))
}

#[derive(Deserialize)]
pub struct WebhookBody {
    pub object_type: String,
    pub object_id: String,
    pub payment_status: GatewayStatus,
}

/// `POST /webhook/payment`: the gateway's asynchronous callback.
///
/// Responds 200 on any successful processing, including the idempotent
/// no-op of a redelivered signal; errors map to non-2xx so the gateway's
/// delivery retry re-invokes us.
pub async fn webhook(
    State(state): State<AppState>,
    Json(body): Json<WebhookBody>,
) -> Result<&'static str> {
    if body.object_type != "INVOICE" {
        return Err(PaymentError::ValidationError(format!(
            "unsupported object type {}",
            body.object_type
        )));
    }
    state
        .engine
        .reconcile(&body.object_id, body.payment_status)
        .await?;
    Ok("OK")
}

#[derive(Deserialize)]
pub struct WalletPurchaseRequest {
    pub buyer_id: u64,
    pub product_id: String,
    pub amount: Decimal,
}

#[derive(Serialize)]
pub struct WalletPurchaseResponse {
    pub order: OrderBody,
    pub download: TokenBody,
    pub balance: Decimal,
}

/// `POST /payments/wallet`: direct debit from the buyer's wallet
/// balance; settles synchronously.
pub async fn wallet_purchase(
    State(state): State<AppState>,
    Json(body): Json<WalletPurchaseRequest>,
) -> Result<Json<WalletPurchaseResponse>> {
    let amount = Amount::new(body.amount)?;
    let product_id = resolve_product(&state, &body.product_id).await?;
    let receipt = state
        .wallet
        .pay_with_wallet(UserId(body.buyer_id), product_id, amount)
        .await?;
    Ok(Json(WalletPurchaseResponse {
        order: (&receipt.order).into(),
        download: (&receipt.token).into(),
        balance: receipt.balance,
    }))
}
