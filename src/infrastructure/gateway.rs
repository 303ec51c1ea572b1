use crate::domain::ports::{GatewayStatus, InvoiceHandle, PaymentGateway};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Serialize)]
struct CreateInvoiceBody<'a> {
    amount: Decimal,
    description: &'a str,
}

#[derive(Deserialize)]
struct StatusBody {
    payment_status: GatewayStatus,
}

/// HTTP client for the external payment gateway.
///
/// The gateway itself is a black box; this client only speaks the two
/// calls the core depends on. Transport failures surface as
/// `GatewayError` so callers can retry.
#[derive(Clone)]
pub struct HttpGateway {
    base_url: String,
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_invoice(&self, amount: Decimal, description: &str) -> Result<InvoiceHandle> {
        let url = format!("{}/invoice", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&CreateInvoiceBody {
                amount,
                description,
            })
            .send()
            .await
            .map_err(|e| PaymentError::GatewayError(e.to_string()))?
            .error_for_status()
            .map_err(|e| PaymentError::GatewayError(e.to_string()))?;
        response
            .json::<InvoiceHandle>()
            .await
            .map_err(|e| PaymentError::GatewayError(e.to_string()))
    }

    async fn check_status(&self, invoice_id: &str) -> Result<GatewayStatus> {
        let url = format!("{}/invoice/{invoice_id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PaymentError::GatewayError(e.to_string()))?
            .error_for_status()
            .map_err(|e| PaymentError::GatewayError(e.to_string()))?;
        let body: StatusBody = response
            .json()
            .await
            .map_err(|e| PaymentError::GatewayError(e.to_string()))?;
        Ok(body.payment_status)
    }
}

/// Programmable gateway used by tests: invoices are numbered
/// sequentially and their status is whatever the test sets.
#[derive(Default, Clone)]
pub struct StubGateway {
    statuses: Arc<RwLock<HashMap<String, GatewayStatus>>>,
    counter: Arc<AtomicU64>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_status(&self, invoice_id: &str, status: GatewayStatus) {
        self.statuses
            .write()
            .await
            .insert(invoice_id.to_string(), status);
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_invoice(&self, _amount: Decimal, _description: &str) -> Result<InvoiceHandle> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let invoice_id = format!("inv-{n}");
        self.statuses
            .write()
            .await
            .insert(invoice_id.clone(), GatewayStatus::Pending);
        Ok(InvoiceHandle {
            qr_image: format!("https://gateway.example/qr/{invoice_id}.png"),
            qr_text: format!("pay:{invoice_id}"),
            invoice_id,
        })
    }

    async fn check_status(&self, invoice_id: &str) -> Result<GatewayStatus> {
        self.statuses
            .read()
            .await
            .get(invoice_id)
            .copied()
            .ok_or_else(|| PaymentError::GatewayError(format!("unknown invoice {invoice_id}")))
    }
}
