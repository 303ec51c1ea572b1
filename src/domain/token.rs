use crate::domain::order::{OrderId, PaymentMethod};
use crate::domain::product::ProductId;
use crate::domain::user::UserId;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Validity window for tokens issued while a human is mid-checkout at the
/// gateway.
pub const GATEWAY_TOKEN_TTL_MINUTES: i64 = 30;
/// Validity window for wallet purchases, where the buyer is already
/// authenticated and may download later.
pub const WALLET_TOKEN_TTL_DAYS: i64 = 3;

/// Unbound token material: the random value and its expiry.
///
/// A spec is minted outside the storage guard and bound to its order by the
/// ledger inside the atomic settlement unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpec {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenSpec {
    /// Mints fresh token material. The value is 32 bytes from the OS
    /// entropy source, hex encoded; the TTL depends on the trust context
    /// of the payment method.
    pub fn mint(method: PaymentMethod, now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let ttl = match method {
            PaymentMethod::Gateway => Duration::minutes(GATEWAY_TOKEN_TTL_MINUTES),
            PaymentMethod::Wallet => Duration::days(WALLET_TOKEN_TTL_DAYS),
        };
        Self {
            value: hex::encode(bytes),
            expires_at: now + ttl,
        }
    }
}

/// Single-use download entitlement bound to a completed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadToken {
    pub value: String,
    pub order: OrderId,
    pub product: ProductId,
    pub buyer: Option<UserId>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

impl DownloadToken {
    pub fn bind(spec: TokenSpec, order: OrderId, product: ProductId, buyer: Option<UserId>) -> Self {
        Self {
            value: spec.value,
            order,
            product,
            buyer,
            expires_at: spec.expires_at,
            is_used: false,
            used_at: None,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && now < self.expires_at
    }

    /// Consumes the token. Redemption is terminal: `is_used` never reverts.
    pub fn redeem(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.is_used {
            return Err(PaymentError::TokenAlreadyUsed);
        }
        if now >= self.expires_at {
            return Err(PaymentError::TokenExpired);
        }
        self.is_used = true;
        self.used_at = Some(now);
        Ok(())
    }
}
