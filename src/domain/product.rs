use crate::domain::commission::UNIQUE_PURCHASE_AMOUNT;
use crate::domain::money::round2;
use crate::domain::user::UserId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ProductId(pub u64);

/// A paid digital file listed by an author.
///
/// `public_id` is the identifier exposed to clients; it is resolved into
/// the internal [`ProductId`] once at the API boundary, and the core only
/// ever works with the typed key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub public_id: String,
    pub author: UserId,
    pub title: String,
    pub price: Decimal,
    /// Gross sale amounts, accumulated only by completed orders.
    pub income: Decimal,
    pub is_unique: bool,
    /// File locator handed out on token redemption. Upload/CDN handling is
    /// an external collaborator.
    pub file_url: String,
}

impl Product {
    /// Books a completed sale: accumulates gross income and flags the
    /// unique promotion when the amount matches the fixed threshold.
    pub fn record_sale(&mut self, amount: Decimal) {
        self.income = round2(self.income + amount);
        if amount == UNIQUE_PURCHASE_AMOUNT {
            self.is_unique = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product() -> Product {
        Product {
            id: ProductId(1),
            public_id: "prod-abc".to_string(),
            author: UserId(1),
            title: "Sample pack".to_string(),
            price: dec!(100.00),
            income: Decimal::ZERO,
            is_unique: false,
            file_url: "https://cdn.example/files/abc".to_string(),
        }
    }

    #[test]
    fn test_record_sale_accumulates() {
        let mut p = product();
        p.record_sale(dec!(100.00));
        p.record_sale(dec!(250.50));
        assert_eq!(p.income, dec!(350.50));
        assert!(!p.is_unique);
    }

    #[test]
    fn test_unique_threshold_flags_product() {
        let mut p = product();
        p.record_sale(UNIQUE_PURCHASE_AMOUNT);
        assert!(p.is_unique);
    }

    #[test]
    fn test_near_threshold_does_not_flag() {
        let mut p = product();
        p.record_sale(dec!(1999.99));
        p.record_sale(dec!(2000.01));
        assert!(!p.is_unique);
    }
}
