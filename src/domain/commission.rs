use crate::domain::money::round2;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Commission percentage applied when the selling author has no membership
/// plan.
pub const DEFAULT_COMMISSION_PERCENT: Decimal = dec!(30);

/// Order amount that flags the product as a "unique" promotion on sale.
pub const UNIQUE_PURCHASE_AMOUNT: Decimal = dec!(2000);

/// Computes the author commission for a sale.
///
/// This is the single rounding authority shared by the gateway settlement
/// path and the wallet purchase path.
pub fn commission(amount: Decimal, percentage: Decimal) -> Decimal {
    round2(amount * percentage / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_whole_amount() {
        assert_eq!(commission(dec!(10000), dec!(35)), dec!(3500.00));
    }

    #[test]
    fn test_commission_rounds_half_up() {
        // 333.33 * 35% = 116.6655 -> 116.67
        assert_eq!(commission(dec!(333.33), dec!(35)), dec!(116.67));
        // 0.01 * 30% = 0.003 -> 0.00
        assert_eq!(commission(dec!(0.01), dec!(30)), dec!(0.00));
        // 0.05 * 30% = 0.015 -> 0.02
        assert_eq!(commission(dec!(0.05), dec!(30)), dec!(0.02));
    }

    #[test]
    fn test_commission_default_percent() {
        assert_eq!(
            commission(dec!(2000), DEFAULT_COMMISSION_PERCENT),
            dec!(600.00)
        );
    }
}
