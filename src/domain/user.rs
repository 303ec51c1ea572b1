use crate::domain::money::round2;
use crate::domain::plan::PlanId;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UserId(pub u64);

/// A marketplace account, buyer or author or both.
///
/// `income` is the spendable wallet balance: credited by sales and top-ups,
/// debited by wallet purchases and approved withdrawals. `point` is the
/// monotonic lifetime commission total and is never debited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    pub income: Decimal,
    pub point: Decimal,
    pub plan: Option<PlanId>,
}

impl UserAccount {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            income: Decimal::ZERO,
            point: Decimal::ZERO,
            plan: None,
        }
    }

    pub fn credit_income(&mut self, amount: Decimal) {
        self.income = round2(self.income + amount);
    }

    /// Debits the wallet balance; fails without mutating when the balance
    /// is insufficient.
    pub fn debit_income(&mut self, amount: Decimal) -> Result<()> {
        if self.income < amount {
            return Err(PaymentError::InsufficientBalance {
                required: amount,
                available: self.income,
            });
        }
        self.income = round2(self.income - amount);
        Ok(())
    }

    pub fn award_point(&mut self, amount: Decimal) {
        self.point = round2(self.point + amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_credit_and_debit() {
        let mut user = UserAccount::new(UserId(1), "author");
        user.credit_income(dec!(100.00));
        user.debit_income(dec!(40.00)).unwrap();
        assert_eq!(user.income, dec!(60.00));
    }

    #[test]
    fn test_debit_insufficient() {
        let mut user = UserAccount::new(UserId(1), "buyer");
        user.credit_income(dec!(10.00));
        let err = user.debit_income(dec!(10.01)).unwrap_err();
        assert!(matches!(
            err,
            PaymentError::InsufficientBalance { required, available }
                if required == dec!(10.01) && available == dec!(10.00)
        ));
        assert_eq!(user.income, dec!(10.00));
    }

    #[test]
    fn test_debit_to_exactly_zero() {
        let mut user = UserAccount::new(UserId(1), "buyer");
        user.credit_income(dec!(5000));
        user.debit_income(dec!(5000)).unwrap();
        assert_eq!(user.income, dec!(0));
    }

    #[test]
    fn test_points_are_separate_from_income() {
        let mut user = UserAccount::new(UserId(1), "author");
        user.award_point(dec!(35.00));
        assert_eq!(user.point, dec!(35.00));
        assert_eq!(user.income, dec!(0));
    }
}
