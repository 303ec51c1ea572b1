use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PlanId(pub u64);

/// A membership tier. Determines the commission percentage credited to an
/// author on each sale; purchasable through a membership order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipPlan {
    pub id: PlanId,
    pub name: String,
    pub price: Decimal,
    pub commission_percent: Decimal,
}
