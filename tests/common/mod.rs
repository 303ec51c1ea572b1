#![allow(dead_code)]

use axum::Router;
use marketpay::domain::plan::{MembershipPlan, PlanId};
use marketpay::domain::ports::LedgerRef;
use marketpay::domain::product::{Product, ProductId};
use marketpay::domain::user::{UserAccount, UserId};
use marketpay::infrastructure::gateway::StubGateway;
use marketpay::infrastructure::in_memory::InMemoryLedger;
use marketpay::interfaces::http::{AppState, router};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub const AUTHOR: UserId = UserId(1);
pub const BUYER: UserId = UserId(2);
pub const PRODUCT: ProductId = ProductId(10);
pub const PLAN: PlanId = PlanId(5);

pub const FILE_URL: &str = "https://cdn.example/files/prod-a";

pub fn in_memory_ledger() -> LedgerRef {
    Arc::new(InMemoryLedger::new())
}

/// Seeds one author (no plan), one buyer and one product owned by the
/// author, plus a 35% membership plan nobody is enrolled in yet.
pub async fn seed_catalog(ledger: &LedgerRef) {
    ledger
        .upsert_user(UserAccount::new(AUTHOR, "author"))
        .await
        .unwrap();
    ledger
        .upsert_user(UserAccount::new(BUYER, "buyer"))
        .await
        .unwrap();
    ledger
        .upsert_product(Product {
            id: PRODUCT,
            public_id: "prod-a".to_string(),
            author: AUTHOR,
            title: "Sample pack".to_string(),
            price: dec!(100.00),
            income: Decimal::ZERO,
            is_unique: false,
            file_url: FILE_URL.to_string(),
        })
        .await
        .unwrap();
    ledger
        .upsert_plan(MembershipPlan {
            id: PLAN,
            name: "Gold".to_string(),
            price: dec!(500.00),
            commission_percent: dec!(35),
        })
        .await
        .unwrap();
}

/// Overwrites a user's spendable balance.
pub async fn set_income(ledger: &LedgerRef, user: UserId, income: Decimal) {
    let mut account = ledger.user(user).await.unwrap().unwrap();
    account.income = income;
    ledger.upsert_user(account).await.unwrap();
}

/// Enrolls the seeded author in the 35% plan.
pub async fn enroll_author(ledger: &LedgerRef) {
    let mut account = ledger.user(AUTHOR).await.unwrap().unwrap();
    account.plan = Some(PLAN);
    ledger.upsert_user(account).await.unwrap();
}

/// A router over a freshly seeded in-memory ledger and stub gateway.
pub async fn test_app() -> (Router, LedgerRef, Arc<StubGateway>) {
    let ledger = in_memory_ledger();
    seed_catalog(&ledger).await;
    let gateway = Arc::new(StubGateway::new());
    let state = AppState::new(ledger.clone(), gateway.clone());
    (router(state), ledger, gateway)
}
