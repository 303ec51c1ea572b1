mod common;

use common::*;
use marketpay::application::reconciliation::ReconciliationEngine;
use marketpay::domain::order::{Order, OrderDraft, OrderStatus, OrderSubject, PaymentMethod};
use marketpay::domain::ports::{GatewayStatus, LedgerRef};
use marketpay::error::PaymentError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

async fn open_gateway_order(ledger: &LedgerRef, invoice_id: &str, amount: Decimal) -> Order {
    ledger
        .open_order(OrderDraft {
            buyer: Some(BUYER),
            subject: OrderSubject::Product(PRODUCT),
            amount,
            method: PaymentMethod::Gateway,
            invoice_id: Some(invoice_id.to_string()),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_paid_signal_completes_order_with_default_commission() {
    let ledger = in_memory_ledger();
    seed_catalog(&ledger).await;
    open_gateway_order(&ledger, "inv-1", dec!(100.00)).await;
    let engine = ReconciliationEngine::new(ledger.clone());

    let outcome = engine.reconcile("inv-1", GatewayStatus::Paid).await.unwrap();

    assert_eq!(outcome.order.status, OrderStatus::Completed);
    assert!(outcome.token.is_some());
    // Author has no plan, so the 30% default applies.
    let author = ledger.user(AUTHOR).await.unwrap().unwrap();
    assert_eq!(author.point, dec!(30.00));
    let product = ledger.product(PRODUCT).await.unwrap().unwrap();
    assert_eq!(product.income, dec!(100.00));
}

#[tokio::test]
async fn test_plan_commission_percentage_applies() {
    let ledger = in_memory_ledger();
    seed_catalog(&ledger).await;
    enroll_author(&ledger).await;
    open_gateway_order(&ledger, "inv-1", dec!(10000)).await;
    let engine = ReconciliationEngine::new(ledger.clone());

    engine.reconcile("inv-1", GatewayStatus::Paid).await.unwrap();

    let author = ledger.user(AUTHOR).await.unwrap().unwrap();
    assert_eq!(author.point, dec!(3500.00));
}

#[tokio::test]
async fn test_repeated_paid_signals_settle_exactly_once() {
    let ledger = in_memory_ledger();
    seed_catalog(&ledger).await;
    open_gateway_order(&ledger, "inv-1", dec!(100.00)).await;
    let engine = ReconciliationEngine::new(ledger.clone());

    let first = engine.reconcile("inv-1", GatewayStatus::Paid).await.unwrap();
    let second = engine.reconcile("inv-1", GatewayStatus::Paid).await.unwrap();
    let third = engine.reconcile("inv-1", GatewayStatus::Paid).await.unwrap();

    // Every caller sees the same token, and the credits applied once.
    let value = first.token.as_ref().unwrap().value.clone();
    assert_eq!(second.token.unwrap().value, value);
    assert_eq!(third.token.unwrap().value, value);

    let author = ledger.user(AUTHOR).await.unwrap().unwrap();
    assert_eq!(author.point, dec!(30.00));
    let product = ledger.product(PRODUCT).await.unwrap().unwrap();
    assert_eq!(product.income, dec!(100.00));
}

#[tokio::test]
async fn test_concurrent_paid_signals_have_one_winner() {
    let ledger = in_memory_ledger();
    seed_catalog(&ledger).await;
    let order = open_gateway_order(&ledger, "inv-1", dec!(100.00)).await;
    let engine = ReconciliationEngine::new(ledger.clone());

    // Webhook delivery, webhook retry and a client poll all racing.
    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.reconcile("inv-1", GatewayStatus::Paid).await
        }));
    }
    let mut token_values = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Completed);
        token_values.push(outcome.token.unwrap().value);
    }

    // Exactly one token exists; every caller got that one.
    token_values.dedup();
    assert_eq!(token_values.len(), 1);
    let stored = ledger.valid_token_for_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.value, token_values[0]);

    // The side effects of completion happened exactly once.
    let author = ledger.user(AUTHOR).await.unwrap().unwrap();
    assert_eq!(author.point, dec!(30.00));
    let product = ledger.product(PRODUCT).await.unwrap().unwrap();
    assert_eq!(product.income, dec!(100.00));
}

#[tokio::test]
async fn test_pending_signal_changes_nothing() {
    let ledger = in_memory_ledger();
    seed_catalog(&ledger).await;
    open_gateway_order(&ledger, "inv-1", dec!(100.00)).await;
    let engine = ReconciliationEngine::new(ledger.clone());

    let outcome = engine
        .reconcile("inv-1", GatewayStatus::Pending)
        .await
        .unwrap();

    assert_eq!(outcome.order.status, OrderStatus::Pending);
    assert!(outcome.token.is_none());
    let author = ledger.user(AUTHOR).await.unwrap().unwrap();
    assert_eq!(author.point, dec!(0));
}

#[tokio::test]
async fn test_cancelled_signal_finalises_order() {
    let ledger = in_memory_ledger();
    seed_catalog(&ledger).await;
    open_gateway_order(&ledger, "inv-1", dec!(100.00)).await;
    let engine = ReconciliationEngine::new(ledger.clone());

    let outcome = engine
        .reconcile("inv-1", GatewayStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(outcome.order.status, OrderStatus::Cancelled);

    // A late paid signal for the cancelled order applies nothing.
    let late = engine.reconcile("inv-1", GatewayStatus::Paid).await.unwrap();
    assert_eq!(late.order.status, OrderStatus::Cancelled);
    assert!(late.token.is_none());
    let product = ledger.product(PRODUCT).await.unwrap().unwrap();
    assert_eq!(product.income, dec!(0));
}

#[tokio::test]
async fn test_cancelled_signal_after_completion_is_ignored() {
    let ledger = in_memory_ledger();
    seed_catalog(&ledger).await;
    open_gateway_order(&ledger, "inv-1", dec!(100.00)).await;
    let engine = ReconciliationEngine::new(ledger.clone());

    engine.reconcile("inv-1", GatewayStatus::Paid).await.unwrap();
    let outcome = engine
        .reconcile("inv-1", GatewayStatus::Cancelled)
        .await
        .unwrap();

    // Completed is terminal and authoritative; the token stays reachable.
    assert_eq!(outcome.order.status, OrderStatus::Completed);
    assert!(outcome.token.is_some());
}

#[tokio::test]
async fn test_unknown_invoice_is_not_found() {
    let ledger = in_memory_ledger();
    seed_catalog(&ledger).await;
    let engine = ReconciliationEngine::new(ledger.clone());

    let err = engine
        .reconcile("inv-404", GatewayStatus::Paid)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::NotFound(_)));
}

#[tokio::test]
async fn test_unique_purchase_amount_flags_product() {
    let ledger = in_memory_ledger();
    seed_catalog(&ledger).await;
    open_gateway_order(&ledger, "inv-1", dec!(2000)).await;
    let engine = ReconciliationEngine::new(ledger.clone());

    assert!(!ledger.product(PRODUCT).await.unwrap().unwrap().is_unique);
    engine.reconcile("inv-1", GatewayStatus::Paid).await.unwrap();
    assert!(ledger.product(PRODUCT).await.unwrap().unwrap().is_unique);
}

#[tokio::test]
async fn test_membership_settlement_assigns_plan() {
    let ledger = in_memory_ledger();
    seed_catalog(&ledger).await;
    ledger
        .open_order(OrderDraft {
            buyer: Some(BUYER),
            subject: OrderSubject::Membership(PLAN),
            amount: dec!(500.00),
            method: PaymentMethod::Gateway,
            invoice_id: Some("inv-m".to_string()),
        })
        .await
        .unwrap();
    let engine = ReconciliationEngine::new(ledger.clone());

    let outcome = engine.reconcile("inv-m", GatewayStatus::Paid).await.unwrap();

    assert_eq!(outcome.order.status, OrderStatus::Completed);
    assert!(outcome.token.is_none());
    let buyer = ledger.user(BUYER).await.unwrap().unwrap();
    assert_eq!(buyer.plan, Some(PLAN));
}

#[tokio::test]
async fn test_topup_settlement_credits_wallet() {
    let ledger = in_memory_ledger();
    seed_catalog(&ledger).await;
    ledger
        .open_order(OrderDraft {
            buyer: Some(BUYER),
            subject: OrderSubject::TopUp,
            amount: dec!(250.00),
            method: PaymentMethod::Gateway,
            invoice_id: Some("inv-t".to_string()),
        })
        .await
        .unwrap();
    let engine = ReconciliationEngine::new(ledger.clone());

    engine.reconcile("inv-t", GatewayStatus::Paid).await.unwrap();
    // Redelivery must not credit twice.
    engine.reconcile("inv-t", GatewayStatus::Paid).await.unwrap();

    let buyer = ledger.user(BUYER).await.unwrap().unwrap();
    assert_eq!(buyer.income, dec!(250.00));
}
