#![cfg(feature = "storage-rocksdb")]

mod common;

use common::*;
use marketpay::application::reconciliation::ReconciliationEngine;
use marketpay::domain::order::{OrderDraft, OrderStatus, OrderSubject, PaymentMethod};
use marketpay::domain::ports::{GatewayStatus, LedgerRef};
use marketpay::infrastructure::rocksdb::RocksDbLedger;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn test_settlement_survives_restart() {
    let dir = tempdir().unwrap();

    let order_id;
    let token_value;
    {
        let ledger: LedgerRef = Arc::new(RocksDbLedger::open(dir.path()).unwrap());
        seed_catalog(&ledger).await;
        let order = ledger
            .open_order(OrderDraft {
                buyer: Some(BUYER),
                subject: OrderSubject::Product(PRODUCT),
                amount: dec!(100.00),
                method: PaymentMethod::Gateway,
                invoice_id: Some("inv-1".to_string()),
            })
            .await
            .unwrap();
        order_id = order.id;

        let engine = ReconciliationEngine::new(ledger.clone());
        let outcome = engine.reconcile("inv-1", GatewayStatus::Paid).await.unwrap();
        token_value = outcome.token.unwrap().value;
    }

    // Reopen from disk: the settled state must be intact.
    let ledger: LedgerRef = Arc::new(RocksDbLedger::open(dir.path()).unwrap());
    let order = ledger.order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Completed);

    let token = ledger.valid_token_for_order(order_id).await.unwrap().unwrap();
    assert_eq!(token.value, token_value);

    let author = ledger.user(AUTHOR).await.unwrap().unwrap();
    assert_eq!(author.point, dec!(30.00));
    let product = ledger.product(PRODUCT).await.unwrap().unwrap();
    assert_eq!(product.income, dec!(100.00));

    // A redelivered paid signal after restart is still a no-op.
    let engine = ReconciliationEngine::new(ledger.clone());
    let outcome = engine.reconcile("inv-1", GatewayStatus::Paid).await.unwrap();
    assert_eq!(outcome.token.unwrap().value, token_value);
    let author = ledger.user(AUTHOR).await.unwrap().unwrap();
    assert_eq!(author.point, dec!(30.00));
}

#[tokio::test]
async fn test_redeemed_token_stays_used_after_restart() {
    let dir = tempdir().unwrap();

    let token_value;
    {
        let ledger: LedgerRef = Arc::new(RocksDbLedger::open(dir.path()).unwrap());
        seed_catalog(&ledger).await;
        ledger
            .open_order(OrderDraft {
                buyer: Some(BUYER),
                subject: OrderSubject::Product(PRODUCT),
                amount: dec!(100.00),
                method: PaymentMethod::Gateway,
                invoice_id: Some("inv-1".to_string()),
            })
            .await
            .unwrap();
        let engine = ReconciliationEngine::new(ledger.clone());
        let outcome = engine.reconcile("inv-1", GatewayStatus::Paid).await.unwrap();
        token_value = outcome.token.unwrap().value;
        ledger.redeem_token(&token_value).await.unwrap();
    }

    let ledger: LedgerRef = Arc::new(RocksDbLedger::open(dir.path()).unwrap());
    let err = ledger.redeem_token(&token_value).await.unwrap_err();
    assert!(matches!(
        err,
        marketpay::error::PaymentError::TokenAlreadyUsed
    ));
}

#[tokio::test]
async fn test_order_ids_continue_after_restart() {
    let dir = tempdir().unwrap();

    let first_id;
    {
        let ledger: LedgerRef = Arc::new(RocksDbLedger::open(dir.path()).unwrap());
        seed_catalog(&ledger).await;
        first_id = ledger
            .open_order(OrderDraft {
                buyer: Some(BUYER),
                subject: OrderSubject::TopUp,
                amount: dec!(10.00),
                method: PaymentMethod::Gateway,
                invoice_id: Some("inv-1".to_string()),
            })
            .await
            .unwrap()
            .id;
    }

    let ledger: LedgerRef = Arc::new(RocksDbLedger::open(dir.path()).unwrap());
    let second = ledger
        .open_order(OrderDraft {
            buyer: Some(BUYER),
            subject: OrderSubject::TopUp,
            amount: dec!(10.00),
            method: PaymentMethod::Gateway,
            invoice_id: Some("inv-2".to_string()),
        })
        .await
        .unwrap();
    assert!(second.id.0 > first_id.0);
}
