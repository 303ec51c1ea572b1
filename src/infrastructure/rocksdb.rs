use crate::domain::ledger::{
    LedgerState, Redemption, SettleOutcome, Settlement, WalletReceipt,
};
use crate::domain::order::{Order, OrderDraft, OrderId, OrderSubject};
use crate::domain::plan::{MembershipPlan, PlanId};
use crate::domain::ports::Ledger;
use crate::domain::product::{Product, ProductId};
use crate::domain::token::{DownloadToken, TokenSpec};
use crate::domain::user::{UserAccount, UserId};
use crate::domain::withdrawal::{WithdrawalId, WithdrawalRequest};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const CF_USERS: &str = "users";
pub const CF_PRODUCTS: &str = "products";
pub const CF_PLANS: &str = "plans";
pub const CF_ORDERS: &str = "orders";
pub const CF_TOKENS: &str = "tokens";
pub const CF_WITHDRAWALS: &str = "withdrawals";

const COLUMN_FAMILIES: [&str; 6] = [
    CF_USERS,
    CF_PRODUCTS,
    CF_PLANS,
    CF_ORDERS,
    CF_TOKENS,
    CF_WITHDRAWALS,
];

fn storage_err(e: impl std::fmt::Display) -> PaymentError {
    PaymentError::StorageError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(storage_err)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(storage_err)
}

/// Persistent ledger backed by RocksDB.
///
/// The working set is the same [`LedgerState`] the in-memory ledger uses,
/// loaded at open; each unit of work runs against it under the write
/// guard and is then persisted as a single `WriteBatch`, one column
/// family per entity kind. The guard is held across the batch write so
/// disk order matches memory order.
#[derive(Clone)]
pub struct RocksDbLedger {
    db: Arc<DB>,
    state: Arc<RwLock<LedgerState>>,
}

impl RocksDbLedger {
    /// Opens or creates the database at `path` and loads the full working
    /// set.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, descriptors).map_err(storage_err)?;

        let mut state = LedgerState::new();
        Self::load(&db, &mut state)?;

        Ok(Self {
            db: Arc::new(db),
            state: Arc::new(RwLock::new(state)),
        })
    }

    fn load(db: &DB, state: &mut LedgerState) -> Result<()> {
        for (_, value) in Self::scan(db, CF_USERS)? {
            state.upsert_user(decode::<UserAccount>(&value)?);
        }
        for (_, value) in Self::scan(db, CF_PRODUCTS)? {
            state.upsert_product(decode::<Product>(&value)?);
        }
        for (_, value) in Self::scan(db, CF_PLANS)? {
            state.upsert_plan(decode::<MembershipPlan>(&value)?);
        }
        for (_, value) in Self::scan(db, CF_ORDERS)? {
            state.restore_order(decode::<Order>(&value)?);
        }
        for (_, value) in Self::scan(db, CF_TOKENS)? {
            state.restore_token(decode::<DownloadToken>(&value)?);
        }
        for (_, value) in Self::scan(db, CF_WITHDRAWALS)? {
            state.restore_withdrawal(decode::<WithdrawalRequest>(&value)?);
        }
        state.restore_counters();
        Ok(())
    }

    fn scan(db: &DB, name: &str) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>> {
        let cf = db
            .cf_handle(name)
            .ok_or_else(|| storage_err(format!("column family {name} not found")))?;
        db.iterator_cf(cf, IteratorMode::Start)
            .map(|item| item.map_err(storage_err))
            .collect()
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| storage_err(format!("column family {name} not found")))
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.db.write(batch).map_err(storage_err)
    }

    fn put_user(&self, state: &LedgerState, batch: &mut WriteBatch, id: UserId) -> Result<()> {
        let user = state
            .user(id)
            .ok_or_else(|| storage_err(format!("user {} missing after commit", id.0)))?;
        batch.put_cf(self.cf(CF_USERS)?, id.0.to_be_bytes(), encode(user)?);
        Ok(())
    }

    fn put_product(
        &self,
        state: &LedgerState,
        batch: &mut WriteBatch,
        id: ProductId,
    ) -> Result<()> {
        let product = state
            .product(id)
            .ok_or_else(|| storage_err(format!("product {} missing after commit", id.0)))?;
        batch.put_cf(self.cf(CF_PRODUCTS)?, id.0.to_be_bytes(), encode(product)?);
        Ok(())
    }

    fn put_order(&self, batch: &mut WriteBatch, order: &Order) -> Result<()> {
        batch.put_cf(self.cf(CF_ORDERS)?, order.id.0.to_be_bytes(), encode(order)?);
        Ok(())
    }

    fn put_token(&self, batch: &mut WriteBatch, token: &DownloadToken) -> Result<()> {
        batch.put_cf(self.cf(CF_TOKENS)?, token.value.as_bytes(), encode(token)?);
        Ok(())
    }

    fn put_withdrawal(&self, batch: &mut WriteBatch, request: &WithdrawalRequest) -> Result<()> {
        batch.put_cf(
            self.cf(CF_WITHDRAWALS)?,
            request.id.0.to_be_bytes(),
            encode(request)?,
        );
        Ok(())
    }

    /// Persists the entities a winning settlement touched.
    fn put_settlement(
        &self,
        state: &LedgerState,
        batch: &mut WriteBatch,
        order: &Order,
        token: Option<&DownloadToken>,
    ) -> Result<()> {
        self.put_order(batch, order)?;
        if let Some(token) = token {
            self.put_token(batch, token)?;
        }
        match order.subject {
            OrderSubject::Product(product_id) => {
                self.put_product(state, batch, product_id)?;
                let author = state
                    .product(product_id)
                    .ok_or_else(|| storage_err("product missing after commit"))?
                    .author;
                self.put_user(state, batch, author)?;
            }
            OrderSubject::Membership(_) | OrderSubject::TopUp => {
                if let Some(buyer) = order.buyer {
                    self.put_user(state, batch, buyer)?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for RocksDbLedger {
    async fn open_order(&self, draft: OrderDraft) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = state.open_order(draft, Utc::now())?;
        let mut batch = WriteBatch::default();
        self.put_order(&mut batch, &order)?;
        self.commit(batch)?;
        Ok(order)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.order(id).cloned())
    }

    async fn order_by_invoice(&self, invoice_id: &str) -> Result<Option<Order>> {
        Ok(self.state.read().await.order_by_invoice(invoice_id).cloned())
    }

    async fn settle_order(&self, id: OrderId, settlement: Settlement) -> Result<SettleOutcome> {
        let mut state = self.state.write().await;
        let outcome = state.settle_order(id, settlement, Utc::now())?;
        if let SettleOutcome::Won { order, token } = &outcome {
            let mut batch = WriteBatch::default();
            self.put_settlement(&state, &mut batch, order, token.as_ref())?;
            self.commit(batch)?;
        }
        Ok(outcome)
    }

    async fn cancel_order(&self, id: OrderId) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = state.cancel_order(id)?;
        let mut batch = WriteBatch::default();
        self.put_order(&mut batch, &order)?;
        self.commit(batch)?;
        Ok(order)
    }

    async fn valid_token_for_order(&self, id: OrderId) -> Result<Option<DownloadToken>> {
        Ok(self.state.read().await.valid_token_for_order(id, Utc::now()))
    }

    async fn issue_token(&self, id: OrderId, spec: TokenSpec) -> Result<DownloadToken> {
        let mut state = self.state.write().await;
        let token = state.issue_token(id, spec, Utc::now())?;
        let mut batch = WriteBatch::default();
        self.put_token(&mut batch, &token)?;
        self.commit(batch)?;
        Ok(token)
    }

    async fn redeem_token(&self, value: &str) -> Result<Redemption> {
        let mut state = self.state.write().await;
        let redemption = state.redeem_token(value, Utc::now())?;
        let mut batch = WriteBatch::default();
        self.put_token(&mut batch, &redemption.token)?;
        self.commit(batch)?;
        Ok(redemption)
    }

    async fn debit_purchase(
        &self,
        buyer: UserId,
        product: ProductId,
        amount: Decimal,
        author_credit: Decimal,
        spec: TokenSpec,
    ) -> Result<WalletReceipt> {
        let mut state = self.state.write().await;
        let receipt =
            state.debit_purchase(buyer, product, amount, author_credit, spec, Utc::now())?;
        let mut batch = WriteBatch::default();
        self.put_settlement(&state, &mut batch, &receipt.order, Some(&receipt.token))?;
        self.put_user(&state, &mut batch, buyer)?;
        self.commit(batch)?;
        Ok(receipt)
    }

    async fn create_withdrawal(
        &self,
        author: UserId,
        amount: Decimal,
    ) -> Result<WithdrawalRequest> {
        let mut state = self.state.write().await;
        let request = state.create_withdrawal(author, amount, Utc::now())?;
        let mut batch = WriteBatch::default();
        self.put_withdrawal(&mut batch, &request)?;
        self.commit(batch)?;
        Ok(request)
    }

    async fn approve_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        let mut state = self.state.write().await;
        let request = state.approve_withdrawal(id)?;
        let mut batch = WriteBatch::default();
        self.put_withdrawal(&mut batch, &request)?;
        self.put_user(&state, &mut batch, request.author)?;
        self.commit(batch)?;
        Ok(request)
    }

    async fn reject_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        let mut state = self.state.write().await;
        let request = state.reject_withdrawal(id)?;
        let mut batch = WriteBatch::default();
        self.put_withdrawal(&mut batch, &request)?;
        self.commit(batch)?;
        Ok(request)
    }

    async fn complete_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        let mut state = self.state.write().await;
        let request = state.complete_withdrawal(id)?;
        let mut batch = WriteBatch::default();
        self.put_withdrawal(&mut batch, &request)?;
        self.commit(batch)?;
        Ok(request)
    }

    async fn withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        Ok(self.state.read().await.withdrawal(id).cloned())
    }

    async fn user(&self, id: UserId) -> Result<Option<UserAccount>> {
        Ok(self.state.read().await.user(id).cloned())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.product(id).cloned())
    }

    async fn plan(&self, id: PlanId) -> Result<Option<MembershipPlan>> {
        Ok(self.state.read().await.plan(id).cloned())
    }

    async fn resolve_product(&self, public_id: &str) -> Result<Option<ProductId>> {
        Ok(self.state.read().await.resolve_product(public_id))
    }

    async fn upsert_user(&self, user: UserAccount) -> Result<()> {
        let mut state = self.state.write().await;
        let id = user.id;
        state.upsert_user(user);
        let mut batch = WriteBatch::default();
        self.put_user(&state, &mut batch, id)?;
        self.commit(batch)
    }

    async fn upsert_product(&self, product: Product) -> Result<()> {
        let mut state = self.state.write().await;
        let id = product.id;
        state.upsert_product(product);
        let mut batch = WriteBatch::default();
        self.put_product(&state, &mut batch, id)?;
        self.commit(batch)
    }

    async fn upsert_plan(&self, plan: MembershipPlan) -> Result<()> {
        let mut state = self.state.write().await;
        let encoded = encode(&plan)?;
        let key = plan.id.0.to_be_bytes();
        state.upsert_plan(plan);
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_PLANS)?, key, encoded);
        self.commit(batch)
    }
}
