use crate::domain::order::{Order, OrderDraft, OrderId, OrderStatus, OrderSubject, PaymentMethod};
use crate::domain::plan::{MembershipPlan, PlanId};
use crate::domain::product::{Product, ProductId};
use crate::domain::token::{DownloadToken, TokenSpec};
use crate::domain::user::{UserAccount, UserId};
use crate::domain::withdrawal::{WithdrawalId, WithdrawalRequest, WithdrawalStatus};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// The side effects to apply if the completion claim is won.
///
/// The commission credit is computed by the caller (the single commission
/// calculator); the token spec is minted by the caller and bound to the
/// order inside the atomic unit. Non-product orders carry no token.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub author_credit: Decimal,
    pub token: Option<TokenSpec>,
}

/// Result of a completion claim attempt.
#[derive(Debug, Clone)]
pub enum SettleOutcome {
    /// This caller won the claim and the side effects were applied.
    Won {
        order: Order,
        token: Option<DownloadToken>,
    },
    /// Another caller completed the order first; no side effects were
    /// applied, the existing token (if any is still valid) is returned.
    AlreadyCompleted {
        order: Order,
        token: Option<DownloadToken>,
    },
    /// The order was cancelled before payment; nothing to apply.
    Cancelled { order: Order },
}

impl SettleOutcome {
    pub fn order(&self) -> &Order {
        match self {
            Self::Won { order, .. }
            | Self::AlreadyCompleted { order, .. }
            | Self::Cancelled { order } => order,
        }
    }

    pub fn token(&self) -> Option<&DownloadToken> {
        match self {
            Self::Won { token, .. } | Self::AlreadyCompleted { token, .. } => token.as_ref(),
            Self::Cancelled { .. } => None,
        }
    }
}

/// A successful token redemption: the consumed token and the product file
/// locator it unlocked.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub file_url: String,
    pub token: DownloadToken,
}

/// Outcome of a wallet purchase: the completed order, the issued token and
/// the buyer's balance after the debit.
#[derive(Debug, Clone)]
pub struct WalletReceipt {
    pub order: Order,
    pub token: DownloadToken,
    pub balance: Decimal,
}

/// The transactional working set of the marketplace ledger.
///
/// All entity maps live behind one storage guard held by the caller (see
/// the infrastructure implementations), so every method here executes as
/// one atomic unit: preconditions are checked and side effects applied
/// while no other handler can observe intermediate state. Methods validate
/// everything fallible before the first mutation, which is what makes the
/// unit all-or-nothing.
#[derive(Debug, Default)]
pub struct LedgerState {
    orders: HashMap<OrderId, Order>,
    orders_by_invoice: HashMap<String, OrderId>,
    tokens: HashMap<String, DownloadToken>,
    tokens_by_order: HashMap<OrderId, Vec<String>>,
    users: HashMap<UserId, UserAccount>,
    products: HashMap<ProductId, Product>,
    products_by_public: HashMap<String, ProductId>,
    plans: HashMap<PlanId, MembershipPlan>,
    withdrawals: HashMap<WithdrawalId, WithdrawalRequest>,
    next_order_id: u64,
    next_withdrawal_id: u64,
}

impl LedgerState {
    pub fn new() -> Self {
        Self {
            next_order_id: 1,
            next_withdrawal_id: 1,
            ..Self::default()
        }
    }

    // ---- catalog ----

    pub fn upsert_user(&mut self, user: UserAccount) {
        self.users.insert(user.id, user);
    }

    pub fn upsert_product(&mut self, product: Product) {
        self.products_by_public
            .insert(product.public_id.clone(), product.id);
        self.products.insert(product.id, product);
    }

    pub fn upsert_plan(&mut self, plan: MembershipPlan) {
        self.plans.insert(plan.id, plan);
    }

    pub fn user(&self, id: UserId) -> Option<&UserAccount> {
        self.users.get(&id)
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn plan(&self, id: PlanId) -> Option<&MembershipPlan> {
        self.plans.get(&id)
    }

    pub fn resolve_product(&self, public_id: &str) -> Option<ProductId> {
        self.products_by_public.get(public_id).copied()
    }

    // ---- orders ----

    pub fn open_order(&mut self, draft: OrderDraft, now: DateTime<Utc>) -> Result<Order> {
        if let OrderSubject::Product(pid) = draft.subject
            && !self.products.contains_key(&pid)
        {
            return Err(PaymentError::NotFound(format!("product {}", pid.0)));
        }
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        let order = Order {
            id,
            buyer: draft.buyer,
            subject: draft.subject,
            amount: draft.amount,
            method: draft.method,
            status: OrderStatus::Pending,
            invoice_id: draft.invoice_id,
            created_at: now,
        };
        if let Some(invoice_id) = &order.invoice_id {
            self.orders_by_invoice.insert(invoice_id.clone(), id);
        }
        self.orders.insert(id, order.clone());
        Ok(order)
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn order_by_invoice(&self, invoice_id: &str) -> Option<&Order> {
        self.orders_by_invoice
            .get(invoice_id)
            .and_then(|id| self.orders.get(id))
    }

    /// Attempts the completion claim for an order and, on winning, applies
    /// every side effect of the settlement as one unit.
    ///
    /// Exactly one caller among any number of concurrent invocations
    /// observes `Won`; every other caller gets `AlreadyCompleted` with the
    /// existing token and no side effects.
    pub fn settle_order(
        &mut self,
        id: OrderId,
        settlement: Settlement,
        now: DateTime<Utc>,
    ) -> Result<SettleOutcome> {
        let order = self
            .orders
            .get(&id)
            .ok_or_else(|| PaymentError::NotFound(format!("order {}", id.0)))?
            .clone();

        match order.status {
            OrderStatus::Cancelled => Ok(SettleOutcome::Cancelled { order }),
            OrderStatus::Completed => Ok(SettleOutcome::AlreadyCompleted {
                token: self.valid_token_for_order(id, now),
                order,
            }),
            OrderStatus::Pending => self.apply_settlement(order, settlement),
        }
    }

    fn apply_settlement(&mut self, order: Order, settlement: Settlement) -> Result<SettleOutcome> {
        let token = match order.subject {
            OrderSubject::Product(pid) => {
                let product = self
                    .products
                    .get(&pid)
                    .ok_or_else(|| PaymentError::NotFound(format!("product {}", pid.0)))?;
                let author_id = product.author;
                if !self.users.contains_key(&author_id) {
                    return Err(PaymentError::NotFound(format!("user {}", author_id.0)));
                }
                let spec = settlement.token.ok_or_else(|| {
                    PaymentError::ValidationError(
                        "product settlement requires token material".to_string(),
                    )
                })?;

                self.product_mut(pid)?.record_sale(order.amount);
                self.user_mut(author_id)?
                    .award_point(settlement.author_credit);
                let token = DownloadToken::bind(spec, order.id, pid, order.buyer);
                self.insert_token(token.clone());
                Some(token)
            }
            OrderSubject::Membership(plan_id) => {
                let buyer_id = order.buyer.ok_or_else(|| {
                    PaymentError::ValidationError("membership order has no buyer".to_string())
                })?;
                if !self.plans.contains_key(&plan_id) {
                    return Err(PaymentError::NotFound(format!("plan {}", plan_id.0)));
                }
                self.user_mut(buyer_id)?.plan = Some(plan_id);
                None
            }
            OrderSubject::TopUp => {
                let buyer_id = order.buyer.ok_or_else(|| {
                    PaymentError::ValidationError("top-up order has no buyer".to_string())
                })?;
                self.user_mut(buyer_id)?.credit_income(order.amount);
                None
            }
        };

        let stored = self.order_mut(order.id)?;
        stored.complete()?;
        Ok(SettleOutcome::Won {
            order: stored.clone(),
            token,
        })
    }

    /// Finalises a pending order as cancelled. Terminal orders are
    /// returned unchanged: the claim already decided their fate.
    pub fn cancel_order(&mut self, id: OrderId) -> Result<Order> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| PaymentError::NotFound(format!("order {}", id.0)))?;
        if order.status == OrderStatus::Pending {
            order.cancel()?;
        }
        Ok(order.clone())
    }

    // ---- tokens ----

    pub fn valid_token_for_order(&self, id: OrderId, now: DateTime<Utc>) -> Option<DownloadToken> {
        self.tokens_by_order.get(&id)?.iter().find_map(|value| {
            self.tokens
                .get(value)
                .filter(|token| token.is_valid(now))
                .cloned()
        })
    }

    pub fn token(&self, value: &str) -> Option<&DownloadToken> {
        self.tokens.get(value)
    }

    /// Idempotent issuance for a completed product order: an existing
    /// valid token is returned unchanged, otherwise the provided material
    /// is bound and stored. The supplied spec is discarded when a valid
    /// token already exists.
    pub fn issue_token(
        &mut self,
        order_id: OrderId,
        spec: TokenSpec,
        now: DateTime<Utc>,
    ) -> Result<DownloadToken> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or_else(|| PaymentError::NotFound(format!("order {}", order_id.0)))?;
        if order.status != OrderStatus::Completed {
            return Err(PaymentError::ValidationError(format!(
                "order {} is not completed",
                order_id.0
            )));
        }
        let product_id = order.product_id().ok_or_else(|| {
            PaymentError::ValidationError(format!("order {} has no product", order_id.0))
        })?;
        if let Some(existing) = self.valid_token_for_order(order_id, now) {
            return Ok(existing);
        }
        let token = DownloadToken::bind(spec, order_id, product_id, order.buyer);
        self.insert_token(token.clone());
        Ok(token)
    }

    /// Claim-style redemption: checks and consumes the token in the same
    /// guarded unit, so two simultaneous attempts cannot both succeed.
    pub fn redeem_token(&mut self, value: &str, now: DateTime<Utc>) -> Result<Redemption> {
        let token = self
            .tokens
            .get(value)
            .ok_or_else(|| PaymentError::NotFound("download token".to_string()))?;
        let file_url = self
            .products
            .get(&token.product)
            .ok_or_else(|| PaymentError::NotFound(format!("product {}", token.product.0)))?
            .file_url
            .clone();

        let token = self
            .tokens
            .get_mut(value)
            .ok_or_else(|| PaymentError::NotFound("download token".to_string()))?;
        token.redeem(now)?;
        Ok(Redemption {
            file_url,
            token: token.clone(),
        })
    }

    fn insert_token(&mut self, token: DownloadToken) {
        self.tokens_by_order
            .entry(token.order)
            .or_default()
            .push(token.value.clone());
        self.tokens.insert(token.value.clone(), token);
    }

    // ---- wallet purchases ----

    /// The wallet purchase unit: balance check, debit, completed order,
    /// token issuance, product income and author commission: all or
    /// nothing. The balance precondition is enforced here, inside the same
    /// unit as the debit, never from an earlier read.
    pub fn debit_purchase(
        &mut self,
        buyer_id: UserId,
        product_id: ProductId,
        amount: Decimal,
        author_credit: Decimal,
        spec: TokenSpec,
        now: DateTime<Utc>,
    ) -> Result<WalletReceipt> {
        let product = self
            .products
            .get(&product_id)
            .ok_or_else(|| PaymentError::NotFound(format!("product {}", product_id.0)))?;
        let author_id = product.author;
        if !self.users.contains_key(&author_id) {
            return Err(PaymentError::NotFound(format!("user {}", author_id.0)));
        }
        let buyer = self
            .users
            .get(&buyer_id)
            .ok_or_else(|| PaymentError::NotFound(format!("user {}", buyer_id.0)))?;
        if buyer.income < amount {
            return Err(PaymentError::InsufficientBalance {
                required: amount,
                available: buyer.income,
            });
        }

        self.user_mut(buyer_id)?.debit_income(amount)?;

        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        // Trust is established synchronously at call time, so the order is
        // born completed; there is no pending phase to reconcile.
        let order = Order {
            id,
            buyer: Some(buyer_id),
            subject: OrderSubject::Product(product_id),
            amount,
            method: PaymentMethod::Wallet,
            status: OrderStatus::Completed,
            invoice_id: None,
            created_at: now,
        };
        self.orders.insert(id, order.clone());

        self.product_mut(product_id)?.record_sale(amount);
        self.user_mut(author_id)?.award_point(author_credit);

        let token = DownloadToken::bind(spec, id, product_id, Some(buyer_id));
        self.insert_token(token.clone());

        let balance = self.user_mut(buyer_id)?.income;
        Ok(WalletReceipt {
            order,
            token,
            balance,
        })
    }

    // ---- withdrawals ----

    /// Books a cash-out request against the author's available balance:
    /// current income minus everything already reserved by pending and
    /// approved requests.
    pub fn create_withdrawal(
        &mut self,
        author_id: UserId,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalRequest> {
        let author = self
            .users
            .get(&author_id)
            .ok_or_else(|| PaymentError::NotFound(format!("user {}", author_id.0)))?;
        let reserved: Decimal = self
            .withdrawals
            .values()
            .filter(|w| w.author == author_id && w.reserves_balance())
            .map(|w| w.amount)
            .sum();
        let available = author.income - reserved;
        if amount > available {
            return Err(PaymentError::InsufficientBalance {
                required: amount,
                available,
            });
        }

        let id = WithdrawalId(self.next_withdrawal_id);
        self.next_withdrawal_id += 1;
        let request = WithdrawalRequest {
            id,
            author: author_id,
            amount,
            status: WithdrawalStatus::Pending,
            created_at: now,
        };
        self.withdrawals.insert(id, request.clone());
        Ok(request)
    }

    /// Approves a request, re-checking the author's income at approval
    /// time and decrementing it in the same unit. A second concurrent
    /// approval re-evaluates against the already-decremented balance.
    pub fn approve_withdrawal(&mut self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        let request = self
            .withdrawals
            .get(&id)
            .ok_or_else(|| PaymentError::NotFound(format!("withdrawal {}", id.0)))?
            .clone();
        if request.status != WithdrawalStatus::Pending {
            return Err(PaymentError::ValidationError(format!(
                "withdrawal {} is not pending",
                id.0
            )));
        }
        let author = self
            .users
            .get(&request.author)
            .ok_or_else(|| PaymentError::NotFound(format!("user {}", request.author.0)))?;
        if author.income < request.amount {
            return Err(PaymentError::InsufficientBalance {
                required: request.amount,
                available: author.income,
            });
        }

        self.user_mut(request.author)?.debit_income(request.amount)?;
        let stored = self.withdrawal_mut(id)?;
        stored.approve()?;
        Ok(stored.clone())
    }

    pub fn reject_withdrawal(&mut self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        let request = self.withdrawal_mut(id)?;
        request.reject()?;
        Ok(request.clone())
    }

    pub fn complete_withdrawal(&mut self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        let request = self.withdrawal_mut(id)?;
        request.complete()?;
        Ok(request.clone())
    }

    pub fn withdrawal(&self, id: WithdrawalId) -> Option<&WithdrawalRequest> {
        self.withdrawals.get(&id)
    }

    // ---- restore (used by persistent stores when loading) ----

    pub fn restore_order(&mut self, order: Order) {
        if let Some(invoice_id) = &order.invoice_id {
            self.orders_by_invoice.insert(invoice_id.clone(), order.id);
        }
        self.orders.insert(order.id, order);
    }

    pub fn restore_token(&mut self, token: DownloadToken) {
        self.insert_token(token);
    }

    pub fn restore_withdrawal(&mut self, request: WithdrawalRequest) {
        self.withdrawals.insert(request.id, request);
    }

    /// Recomputes the id counters after a load; ids are monotonic, so the
    /// next free id is one past the maximum seen.
    pub fn restore_counters(&mut self) {
        self.next_order_id = self.orders.keys().map(|id| id.0).max().unwrap_or(0) + 1;
        self.next_withdrawal_id = self.withdrawals.keys().map(|id| id.0).max().unwrap_or(0) + 1;
    }

    // ---- internal ----

    fn product_mut(&mut self, id: ProductId) -> Result<&mut Product> {
        self.products
            .get_mut(&id)
            .ok_or_else(|| PaymentError::NotFound(format!("product {}", id.0)))
    }

    fn user_mut(&mut self, id: UserId) -> Result<&mut UserAccount> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| PaymentError::NotFound(format!("user {}", id.0)))
    }

    fn order_mut(&mut self, id: OrderId) -> Result<&mut Order> {
        self.orders
            .get_mut(&id)
            .ok_or_else(|| PaymentError::NotFound(format!("order {}", id.0)))
    }

    fn withdrawal_mut(&mut self, id: WithdrawalId) -> Result<&mut WithdrawalRequest> {
        self.withdrawals
            .get_mut(&id)
            .ok_or_else(|| PaymentError::NotFound(format!("withdrawal {}", id.0)))
    }
}
