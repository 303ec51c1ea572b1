use crate::domain::money::Amount;
use crate::domain::user::UserId;
use crate::domain::withdrawal::{WithdrawalId, WithdrawalRequest, WithdrawalStatus};
use crate::error::Result;
use crate::interfaces::http::AppState;
use axum::Json;
use axum::extract::{Path, State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct WithdrawalBody {
    pub id: u64,
    pub author_id: u64,
    pub amount: Decimal,
    pub status: WithdrawalStatus,
}

impl From<&WithdrawalRequest> for WithdrawalBody {
    fn from(request: &WithdrawalRequest) -> Self {
        Self {
            id: request.id.0,
            author_id: request.author.0,
            amount: request.amount,
            status: request.status,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateWithdrawalRequest {
    pub author_id: u64,
    pub amount: Decimal,
}

/// `POST /withdrawals`: books a cash-out request against the author's
/// available (unreserved) income.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateWithdrawalRequest>,
) -> Result<Json<WithdrawalBody>> {
    let amount = Amount::new(body.amount)?;
    let request = state
        .withdrawals
        .create(UserId(body.author_id), amount)
        .await?;
    Ok(Json((&request).into()))
}

/// `POST /withdrawals/{id}/approve`: re-checks and debits the author's
/// income atomically.
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<WithdrawalBody>> {
    let request = state.withdrawals.approve(WithdrawalId(id)).await?;
    Ok(Json((&request).into()))
}

/// `POST /withdrawals/{id}/reject`: frees the reserved amount.
pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<WithdrawalBody>> {
    let request = state.withdrawals.reject(WithdrawalId(id)).await?;
    Ok(Json((&request).into()))
}

/// `POST /withdrawals/{id}/complete`: marks an approved request as paid
/// out.
pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<WithdrawalBody>> {
    let request = state.withdrawals.complete(WithdrawalId(id)).await?;
    Ok(Json((&request).into()))
}
