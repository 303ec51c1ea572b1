use crate::error::Result;
use crate::interfaces::http::AppState;
use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

#[derive(Serialize)]
pub struct DownloadResponse {
    pub file_url: String,
}

/// `GET /downloads/{token}`: redeems a single-use download token and
/// hands out the product file locator. A second attempt on the same
/// token fails.
pub async fn redeem(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<DownloadResponse>> {
    let redemption = state.issuer.redeem(&token).await?;
    Ok(Json(DownloadResponse {
        file_url: redemption.file_url,
    }))
}
