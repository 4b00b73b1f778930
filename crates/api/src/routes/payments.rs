//! Gateway webhook endpoint.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use checkout::{PaymentGateway, WebhookOutcome};
use ledger::{CatalogStore, OrderLedger};
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::orders::AppState;

/// Header carrying the webhook body signature.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
}

/// POST /payments/webhook — apply a signed gateway event.
#[tracing::instrument(skip_all)]
pub async fn webhook<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError>
where
    S: CatalogStore + OrderLedger + 'static,
    G: PaymentGateway + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let status = match state.checkout.handle_webhook(&body, signature).await? {
        WebhookOutcome::Confirmed(_) => "confirmed",
        WebhookOutcome::Failed(_) => "failed",
        WebhookOutcome::Rejected { .. } => "rejected",
        WebhookOutcome::UnknownOrder { .. } => "unknown_order",
        WebhookOutcome::Ignored(_) => "ignored",
    };
    Ok(Json(WebhookResponse { status }))
}
