//! Axum handlers translating `PurchaseService`/`DurabilityWorker` outcomes
//! into the wire contract of spec.md §6.
//!
//! Pattern grounded on the teacher's `gateway/handlers/order.rs`: extract
//! state and query params, log each pipeline step with `tracing`, map the
//! service outcome to a response.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core_types::UserId;
use crate::service::{BuyOutcome, CancelOutcome};

use super::state::AppState;
use super::types::{already_purchased_body, sold_out_body, success_body, waiting_body, ApiError};

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

/// `GET /ticket?user_id=<opaque>`
pub async fn buy(State(state): State<AppState>, Query(q): Query<UserQuery>) -> impl IntoResponse {
    let user = UserId::from(q.user_id);
    tracing::info!(%user, "buy request received");

    match state.service.buy(user.clone()).await {
        BuyOutcome::Success { remaining_stock } => {
            tracing::info!(%user, remaining_stock, "purchase succeeded");
            success_body(remaining_stock).into_response()
        }
        BuyOutcome::Waiting { rank } => {
            tracing::info!(%user, rank, "user placed in waiting queue");
            waiting_body(rank).into_response()
        }
        BuyOutcome::AlreadyPurchased => {
            tracing::info!(%user, "duplicate purchase attempt rejected");
            already_purchased_body().into_response()
        }
        BuyOutcome::SoldOut => {
            tracing::info!(%user, "sold out");
            sold_out_body().into_response()
        }
        BuyOutcome::Fail => {
            tracing::error!(%user, "purchase pipeline failed");
            ApiError::internal("internal failure").into_response()
        }
    }
}

/// `GET /cancel?user_id=<opaque>`
pub async fn cancel(State(state): State<AppState>, Query(q): Query<UserQuery>) -> impl IntoResponse {
    let user = UserId::from(q.user_id);
    tracing::info!(%user, "cancel request received");

    match state.service.cancel(user.clone()).await {
        CancelOutcome::Accepted => {
            tracing::info!(%user, "cancel accepted");
            (
                axum::http::StatusCode::OK,
                Json(json!({ "success": true, "message": "cancel accepted" })),
            )
                .into_response()
        }
        CancelOutcome::Rejected => {
            tracing::info!(%user, "cancel rejected: not purchased");
            ApiError::not_purchased("not purchased").into_response()
        }
    }
}

/// `POST /admin/recover-dlq`, triggers `ProcessDLQ` asynchronously and
/// returns immediately.
pub async fn recover_dlq(State(state): State<AppState>) -> impl IntoResponse {
    let durability = Arc::clone(&state.durability);
    let idle_timeout = state.dlq_idle_timeout;
    tokio::spawn(async move {
        tracing::info!("dead-letter recovery triggered");
        durability.process_dlq(idle_timeout).await;
    });
    (
        axum::http::StatusCode::OK,
        Json(json!({ "success": true, "message": "recovery started" })),
    )
}

/// `[SUPPLEMENT]` `GET /healthz`, liveness probe grounded on the teacher's
/// `gateway/handlers/health.rs`. Not in spec.md, but a near-universal
/// ambient concern for any service the teacher ships.
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.store.health_check().await.is_ok();
    let cache_ok = state.cache.active_count().await.is_ok();

    if db_ok && cache_ok {
        (
            axum::http::StatusCode::OK,
            Json(json!({ "status": "ok", "database": true, "cache": true })),
        )
    } else {
        (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": db_ok, "cache": cache_ok })),
        )
    }
}
