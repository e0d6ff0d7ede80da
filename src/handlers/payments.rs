//! Payment handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::middleware::AuthUser;
use crate::models::*;
use crate::state::AppState;
use crate::utils::errors::Result;

/// Handle GET /api/payments/checkout/:event_id
pub async fn checkout(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Json<CheckoutSummary>> {
    Ok(Json(state.services.payment_service.checkout(&identity, event_id).await?))
}

/// Handle POST /api/payments/orders - open a gateway order for a paid event
pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderSummary>)> {
    let order = state
        .services
        .payment_service
        .create_order(&identity, request.event_id)
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// Handle POST /api/payments/verify - confirm the gateway callback and register
pub async fn verify_payment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<VerificationOutcome>> {
    Ok(Json(state.services.payment_service.verify_payment(&identity, request).await?))
}
