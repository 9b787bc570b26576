use axum::{extract::State, response::Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::payments::{PaymentIntentResponse, VerifyPaymentRequest, VerifyPaymentResponse},
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateIntentRequest {
    pub order_id: Uuid,
}

/// Create a payment intent for an online order. The charged amount comes
/// from the stored quote, never from the request.
#[utoipa::path(
    post,
    path = "/api/v1/payments/intent",
    request_body = CreateIntentRequest,
    responses(
        (status = 200, description = "Intent created", body = ApiResponse<PaymentIntentResponse>),
        (status = 400, description = "Order is not payable online", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order already paid", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "payments"
)]
pub async fn create_intent(
    State(state): State<AppState>,
    Json(request): Json<CreateIntentRequest>,
) -> Result<Json<ApiResponse<PaymentIntentResponse>>, ServiceError> {
    let response = state.services.payment.create_intent(request.order_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Verify a gateway checkout callback. On a valid signature the order is
/// marked paid; verification is idempotent. A bad signature changes nothing.
#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified and recorded", body = ApiResponse<VerifyPaymentResponse>),
        (status = 400, description = "Signature mismatch", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<ApiResponse<VerifyPaymentResponse>>, ServiceError> {
    let (response, _order) = state.services.payment.verify_payment(request).await?;
    Ok(Json(ApiResponse::success(response)))
}
