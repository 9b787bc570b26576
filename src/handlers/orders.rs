use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthAdmin,
    errors::ServiceError,
    models::parse_order_status,
    services::files::StoredFile,
    services::orders::{
        OrderResponse, SubmitOrderRequest, SubmitOrderResponse, TrackOrderResponse,
    },
    ApiResponse, AppState, ListQuery, PaginatedResponse,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of: pending, processing, completed, cancelled.
    pub status: String,
}

/// Submit a print order. Multipart form: the seven student fields, optional
/// print options, and an optional practical file (PDF/DOC/DOCX/TXT).
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Order created with a quoted amount", body = ApiResponse<SubmitOrderResponse>),
        (status = 400, description = "Validation failed or file rejected", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn submit_order(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<SubmitOrderResponse>>), ServiceError> {
    let mut request = SubmitOrderRequest::default();
    let mut upload: Option<(String, String, bytes::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            // Reject on declared type before buffering the body.
            state.services.files.validate(&content_type, 0)?;
            let data = field
                .bytes()
                .await
                .map_err(|e| ServiceError::BadRequest(format!("failed to read upload: {e}")))?;
            upload = Some((file_name, content_type, data));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ServiceError::BadRequest(format!("malformed field {name}: {e}")))?;

        match name.as_str() {
            "student_name" => request.student_name = value,
            "roll_number" => request.roll_number = value,
            "college_name" => request.college_name = value,
            "subject" => request.subject = value,
            "practical_number" => request.practical_number = value,
            "teacher_name" => request.teacher_name = value,
            "mobile_number" => request.mobile_number = value,
            "notes" => request.notes = Some(value),
            "pages" => request.pages = Some(value),
            "print_type" => request.print_type = Some(value),
            "binding" => request.binding = Some(value),
            "urgent" => request.urgent = Some(value),
            "payment_method" => request.payment_method = Some(value),
            other => {
                tracing::debug!(field = %other, "Ignoring unknown form field");
            }
        }
    }

    if let Some((file_name, content_type, data)) = upload {
        let stored: StoredFile = state
            .services
            .files
            .store(&file_name, &content_type, data)
            .await?;
        request.file = Some(stored);
    }

    let response = state.services.order.submit_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// Public order tracking by tracking code.
#[utoipa::path(
    get,
    path = "/api/v1/orders/track/{tracking_code}",
    params(("tracking_code" = String, Path, description = "Code issued at submission, e.g. SPH-20250101-1234")),
    responses(
        (status = 200, description = "Order status", body = ApiResponse<TrackOrderResponse>),
        (status = 404, description = "Unknown tracking code", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn track_order(
    State(state): State<AppState>,
    Path(tracking_code): Path<String>,
) -> Result<Json<ApiResponse<TrackOrderResponse>>, ServiceError> {
    let response = state.services.order.track_by_code(&tracking_code).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// List orders, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(
        ("page" = Option<String>, Query, description = "Page number; non-numeric falls back to 1"),
        ("limit" = Option<String>, Query, description = "Items per page; non-numeric falls back to 10, max 100"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
    ),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<PaginatedResponse<OrderResponse>>),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    _admin: AuthAdmin,
) -> Result<Json<ApiResponse<PaginatedResponse<OrderResponse>>>, ServiceError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_order_status)
        .transpose()?;

    let (page, limit) = (query.page(), query.limit());
    let (items, total) = state
        .services
        .order
        .list_orders(status, page, limit)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

/// Full order detail.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _admin: AuthAdmin,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let response = state.services.order.get_order(id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Set the fulfillment status.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Unknown status value", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _admin: AuthAdmin,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let status = parse_order_status(&request.status)?;
    let response = state.services.order.update_status(id, status).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Permanently delete an order.
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order deleted", body = ApiResponse<serde_json::Value>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _admin: AuthAdmin,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state.services.order.delete_order(id).await?;
    Ok(Json(ApiResponse::success(json!({ "deleted": true, "id": id }))))
}
