use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{parse_payment_status, OrderStatus, PaymentMethod, PaymentStatus, PrintType},
    pricing,
    services::files::StoredFile,
    services::notifications::NewOrderSummary,
};

static MOBILE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{10}$").expect("valid mobile number pattern"));

/// Bounded retries for tracking-code generation; the 4-digit random suffix
/// makes collisions possible, and the unique index is the backstop.
const TRACKING_CODE_ATTEMPTS: u32 = 5;

/// Raw submission as it arrives from the public intake form. Values are
/// form-encoded strings; the workflow owns trimming, normalization and
/// validation.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SubmitOrderRequest {
    pub student_name: String,
    pub roll_number: String,
    pub college_name: String,
    pub subject: String,
    pub practical_number: String,
    pub teacher_name: String,
    pub mobile_number: String,
    pub notes: Option<String>,
    pub pages: Option<String>,
    pub print_type: Option<String>,
    pub binding: Option<String>,
    pub urgent: Option<String>,
    pub payment_method: Option<String>,
    #[serde(skip)]
    pub file: Option<StoredFile>,
}

/// Outcome of a successful submission: the public tracking identity plus the
/// payment-method-appropriate next step.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitOrderResponse {
    pub order_id: Uuid,
    pub tracking_code: String,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub next_step: String,
}

/// Full order view for authenticated staff.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub tracking_code: String,
    pub student_name: String,
    pub roll_number: String,
    pub college_name: String,
    pub subject: String,
    pub practical_number: String,
    pub teacher_name: String,
    pub mobile_number: String,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub pages: i32,
    pub print_type: String,
    pub binding: bool,
    pub urgent: bool,
    pub notes: String,
    pub amount: Decimal,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Limited view for the public tracking endpoint. Deliberately excludes the
/// mobile number, file paths, payment identifiers and the internal id.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TrackOrderResponse {
    pub tracking_code: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub student_name: String,
    pub subject: String,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Intake workflow: validate, price, assign a tracking code and persist.
    /// The client never controls the amount; it is recomputed here.
    #[instrument(skip(self, request), fields(student = %request.student_name.trim()))]
    pub async fn submit_order(
        &self,
        request: SubmitOrderRequest,
    ) -> Result<SubmitOrderResponse, ServiceError> {
        validate_submission(&request)?;

        let pages = parse_pages(request.pages.as_deref())?;
        let print_type = parse_print_type(request.print_type.as_deref());
        let binding = normalize_flag(request.binding.as_deref());
        let urgent = normalize_flag(request.urgent.as_deref());
        let payment_method = parse_payment_method(request.payment_method.as_deref());

        let amount = pricing::price(pages, print_type, binding, urgent);

        let now = Utc::now();
        let order_id = Uuid::new_v4();

        // The unique index on tracking_code resolves generation races; on a
        // collision we regenerate rather than surface the conflict.
        let mut saved: Option<OrderModel> = None;
        for attempt in 1..=TRACKING_CODE_ATTEMPTS {
            let tracking_code = generate_tracking_code(now);
            let active = OrderActiveModel {
                id: Set(order_id),
                tracking_code: Set(tracking_code.clone()),
                student_name: Set(request.student_name.trim().to_string()),
                roll_number: Set(request.roll_number.trim().to_string()),
                college_name: Set(request.college_name.trim().to_string()),
                subject: Set(request.subject.trim().to_string()),
                practical_number: Set(request.practical_number.trim().to_string()),
                teacher_name: Set(request.teacher_name.trim().to_string()),
                mobile_number: Set(request.mobile_number.trim().to_string()),
                file_name: Set(request.file.as_ref().map(|f| f.file_name.clone())),
                file_path: Set(request.file.as_ref().map(|f| f.file_path.clone())),
                pages: Set(pages as i32),
                print_type: Set(print_type.to_string()),
                binding: Set(binding),
                urgent: Set(urgent),
                notes: Set(request
                    .notes
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string()),
                amount: Set(amount),
                status: Set(OrderStatus::default().to_string()),
                payment_status: Set(PaymentStatus::default().to_string()),
                payment_method: Set(payment_method.to_string()),
                payment_reference: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            };

            match active.insert(&*self.db).await {
                Ok(model) => {
                    saved = Some(model);
                    break;
                }
                Err(err) if is_unique_violation(&err) => {
                    warn!(
                        attempt,
                        %tracking_code,
                        "Tracking code collision, regenerating"
                    );
                }
                Err(err) => {
                    error!(error = %err, order_id = %order_id, "Failed to persist order");
                    return Err(ServiceError::DatabaseError(err));
                }
            }
        }

        let order = saved.ok_or_else(|| {
            error!(
                attempts = TRACKING_CODE_ATTEMPTS,
                "Tracking code generation exhausted"
            );
            ServiceError::InternalError(format!(
                "tracking code generation exhausted after {TRACKING_CODE_ATTEMPTS} attempts"
            ))
        })?;

        info!(order_id = %order.id, tracking_code = %order.tracking_code, %amount, "Order created");

        if let Some(sender) = &self.event_sender {
            let summary = NewOrderSummary {
                tracking_code: order.tracking_code.clone(),
                student_name: order.student_name.clone(),
                roll_number: order.roll_number.clone(),
                subject: order.subject.clone(),
                mobile_number: order.mobile_number.clone(),
                file_name: order.file_name.clone(),
                notes: order.notes.clone(),
                amount: order.amount.to_string(),
                payment_method: order.payment_method.clone(),
            };
            if let Err(e) = sender
                .send(Event::OrderCreated {
                    order_id: order.id,
                    summary,
                })
                .await
            {
                warn!(error = %e, order_id = %order.id, "Failed to send order created event");
            }
        }

        let next_step = match payment_method {
            PaymentMethod::Online => {
                "Complete the online payment for the quoted amount to confirm your order"
            }
            PaymentMethod::CashOnDelivery => {
                "Keep the quoted amount ready; payment is collected on delivery"
            }
        };

        Ok(SubmitOrderResponse {
            order_id: order.id,
            tracking_code: order.tracking_code,
            amount: order.amount,
            payment_method,
            next_step: next_step.to_string(),
        })
    }

    /// Full order detail for staff.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        Ok(model_to_response(order))
    }

    /// Raw order model lookup used by the payment workflow.
    pub async fn find_model(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }

    /// Public tracking lookup. Returns only privacy-safe fields.
    #[instrument(skip(self))]
    pub async fn track_by_code(&self, code: &str) -> Result<TrackOrderResponse, ServiceError> {
        let order = OrderEntity::find()
            .filter(order::Column::TrackingCode.eq(code.trim()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No order found for tracking code {}", code.trim()))
            })?;

        Ok(TrackOrderResponse {
            tracking_code: order.tracking_code,
            status: order.status,
            created_at: order.created_at,
            student_name: order.student_name,
            subject: order.subject,
        })
    }

    /// Paginated staff listing, newest first, optionally filtered by status.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<OrderResponse>, u64), ServiceError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);

        let mut query = OrderEntity::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status.to_string()));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, limit);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        Ok((orders.into_iter().map(model_to_response).collect(), total))
    }

    /// Sets the fulfillment status. Transitions are free-form; the only
    /// guard is that the value parses to a known status, which happened at
    /// the handler boundary.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderResponse, ServiceError> {
        let order = self.find_model(order_id).await?;
        let old_status = order.status.clone();

        let mut active: OrderActiveModel = order.into();
        active.status = Set(new_status.to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(order_id = %order_id, %old_status, new_status = %updated.status, "Order status updated");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::OrderStatusChanged {
                    order_id,
                    old_status,
                    new_status: updated.status.clone(),
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send status changed event");
            }
        }

        Ok(model_to_response(updated))
    }

    /// Marks an online order paid after a verified gateway callback.
    /// Idempotent: re-verifying an already-paid order is a no-op, not an
    /// error, and never overwrites the recorded payment reference.
    #[instrument(skip(self))]
    pub async fn mark_paid(
        &self,
        order_id: Uuid,
        payment_reference: &str,
    ) -> Result<OrderResponse, ServiceError> {
        let order = self.find_model(order_id).await?;

        if parse_payment_status(&order.payment_status)? == PaymentStatus::Paid {
            if order.payment_reference.as_deref() != Some(payment_reference) {
                warn!(
                    order_id = %order_id,
                    existing = ?order.payment_reference,
                    incoming = %payment_reference,
                    "Order already paid with a different payment reference; keeping the original"
                );
            }
            return Ok(model_to_response(order));
        }

        let mut active: OrderActiveModel = order.into();
        active.payment_status = Set(PaymentStatus::Paid.to_string());
        active.payment_reference = Set(Some(payment_reference.to_string()));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(order_id = %order_id, %payment_reference, "Order marked paid");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::PaymentCaptured {
                    order_id,
                    payment_reference: payment_reference.to_string(),
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send payment captured event");
            }
        }

        Ok(model_to_response(updated))
    }

    /// Permanent removal. There is no tombstone.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let result = OrderEntity::delete_by_id(order_id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Order not found".to_string()));
        }

        info!(order_id = %order_id, "Order deleted");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::OrderDeleted(order_id)).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order deleted event");
            }
        }

        Ok(())
    }
}

/// Presence check for the seven required fields plus the mobile-number
/// format. Missing fields are aggregated into a single deterministic message
/// in form order.
fn validate_submission(request: &SubmitOrderRequest) -> Result<(), ServiceError> {
    let required = [
        ("student_name", &request.student_name),
        ("roll_number", &request.roll_number),
        ("college_name", &request.college_name),
        ("subject", &request.subject),
        ("practical_number", &request.practical_number),
        ("teacher_name", &request.teacher_name),
        ("mobile_number", &request.mobile_number),
    ];

    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if !missing.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    if !MOBILE_NUMBER_RE.is_match(request.mobile_number.trim()) {
        return Err(ServiceError::ValidationError(
            "mobile_number must be exactly 10 digits".to_string(),
        ));
    }

    Ok(())
}

/// Lenient page-count parsing: the form sends strings and omits the field
/// entirely for zero-page quotes. Non-numeric input counts as zero, matching
/// the form's behavior; negative counts are rejected.
fn parse_pages(raw: Option<&str>) -> Result<u32, ServiceError> {
    let Some(raw) = raw else { return Ok(0) };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }

    match trimmed.parse::<i64>() {
        Ok(n) if n < 0 => Err(ServiceError::ValidationError(
            "pages must be non-negative".to_string(),
        )),
        Ok(n) => u32::try_from(n)
            .map_err(|_| ServiceError::ValidationError("pages is out of range".to_string())),
        Err(_) => Ok(0),
    }
}

fn parse_print_type(raw: Option<&str>) -> PrintType {
    raw.and_then(|s| s.trim().to_ascii_lowercase().parse().ok())
        .unwrap_or_default()
}

fn parse_payment_method(raw: Option<&str>) -> PaymentMethod {
    raw.and_then(|s| s.trim().to_ascii_lowercase().parse().ok())
        .unwrap_or_default()
}

/// Checkbox normalization: the form serializes checked boxes as "on" (or
/// "true") and omits unchecked ones entirely.
pub fn normalize_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("true") | Some("on")
    )
}

/// `SPH-<YYYYMMDD>-<4-digit-random>`.
fn generate_tracking_code(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(1000..10_000);
    format!("SPH-{}-{}", now.format("%Y%m%d"), suffix)
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn model_to_response(model: OrderModel) -> OrderResponse {
    OrderResponse {
        id: model.id,
        tracking_code: model.tracking_code,
        student_name: model.student_name,
        roll_number: model.roll_number,
        college_name: model.college_name,
        subject: model.subject,
        practical_number: model.practical_number,
        teacher_name: model.teacher_name,
        mobile_number: model.mobile_number,
        file_name: model.file_name,
        file_path: model.file_path,
        pages: model.pages,
        print_type: model.print_type,
        binding: model.binding,
        urgent: model.urgent,
        notes: model.notes,
        amount: model.amount,
        status: model.status,
        payment_status: model.payment_status,
        payment_method: model.payment_method,
        payment_reference: model.payment_reference,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
