mod common;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use printhub_api::entities::order::{Column as OrderColumn, Entity as OrderEntity};

use common::{read_json, valid_submission_fields, TestApp};

#[tokio::test]
async fn valid_submission_creates_a_priced_order() {
    let app = TestApp::new().await;

    let response = app.submit_multipart(&valid_submission_fields(), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = read_json(response).await;
    assert!(body["success"].as_bool().unwrap());
    let data = &body["data"];

    // 10 color pages at 5 each, no binding or urgency.
    assert_eq!(data["amount"], "50");
    assert_eq!(data["payment_method"], "online");
    let tracking_code = data["tracking_code"].as_str().unwrap();
    assert!(tracking_code.starts_with("SPH-"));
    assert_eq!(tracking_code.len(), "SPH-20250101-1234".len());
    assert!(data["next_step"].as_str().unwrap().contains("payment"));

    let saved = OrderEntity::find()
        .filter(OrderColumn::TrackingCode.eq(tracking_code))
        .one(&*app.state.db)
        .await
        .expect("query order")
        .expect("order should exist");
    assert_eq!(saved.amount, Decimal::from(50));
    assert_eq!(saved.status, "pending");
    assert_eq!(saved.payment_status, "pending");
    assert_eq!(saved.pages, 10);
    assert_eq!(saved.student_name, "Asha Verma");
}

#[tokio::test]
async fn binding_and_urgent_add_flat_charges() {
    let app = TestApp::new().await;

    let mut fields = valid_submission_fields();
    fields.retain(|(name, _)| *name != "print_type");
    fields.push(("print_type", "bw"));
    fields.push(("binding", "on"));
    fields.push(("urgent", "true"));

    let response = app.submit_multipart(&fields, None).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // 10 monochrome pages at 2, plus 30 binding, plus 20 urgent.
    let body = read_json(response).await;
    assert_eq!(body["data"]["amount"], "70");
}

#[tokio::test]
async fn zero_page_quote_clamps_to_the_minimum_charge() {
    let app = TestApp::new().await;

    let mut fields = valid_submission_fields();
    fields.retain(|(name, _)| *name != "pages");

    let response = app.submit_multipart(&fields, None).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = read_json(response).await;
    assert_eq!(body["data"]["amount"], "1");
}

#[tokio::test]
async fn missing_fields_are_reported_together() {
    let app = TestApp::new().await;

    let mut fields = valid_submission_fields();
    fields.retain(|(name, _)| *name != "mobile_number" && *name != "subject");

    let response = app.submit_multipart(&fields, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = read_json(response).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("subject"), "got: {message}");
    assert!(message.contains("mobile_number"), "got: {message}");

    let count = OrderEntity::find()
        .count(&*app.state.db)
        .await
        .expect("count orders");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn malformed_mobile_number_is_rejected() {
    let app = TestApp::new().await;

    let mut fields = valid_submission_fields();
    fields.retain(|(name, _)| *name != "mobile_number");
    fields.push(("mobile_number", "12345"));

    let response = app.submit_multipart(&fields, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = read_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("mobile_number"));
}

#[tokio::test]
async fn store_rejects_a_duplicate_tracking_code() {
    use chrono::Utc;
    use printhub_api::entities::order::ActiveModel;
    use sea_orm::{ActiveModelTrait, Set, SqlErr};
    use uuid::Uuid;

    let app = TestApp::new().await;

    let row = |code: &str| ActiveModel {
        id: Set(Uuid::new_v4()),
        tracking_code: Set(code.to_string()),
        student_name: Set("Asha Verma".to_string()),
        roll_number: Set("21CS042".to_string()),
        college_name: Set("City Engineering College".to_string()),
        subject: Set("Physics".to_string()),
        practical_number: Set("7".to_string()),
        teacher_name: Set("Prof. Rao".to_string()),
        mobile_number: Set("9876543210".to_string()),
        file_name: Set(None),
        file_path: Set(None),
        pages: Set(10),
        print_type: Set("color".to_string()),
        binding: Set(false),
        urgent: Set(false),
        notes: Set(String::new()),
        amount: Set(Decimal::from(50)),
        status: Set("pending".to_string()),
        payment_status: Set("pending".to_string()),
        payment_method: Set("online".to_string()),
        payment_reference: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    };

    row("SPH-20250101-1234")
        .insert(&*app.state.db)
        .await
        .expect("first insert");

    // The unique index is the store-level guarantee the regeneration loop
    // relies on: a colliding insert must surface as a unique violation.
    let err = row("SPH-20250101-1234")
        .insert(&*app.state.db)
        .await
        .expect_err("duplicate tracking code must be rejected");
    assert!(
        matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))),
        "expected unique violation, got: {err:?}"
    );

    // A regenerated code goes through against the same table.
    row("SPH-20250101-5678")
        .insert(&*app.state.db)
        .await
        .expect("fresh code inserts");

    let count = OrderEntity::find()
        .count(&*app.state.db)
        .await
        .expect("count orders");
    assert_eq!(count, 2);
}

#[tokio::test]
async fn pdf_upload_is_stored_with_the_order() {
    let app = TestApp::new().await;

    let response = app
        .submit_multipart(
            &valid_submission_fields(),
            Some(("practical-7.pdf", "application/pdf", b"%PDF-1.4 test")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = read_json(response).await;
    let tracking_code = body["data"]["tracking_code"].as_str().unwrap();

    let saved = OrderEntity::find()
        .filter(OrderColumn::TrackingCode.eq(tracking_code))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.file_name.as_deref(), Some("practical-7.pdf"));
    let file_path = saved.file_path.expect("stored file path");
    let on_disk = std::fs::read(&file_path).expect("stored file readable");
    assert_eq!(on_disk, b"%PDF-1.4 test");
}

#[tokio::test]
async fn unreachable_notification_endpoint_does_not_fail_order_creation() {
    use printhub_api::events::{process_events, EventSender};
    use printhub_api::services::notifications::NotificationService;
    use printhub_api::services::orders::{OrderService, SubmitOrderRequest};
    use std::sync::Arc;

    let app = TestApp::new().await;

    // Processor wired to a webhook endpoint nothing listens on.
    let (tx, rx) = tokio::sync::mpsc::channel(16);
    let processor = tokio::spawn(process_events(
        rx,
        Some(Arc::new(NotificationService::new())),
        Some("http://127.0.0.1:9/webhook".to_string()),
    ));

    let service = OrderService::new(app.state.db.clone(), Some(Arc::new(EventSender::new(tx))));
    let request = SubmitOrderRequest {
        student_name: "Asha Verma".to_string(),
        roll_number: "21CS042".to_string(),
        college_name: "City Engineering College".to_string(),
        subject: "Physics".to_string(),
        practical_number: "7".to_string(),
        teacher_name: "Prof. Rao".to_string(),
        mobile_number: "9876543210".to_string(),
        pages: Some("10".to_string()),
        ..Default::default()
    };

    let submission = service.submit_order(request).await.expect("order created");
    assert!(submission.tracking_code.starts_with("SPH-"));

    processor.abort();
}

#[tokio::test]
async fn disallowed_upload_type_rejects_before_any_order_exists() {
    let app = TestApp::new().await;

    let response = app
        .submit_multipart(
            &valid_submission_fields(),
            Some(("selfie.png", "image/png", b"\x89PNG")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let count = OrderEntity::find()
        .count(&*app.state.db)
        .await
        .expect("count orders");
    assert_eq!(count, 0);
}
