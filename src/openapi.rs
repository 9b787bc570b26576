use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PrintHub API",
        version = "0.1.0",
        description = r#"
# PrintHub Print-Order API

Intake service for student practical print jobs: submissions with file
upload, server-side price quoting, online payment verification, public
order tracking and an admin order dashboard.

## Authentication

Admin endpoints require a bearer token obtained from `/auth/login`:

```
Authorization: Bearer <token>
```

Submission, tracking and the payment callback endpoints are public.

## Pricing

The quoted amount is always computed server side: per-page rate by print
type, plus flat binding and urgent charges, with a minimum charge of 1.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "orders", description = "Order submission, tracking and management"),
        (name = "payments", description = "Payment intent and verification endpoints"),
        (name = "auth", description = "Admin account and token endpoints")
    ),
    paths(
        crate::handlers::orders::submit_order,
        crate::handlers::orders::track_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::delete_order,
        crate::handlers::payments::create_intent,
        crate::handlers::payments::verify_payment,
        crate::auth::register,
        crate::auth::login,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::handlers::orders::UpdateStatusRequest,
            crate::handlers::payments::CreateIntentRequest,
            crate::services::orders::SubmitOrderResponse,
            crate::services::orders::OrderResponse,
            crate::services::orders::TrackOrderResponse,
            crate::services::payments::PaymentIntentResponse,
            crate::services::payments::VerifyPaymentRequest,
            crate::services::payments::VerifyPaymentResponse,
            crate::auth::RegisterRequest,
            crate::auth::LoginRequest,
            crate::auth::TokenResponse,
            crate::auth::AdminResponse,
            crate::models::OrderStatus,
            crate::models::PaymentStatus,
            crate::models::PaymentMethod,
            crate::models::PrintType,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("PrintHub API"));
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/payments/verify"));
    }
}
