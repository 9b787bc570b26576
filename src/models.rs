//! Domain enums shared by entities, services and handlers.
//!
//! The database stores these as plain strings (matching the original column
//! values); the typed enums live at the service boundary so unknown values
//! are rejected before they reach a row.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Fulfillment status of an order. Transitions are free-form and gated only
/// by admin authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    Online,
    /// Payment happens outside the online flow; the order stays
    /// payment-pending through the digital lifecycle.
    #[strum(serialize = "cash_on_delivery", serialize = "cod")]
    CashOnDelivery,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        Self::Online
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrintType {
    #[strum(serialize = "monochrome", serialize = "mono", serialize = "bw")]
    Monochrome,
    Color,
}

impl Default for PrintType {
    fn default() -> Self {
        Self::Monochrome
    }
}

pub fn parse_order_status(value: &str) -> Result<OrderStatus, ServiceError> {
    value
        .trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| ServiceError::InvalidInput(format!("Unknown order status: {value}")))
}

pub fn parse_payment_status(value: &str) -> Result<PaymentStatus, ServiceError> {
    value
        .trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| ServiceError::InvalidInput(format!("Unknown payment status: {value}")))
}
