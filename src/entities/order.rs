use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A student print-job order.
///
/// `tracking_code` is the public, privacy-safe identity handed to the
/// student; `id` stays internal. Status and payment fields are stored as the
/// original string values and validated against the typed enums in
/// `crate::models` at the service boundary.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-facing tracking code, `SPH-<YYYYMMDD>-<4 digits>`, unique and
    /// immutable once assigned.
    #[sea_orm(unique)]
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

    /// Amount owed, recomputed server-side at creation time.
    pub amount: Decimal,

    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub payment_reference: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
