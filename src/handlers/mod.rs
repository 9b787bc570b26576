use crate::services::{files::FileStore, orders::OrderService, payments::PaymentService};

pub mod orders;
pub mod payments;

/// Service handles shared with every handler through `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub order: OrderService,
    pub payment: PaymentService,
    pub files: FileStore,
}
