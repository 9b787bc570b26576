pub mod files;
pub mod notifications;
pub mod orders;
pub mod payments;
