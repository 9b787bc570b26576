pub mod admin;
pub mod order;
