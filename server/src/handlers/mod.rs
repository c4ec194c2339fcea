pub mod account_handler;
pub mod admin_handler;
pub mod app_handler;
