pub mod handlers;
pub mod schemas;
pub mod views;
