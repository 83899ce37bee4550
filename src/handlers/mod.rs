pub mod api_v1;
pub mod auth_handlers;
