pub mod cart_service;
pub mod order_service;
pub mod payment_service;
pub mod query_service;
pub mod submission_service;
pub mod timeout_sweep;
