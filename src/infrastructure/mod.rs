pub mod cart_repo;
pub mod collaborators;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod models;
pub mod order_repo;
