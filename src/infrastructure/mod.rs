pub mod cart_store;
pub mod memory;
pub mod models;
pub mod notifier;
pub mod order_repo;
pub mod outbox;
pub mod product_repo;
pub mod sandbox;
pub mod stripe;
