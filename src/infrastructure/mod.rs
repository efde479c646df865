pub mod catalog_repo;
pub mod chat_repo;
pub mod effects_queue;
pub mod email;
pub mod gateway;
pub mod models;
pub mod notification_repo;
pub mod order_repo;
pub mod user_repo;
