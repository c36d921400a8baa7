pub mod automation;
pub mod health;

pub use automation::{enqueue_handler, manual_send_handler, retry_handler, trigger_handler};
pub use health::health_handler;
