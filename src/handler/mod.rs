pub mod example;
pub mod health;

pub use example::{create_example, get_example};
pub use health::health_handler;
