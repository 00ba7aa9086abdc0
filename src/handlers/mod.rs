mod health;
mod metrics;
mod verify;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use verify::verify_handler;
