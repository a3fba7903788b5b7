pub mod monitor;

// Re-export RiskMonitor to make it accessible via `crate::service::RiskMonitor`
pub use monitor::{ClassificationEvent, RiskMonitor};
