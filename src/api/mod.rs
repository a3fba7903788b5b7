pub mod routes;
pub mod server;
pub mod server_config;
pub mod types;

pub use routes::{create_routes, AppState};
pub use server::MonitorServer;
