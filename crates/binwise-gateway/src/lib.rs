pub mod classify;
pub mod middleware;
pub mod server;

pub use classify::{ApiError, ClassifyRequest, MIN_PROBABILITY};
pub use middleware::AuthConfig;
pub use server::{AppState, GatewayServer, ServerConfig};
