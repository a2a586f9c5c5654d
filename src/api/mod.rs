pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::alert_api_router;
pub use server::{start_server, ApiServer};
pub use types::ApiContext;
