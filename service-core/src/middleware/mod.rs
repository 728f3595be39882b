pub mod security_headers;
pub mod tracing;

pub use security_headers::{PLAYGROUND_PATH, security_headers_middleware};
pub use tracing::request_id_middleware;
