// GraphQL schema and context
pub mod context;
pub mod schema;
pub mod types;

pub use context::*;
pub use schema::*;
