pub mod error;
pub mod executor;
pub mod plan;
pub mod resolver;
pub mod schema;
