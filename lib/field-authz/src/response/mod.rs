pub mod graphql_error;
pub mod path;
pub mod value;
