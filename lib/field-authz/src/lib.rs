pub mod execution;
pub mod interceptor;
pub mod logging;
pub mod oracle;
pub mod permission;
pub mod plugins;
pub mod principal;
pub mod response;
pub mod value;

#[cfg(test)]
mod tests;

pub use interceptor::{FieldAuthorizationInterceptor, FieldContext, FieldDecision};
pub use oracle::{PermissionOracle, PermissionOracleChain};
pub use permission::{permission_name, EntityKind, PermissionName};
pub use plugins::*;
pub use principal::{Principal, PrincipalId};
pub use value::{Entity, EntityCollection, LazyEntities, OtherValue, ResolvedValue};
