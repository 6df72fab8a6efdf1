use ahash::HashMap;
use async_trait::async_trait;

use crate::execution::error::ResolverError;
use crate::principal::Principal;
use crate::value::ResolvedValue;

pub struct ResolveParams<'a> {
    /// The authorized value of the parent field. The empty object for root fields.
    pub parent: &'a ResolvedValue,
    pub parent_type: &'a str,
    pub field_name: &'a str,
    pub arguments: &'a HashMap<String, sonic_rs::Value>,
    pub principal: &'a Principal,
}

/// Supplies field values.
///
/// Returning `Ok(None)` falls back to default resolution, which reads the member named after
/// the field from an object parent.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(
        &self,
        params: ResolveParams<'_>,
    ) -> Result<Option<ResolvedValue>, ResolverError>;
}
