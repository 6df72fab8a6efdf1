use std::fmt::{self, Display};
use std::sync::Arc;

use crate::oracle::{OracleError, PermissionOracle};
use crate::permission::PermissionName;
use crate::value::Entity;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PrincipalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The identity a request is executed for, together with the oracle answering its permission
/// questions.
///
/// Built once per request and shared read-only by every field interception of that request.
#[derive(Clone)]
pub struct Principal {
    id: Option<PrincipalId>,
    oracle: Arc<dyn PermissionOracle>,
}

impl Principal {
    pub fn new(id: impl Into<PrincipalId>, oracle: Arc<dyn PermissionOracle>) -> Self {
        Self {
            id: Some(id.into()),
            oracle,
        }
    }

    pub fn anonymous(oracle: Arc<dyn PermissionOracle>) -> Self {
        Self { id: None, oracle }
    }

    pub fn id(&self) -> Option<&PrincipalId> {
        self.id.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }

    pub async fn has_model_permission(
        &self,
        permission: &PermissionName,
    ) -> Result<bool, OracleError> {
        self.oracle
            .has_model_permission(self.id.as_ref(), permission)
            .await
    }

    pub async fn has_instance_permission(
        &self,
        permission: &PermissionName,
        entity: &Entity,
    ) -> Result<bool, OracleError> {
        self.oracle
            .has_instance_permission(self.id.as_ref(), permission, entity)
            .await
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("oracle", &self.oracle.name())
            .finish()
    }
}
