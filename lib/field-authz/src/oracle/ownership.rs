use async_trait::async_trait;
use field_authz_config::authorization::OwnershipBackendConfig;

use crate::oracle::{BackendConfigError, OracleError, PermissionOracle};
use crate::permission::PermissionName;
use crate::principal::PrincipalId;
use crate::value::Entity;

/// Grants instance permissions to the owner of an entity, for the configured actions only.
/// Never grants a model permission.
#[derive(Debug, Clone)]
pub struct OwnershipBackend {
    actions: Vec<String>,
}

impl OwnershipBackend {
    pub fn new(actions: Vec<String>) -> Self {
        Self { actions }
    }

    pub fn from_config(config: &OwnershipBackendConfig) -> Result<Self, BackendConfigError> {
        if let Some(invalid) = config
            .actions
            .iter()
            .find(|action| action.is_empty() || action.contains('.'))
        {
            return Err(BackendConfigError::InvalidAction(invalid.clone()));
        }

        Ok(Self::new(config.actions.clone()))
    }
}

#[async_trait]
impl PermissionOracle for OwnershipBackend {
    fn name(&self) -> &str {
        "ownership"
    }

    async fn has_model_permission(
        &self,
        _principal: Option<&PrincipalId>,
        _permission: &PermissionName,
    ) -> Result<bool, OracleError> {
        Ok(false)
    }

    async fn has_instance_permission(
        &self,
        principal: Option<&PrincipalId>,
        permission: &PermissionName,
        entity: &Entity,
    ) -> Result<bool, OracleError> {
        let owns = matches!((principal, entity.owner()), (Some(principal), Some(owner)) if principal == owner);
        if !owns {
            return Ok(false);
        }

        Ok(self
            .actions
            .iter()
            .any(|action| PermissionName::for_kind(entity.kind(), action) == *permission))
    }
}
