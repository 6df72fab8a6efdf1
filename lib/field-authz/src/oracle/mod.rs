mod ownership;
mod static_grants;

use std::sync::Arc;

use async_trait::async_trait;
use field_authz_config::authorization::BackendConfig;
use futures::future::BoxFuture;

use crate::permission::{PermissionName, PermissionNameError};
use crate::principal::PrincipalId;
use crate::value::Entity;

pub use ownership::OwnershipBackend;
pub use static_grants::StaticPermissionBackend;

/// Failure of a permission backend lookup.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("Permission backend '{backend}' is unavailable: {message}")]
    Unavailable { backend: String, message: String },
    #[error("Permission backend '{backend}' failed: {message}")]
    Internal { backend: String, message: String },
}

/// Answers permission questions for a principal.
///
/// Implementations must be read-only and cheap enough to be asked once per entity of a
/// result page. `principal` is `None` for anonymous requests.
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the principal holds `permission` for every instance of its entity kind.
    async fn has_model_permission(
        &self,
        principal: Option<&PrincipalId>,
        permission: &PermissionName,
    ) -> Result<bool, OracleError>;

    /// Whether the principal holds `permission` for `entity` specifically.
    ///
    /// Backends without instance-scoped rules keep this default, so that a model-level grant
    /// is never reported as denied for a single instance.
    async fn has_instance_permission(
        &self,
        principal: Option<&PrincipalId>,
        permission: &PermissionName,
        _entity: &Entity,
    ) -> Result<bool, OracleError> {
        self.has_model_permission(principal, permission).await
    }
}

/// Errors raised while building backends from configuration.
#[derive(Debug, thiserror::Error)]
pub enum BackendConfigError {
    #[error("Invalid permission in the static backend: {0}")]
    InvalidPermission(#[from] PermissionNameError),
    #[error("Principal '{principal}' is a member of unknown group '{group}'")]
    UnknownGroup { principal: String, group: String },
    #[error("Invalid ownership action '{0}': actions must be non-empty and contain no '.'")]
    InvalidAction(String),
}

/// An ordered chain of backends. A permission is granted if any backend grants it; backends
/// are asked in order and the first grant wins.
#[derive(Clone, Default)]
pub struct PermissionOracleChain {
    backends: Vec<Arc<dyn PermissionOracle>>,
}

impl PermissionOracleChain {
    pub fn new(backends: Vec<Arc<dyn PermissionOracle>>) -> Self {
        Self { backends }
    }

    pub fn from_config(configs: &[BackendConfig]) -> Result<Self, BackendConfigError> {
        let mut backends: Vec<Arc<dyn PermissionOracle>> = Vec::with_capacity(configs.len());

        for config in configs {
            let backend: Arc<dyn PermissionOracle> = match config {
                BackendConfig::Static(config) => {
                    Arc::new(StaticPermissionBackend::from_config(config)?)
                }
                BackendConfig::Ownership(config) => {
                    Arc::new(OwnershipBackend::from_config(config)?)
                }
            };
            tracing::debug!(backend = backend.name(), "registered permission backend");
            backends.push(backend);
        }

        Ok(Self::new(backends))
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// Asks `check` of each backend in order and grants on the first `true`.
/// A backend error ends the lookup and is returned as is.
async fn grant_if_any<'a, F>(
    backends: &'a [Arc<dyn PermissionOracle>],
    mut check: F,
) -> Result<bool, OracleError>
where
    F: FnMut(&'a dyn PermissionOracle) -> BoxFuture<'a, Result<bool, OracleError>>,
{
    for backend in backends {
        if check(backend.as_ref()).await? {
            tracing::trace!(backend = backend.name(), "permission granted");
            return Ok(true);
        }
    }
    Ok(false)
}

#[async_trait]
impl PermissionOracle for PermissionOracleChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn has_model_permission(
        &self,
        principal: Option<&PrincipalId>,
        permission: &PermissionName,
    ) -> Result<bool, OracleError> {
        grant_if_any(&self.backends, |backend| {
            backend.has_model_permission(principal, permission)
        })
        .await
    }

    async fn has_instance_permission(
        &self,
        principal: Option<&PrincipalId>,
        permission: &PermissionName,
        entity: &Entity,
    ) -> Result<bool, OracleError> {
        grant_if_any(&self.backends, |backend| {
            backend.has_instance_permission(principal, permission, entity)
        })
        .await
    }
}
