use ahash::{HashMap, HashMapExt, HashSet};
use async_trait::async_trait;
use field_authz_config::authorization::StaticBackendConfig;

use crate::oracle::{BackendConfigError, OracleError, PermissionOracle};
use crate::permission::PermissionName;
use crate::principal::PrincipalId;
use crate::value::Entity;

/// Grants known up front: superusers, direct and group model permissions, and permissions on
/// single entity instances.
///
/// Inactive principals hold nothing, not even when listed as superusers. Anonymous principals
/// hold nothing either.
#[derive(Debug, Default, Clone)]
pub struct StaticPermissionBackend {
    superusers: HashSet<PrincipalId>,
    inactive: HashSet<PrincipalId>,
    model_permissions: HashMap<PrincipalId, HashSet<PermissionName>>,
    object_permissions: HashMap<PrincipalId, HashSet<(PermissionName, String)>>,
}

impl StaticPermissionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn superuser(mut self, principal: impl Into<PrincipalId>) -> Self {
        self.superusers.insert(principal.into());
        self
    }

    pub fn inactive(mut self, principal: impl Into<PrincipalId>) -> Self {
        self.inactive.insert(principal.into());
        self
    }

    pub fn grant(mut self, principal: impl Into<PrincipalId>, permission: PermissionName) -> Self {
        self.model_permissions
            .entry(principal.into())
            .or_default()
            .insert(permission);
        self
    }

    pub fn grant_object(
        mut self,
        principal: impl Into<PrincipalId>,
        permission: PermissionName,
        entity_id: impl Into<String>,
    ) -> Self {
        self.object_permissions
            .entry(principal.into())
            .or_default()
            .insert((permission, entity_id.into()));
        self
    }

    /// Resolves group memberships into per-principal permission sets and validates every
    /// permission string.
    pub fn from_config(config: &StaticBackendConfig) -> Result<Self, BackendConfigError> {
        let mut groups: HashMap<&str, Vec<PermissionName>> = HashMap::with_capacity(config.groups.len());
        for (group, permissions) in &config.groups {
            let parsed = permissions
                .iter()
                .map(|permission| permission.parse())
                .collect::<Result<Vec<PermissionName>, _>>()?;
            groups.insert(group.as_str(), parsed);
        }

        let mut backend = Self::new();

        for principal in &config.superusers {
            backend = backend.superuser(principal.as_str());
        }
        for principal in &config.inactive {
            backend = backend.inactive(principal.as_str());
        }

        for (principal, grants) in &config.principals {
            for permission in &grants.permissions {
                backend = backend.grant(principal.as_str(), permission.parse()?);
            }
            for group in &grants.groups {
                let Some(group_permissions) = groups.get(group.as_str()) else {
                    return Err(BackendConfigError::UnknownGroup {
                        principal: principal.clone(),
                        group: group.clone(),
                    });
                };
                for permission in group_permissions {
                    backend = backend.grant(principal.as_str(), permission.clone());
                }
            }
        }

        for object_permission in &config.object_permissions {
            backend = backend.grant_object(
                object_permission.principal.as_str(),
                object_permission.permission.parse()?,
                object_permission.entity_id.as_str(),
            );
        }

        Ok(backend)
    }

    fn active<'p>(&self, principal: Option<&'p PrincipalId>) -> Option<&'p PrincipalId> {
        principal.filter(|principal| !self.inactive.contains(*principal))
    }

    fn holds_model_permission(&self, principal: &PrincipalId, permission: &PermissionName) -> bool {
        self.superusers.contains(principal)
            || self
                .model_permissions
                .get(principal)
                .is_some_and(|permissions| permissions.contains(permission))
    }
}

#[async_trait]
impl PermissionOracle for StaticPermissionBackend {
    fn name(&self) -> &str {
        "static"
    }

    async fn has_model_permission(
        &self,
        principal: Option<&PrincipalId>,
        permission: &PermissionName,
    ) -> Result<bool, OracleError> {
        Ok(self
            .active(principal)
            .is_some_and(|principal| self.holds_model_permission(principal, permission)))
    }

    async fn has_instance_permission(
        &self,
        principal: Option<&PrincipalId>,
        permission: &PermissionName,
        entity: &Entity,
    ) -> Result<bool, OracleError> {
        let Some(principal) = self.active(principal) else {
            return Ok(false);
        };

        let object_grant = self.object_permissions.get(principal).is_some_and(|grants| {
            grants
                .iter()
                .any(|(granted, entity_id)| granted == permission && entity_id == entity.id())
        });

        Ok(object_grant || self.holds_model_permission(principal, permission))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use field_authz_config::authorization::{ObjectPermissionConfig, PrincipalGrantsConfig};

    use super::*;
    use crate::permission::EntityKind;

    fn project_kind() -> Arc<EntityKind> {
        Arc::new(EntityKind::new("tests", "project"))
    }

    fn view_project() -> PermissionName {
        PermissionName::view(&project_kind())
    }

    fn id(principal: &str) -> PrincipalId {
        PrincipalId::new(principal)
    }

    #[tokio::test]
    async fn superuser_holds_every_permission() {
        let backend = StaticPermissionBackend::new().superuser("admin");

        assert!(backend
            .has_model_permission(Some(&id("admin")), &view_project())
            .await
            .unwrap());
        assert!(!backend
            .has_model_permission(Some(&id("alice")), &view_project())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn inactive_principal_holds_nothing() {
        let backend = StaticPermissionBackend::new()
            .superuser("admin")
            .inactive("admin")
            .grant("admin", view_project());

        assert!(!backend
            .has_model_permission(Some(&id("admin")), &view_project())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn anonymous_principal_holds_nothing() {
        let backend = StaticPermissionBackend::new().grant("alice", view_project());
        let entity = Entity::new(project_kind(), "1");

        assert!(!backend.has_model_permission(None, &view_project()).await.unwrap());
        assert!(!backend
            .has_instance_permission(None, &view_project(), &entity)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn object_grant_covers_only_its_instance() {
        let backend = StaticPermissionBackend::new().grant_object("bob", view_project(), "2");
        let kind = project_kind();

        let first = Entity::new(kind.clone(), "1");
        let second = Entity::new(kind, "2");

        assert!(!backend
            .has_model_permission(Some(&id("bob")), &view_project())
            .await
            .unwrap());
        assert!(!backend
            .has_instance_permission(Some(&id("bob")), &view_project(), &first)
            .await
            .unwrap());
        assert!(backend
            .has_instance_permission(Some(&id("bob")), &view_project(), &second)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn group_permissions_are_inherited() {
        let config = StaticBackendConfig {
            groups: [(
                "auditors".to_string(),
                vec!["tests.view_project".to_string()],
            )]
            .into_iter()
            .collect(),
            principals: [(
                "carol".to_string(),
                PrincipalGrantsConfig {
                    permissions: vec![],
                    groups: vec!["auditors".to_string()],
                },
            )]
            .into_iter()
            .collect(),
            object_permissions: vec![ObjectPermissionConfig {
                principal: "dave".to_string(),
                permission: "tests.view_project".to_string(),
                entity_id: "9".to_string(),
            }],
            ..Default::default()
        };

        let backend = StaticPermissionBackend::from_config(&config).unwrap();

        assert!(backend
            .has_model_permission(Some(&id("carol")), &view_project())
            .await
            .unwrap());
        assert!(backend
            .has_instance_permission(
                Some(&id("dave")),
                &view_project(),
                &Entity::new(project_kind(), "9")
            )
            .await
            .unwrap());
    }

    #[test]
    fn unknown_group_is_a_configuration_error() {
        let config = StaticBackendConfig {
            principals: [(
                "carol".to_string(),
                PrincipalGrantsConfig {
                    permissions: vec![],
                    groups: vec!["nobody".to_string()],
                },
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };

        let error = StaticPermissionBackend::from_config(&config).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Principal 'carol' is a member of unknown group 'nobody'"
        );
    }
}
