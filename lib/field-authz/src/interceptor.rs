use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use field_authz_config::authorization::DEFAULT_DENIED_MESSAGE;
use tracing::{debug, trace};

use crate::oracle::OracleError;
use crate::permission::{EntityKind, PermissionName, VIEW_ACTION};
use crate::principal::Principal;
use crate::response::graphql_error::GraphQLError;
use crate::response::path::ResponsePath;
use crate::value::{Entity, EntityCollection, OtherValue, ResolvedValue};

pub const PERMISSION_DENIED_CODE: &str = "PERMISSION_DENIED";
pub const FIELD_RESOLUTION_ERROR_CODE: &str = "FIELD_RESOLUTION_ERROR";

/// What the engine knows about the field whose value is being intercepted.
#[derive(Debug, Clone)]
pub struct FieldContext {
    /// Whether the field's declared type is non-null.
    pub non_null: bool,
    /// Response path of the field, from the root.
    pub path: ResponsePath,
}

impl FieldContext {
    pub fn new(non_null: bool, path: ResponsePath) -> Self {
        Self { non_null, path }
    }

    pub fn nullable(path: ResponsePath) -> Self {
        Self::new(false, path)
    }

    pub fn non_null(path: ResponsePath) -> Self {
        Self::new(true, path)
    }
}

/// Outcome of intercepting one resolved value.
#[derive(Debug)]
pub enum FieldDecision {
    /// The value is authorized as is.
    Unchanged(ResolvedValue),
    /// A denied entity on a nullable field. The field resolves to null.
    Redacted,
    /// Members without a grant were dropped. Order of the kept members is preserved.
    Filtered { value: ResolvedValue, removed: usize },
}

impl FieldDecision {
    /// The value the engine merges into the response and resolves children from.
    pub fn into_value(self) -> ResolvedValue {
        match self {
            FieldDecision::Unchanged(value) => value,
            FieldDecision::Redacted => ResolvedValue::null(),
            FieldDecision::Filtered { value, .. } => value,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FieldAuthorizationError {
    #[error("Permission denied: '{permission}' is required at '{path}'")]
    PermissionDenied {
        permission: PermissionName,
        path: ResponsePath,
    },
    #[error("{source}")]
    Oracle {
        path: ResponsePath,
        #[source]
        source: OracleError,
    },
}

impl FieldAuthorizationError {
    pub fn path(&self) -> &ResponsePath {
        match self {
            FieldAuthorizationError::PermissionDenied { path, .. } => path,
            FieldAuthorizationError::Oracle { path, .. } => path,
        }
    }
}

impl From<FieldAuthorizationError> for GraphQLError {
    fn from(error: FieldAuthorizationError) -> Self {
        match &error {
            FieldAuthorizationError::PermissionDenied { path, .. } => {
                GraphQLError::from_message_and_code(DEFAULT_DENIED_MESSAGE, PERMISSION_DENIED_CODE)
                    .with_path(path)
            }
            FieldAuthorizationError::Oracle { path, source } => {
                GraphQLError::from_message_and_code(source.to_string(), FIELD_RESOLUTION_ERROR_CODE)
                    .with_path(path)
            }
        }
    }
}

/// Decides, for each resolved field value, whether the principal may see it.
///
/// - An entity needs the model permission or an instance grant. A denied entity is redacted
///   to null on a nullable field and fails with [`FieldAuthorizationError::PermissionDenied`]
///   on a non-null one.
/// - A collection passes whole when the model permission is held, otherwise only its members
///   with an instance grant are kept. Never an error.
/// - A plain sequence keeps its non-entity members and drops entities failing both checks.
///   Never an error.
/// - Anything else passes through.
///
/// Holds nothing between calls. Oracle failures are returned as
/// [`FieldAuthorizationError::Oracle`] and never turned into a denial.
#[derive(Debug, Clone)]
pub struct FieldAuthorizationInterceptor {
    action: String,
}

impl Default for FieldAuthorizationInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldAuthorizationInterceptor {
    pub fn new() -> Self {
        Self::with_action(VIEW_ACTION)
    }

    pub fn with_action(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    fn permission_for(&self, kind: &EntityKind) -> PermissionName {
        PermissionName::for_kind(kind, &self.action)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(path = %field.path))]
    pub async fn intercept(
        &self,
        principal: &Principal,
        value: ResolvedValue,
        field: &FieldContext,
    ) -> Result<FieldDecision, FieldAuthorizationError> {
        let oracle_error = |source: OracleError| FieldAuthorizationError::Oracle {
            path: field.path.clone(),
            source,
        };

        match value {
            ResolvedValue::Entity(entity) => self
                .authorize_entity(principal, entity, field)
                .await
                .map_err(oracle_error)?,
            ResolvedValue::Collection(collection) => self
                .filter_collection(principal, collection)
                .await
                .map_err(oracle_error),
            ResolvedValue::Other(OtherValue::Sequence(items)) => self
                .filter_sequence(principal, items)
                .await
                .map_err(oracle_error),
            other => Ok(FieldDecision::Unchanged(other)),
        }
    }

    async fn authorize_entity(
        &self,
        principal: &Principal,
        entity: Entity,
        field: &FieldContext,
    ) -> Result<Result<FieldDecision, FieldAuthorizationError>, OracleError> {
        let permission = self.permission_for(entity.kind());

        let granted = principal.has_model_permission(&permission).await?
            || principal
                .has_instance_permission(&permission, &entity)
                .await?;

        if granted {
            return Ok(Ok(FieldDecision::Unchanged(entity.into())));
        }

        if field.non_null {
            debug!(permission = %permission, entity = entity.id(), "denied entity on a non-null field");
            return Ok(Err(FieldAuthorizationError::PermissionDenied {
                permission,
                path: field.path.clone(),
            }));
        }

        debug!(permission = %permission, entity = entity.id(), "redacted entity");
        Ok(Ok(FieldDecision::Redacted))
    }

    async fn filter_collection(
        &self,
        principal: &Principal,
        collection: EntityCollection,
    ) -> Result<FieldDecision, OracleError> {
        let kind = collection.kind().clone();
        let permission = self.permission_for(&kind);

        if principal.has_model_permission(&permission).await? {
            trace!(permission = %permission, "model permission held, collection passes whole");
            return Ok(FieldDecision::Unchanged(ResolvedValue::Collection(
                collection,
            )));
        }

        let entities = collection.materialize();
        let total = entities.len();
        let mut kept = Vec::with_capacity(total);
        for entity in entities {
            if principal
                .has_instance_permission(&permission, &entity)
                .await?
            {
                kept.push(entity);
            }
        }

        let removed = total - kept.len();
        debug!(
            permission = %permission,
            retained = kept.len(),
            total,
            "filtered collection"
        );

        let value = ResolvedValue::collection(kind, kept);
        if removed == 0 {
            return Ok(FieldDecision::Unchanged(value));
        }
        Ok(FieldDecision::Filtered { value, removed })
    }

    async fn filter_sequence(
        &self,
        principal: &Principal,
        items: Vec<ResolvedValue>,
    ) -> Result<FieldDecision, OracleError> {
        // Model grants are looked up once per kind for the items of this sequence only.
        let mut model_grants: HashMap<Arc<EntityKind>, bool> = HashMap::new();
        let total = items.len();
        let mut kept = Vec::with_capacity(total);

        for item in items {
            let ResolvedValue::Entity(entity) = &item else {
                kept.push(item);
                continue;
            };

            let permission = self.permission_for(entity.kind());
            let model_granted = match model_grants.get(entity.kind()) {
                Some(granted) => *granted,
                None => {
                    let granted = principal.has_model_permission(&permission).await?;
                    model_grants.insert(entity.kind().clone(), granted);
                    granted
                }
            };

            if model_granted
                || principal
                    .has_instance_permission(&permission, entity)
                    .await?
            {
                kept.push(item);
            }
        }

        let removed = total - kept.len();
        if removed == 0 {
            return Ok(FieldDecision::Unchanged(ResolvedValue::sequence(kept)));
        }

        debug!(retained = kept.len(), total, "filtered sequence");
        Ok(FieldDecision::Filtered {
            value: ResolvedValue::sequence(kept),
            removed,
        })
    }
}
