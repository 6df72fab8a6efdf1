use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DENIED_MESSAGE: &str = "You do not have permission to access this field";

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct AuthorizationConfig {
    /// When disabled, every resolved value passes through untouched.
    ///
    /// Can also be set via the `FIELD_AUTHZ_ENABLED` environment variable.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// The action used to derive permission names (`<namespace>.<action>_<kind>`).
    ///
    /// Can also be set via the `FIELD_AUTHZ_ACTION` environment variable.
    #[serde(default = "default_action")]
    pub action: String,

    /// Message of the error reported for a denied non-null field.
    #[serde(default = "default_denied_message")]
    pub denied_message: String,

    /// Ordered list of permission backends. A permission is granted if any backend grants it.
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            action: default_action(),
            denied_message: default_denied_message(),
            backends: Vec::new(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_action() -> String {
    "view".to_string()
}

fn default_denied_message() -> String {
    DEFAULT_DENIED_MESSAGE.to_string()
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Grants loaded from configuration: superusers, direct and group model permissions,
    /// and explicit object permissions.
    Static(StaticBackendConfig),
    /// Grants instance permissions on entities owned by the requesting principal.
    Ownership(OwnershipBackendConfig),
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct StaticBackendConfig {
    /// Principals holding every permission.
    #[serde(default)]
    pub superusers: Vec<String>,
    /// Principals holding no permission at all, superusers included.
    #[serde(default)]
    pub inactive: Vec<String>,
    /// Named groups and the model permissions they carry.
    #[serde(default)]
    pub groups: HashMap<String, Vec<String>>,
    /// Direct model permissions and group memberships, keyed by principal id.
    #[serde(default)]
    pub principals: HashMap<String, PrincipalGrantsConfig>,
    /// Permissions scoped to a single entity instance.
    #[serde(default)]
    pub object_permissions: Vec<ObjectPermissionConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct PrincipalGrantsConfig {
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct ObjectPermissionConfig {
    pub principal: String,
    /// Permission in the `<namespace>.<codename>` form, e.g. `tests.view_project`.
    pub permission: String,
    pub entity_id: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct OwnershipBackendConfig {
    /// Actions an owner is allowed to perform on the entities they own.
    #[serde(default = "default_owner_actions")]
    pub actions: Vec<String>,
}

impl Default for OwnershipBackendConfig {
    fn default() -> Self {
        Self {
            actions: default_owner_actions(),
        }
    }
}

fn default_owner_actions() -> Vec<String> {
    vec![default_action()]
}
