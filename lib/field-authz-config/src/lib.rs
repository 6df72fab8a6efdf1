pub mod authorization;
mod env_overrides;
pub mod log;

use std::convert::Infallible;
use std::path::PathBuf;

use config::{Config, File, FileFormat, FileSourceFile};
use envconfig::Envconfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    authorization::AuthorizationConfig,
    env_overrides::{EnvVarOverrides, EnvVarOverridesError},
    log::LoggingConfig,
};

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct FieldAuthzConfig {
    /// The logger configuration.
    #[serde(default)]
    pub log: LoggingConfig,

    /// Field-level authorization settings and the permission backend chain.
    #[serde(default)]
    pub authorization: AuthorizationConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum FieldAuthzConfigError {
    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(#[from] config::ConfigError),
    #[error("Failed to apply configuration overrides: {0}")]
    EnvVarOverridesError(#[from] EnvVarOverridesError),
    #[error("Failed to load the environment variables: {0}")]
    EnvVarLoadError(#[from] envconfig::Error),
    #[error("Failed to parse the configuration file path: {0}")]
    ConfigPathParseError(Infallible),
}

static DEFAULT_FILE_NAMES: &[&str] = &[
    "field-authz.config.yaml",
    "field-authz.config.yml",
    "field-authz.config.json",
    "field-authz.config.json5",
];

/// Loads the configuration from `override_config_path`, or from the first default file name
/// found in the working directory, then applies the environment variable overrides.
pub fn load_config(
    override_config_path: Option<String>,
) -> Result<FieldAuthzConfig, FieldAuthzConfigError> {
    let env_overrides = EnvVarOverrides::init_from_env()?;
    let mut config = Config::builder();

    if let Some(path_str) = override_config_path {
        let path_buf = path_str
            .parse::<PathBuf>()
            .map_err(FieldAuthzConfigError::ConfigPathParseError)?;
        let as_file: File<FileSourceFile, _> = path_buf.into();
        config = config.add_source(as_file.required(true));
    } else {
        for name in DEFAULT_FILE_NAMES {
            config = config.add_source(File::with_name(name).required(false));
        }
    }

    config = env_overrides.apply_overrides(config)?;

    Ok(config.build()?.try_deserialize::<FieldAuthzConfig>()?)
}

pub fn parse_yaml_config(config_raw: &str) -> Result<FieldAuthzConfig, FieldAuthzConfigError> {
    Config::builder()
        .add_source(File::from_str(config_raw, FileFormat::Yaml))
        .build()?
        .try_deserialize::<FieldAuthzConfig>()
        .map_err(FieldAuthzConfigError::ConfigLoadError)
}

/// JSON schema of the configuration file, for editor tooling.
pub fn config_schema() -> schemars::Schema {
    schemars::schema_for!(FieldAuthzConfig)
}

#[cfg(test)]
mod tests {
    use config::Config;

    use super::*;
    use crate::authorization::{BackendConfig, DEFAULT_DENIED_MESSAGE};
    use crate::log::{LogFormat, LogLevel};

    #[test]
    fn defaults_when_sections_are_missing() {
        let config = parse_yaml_config("log:\n  level: warn\n").unwrap();

        assert_eq!(config.log.level, LogLevel::Warn);
        assert!(config.authorization.enabled);
        assert_eq!(config.authorization.action, "view");
        assert_eq!(config.authorization.denied_message, DEFAULT_DENIED_MESSAGE);
        assert!(config.authorization.backends.is_empty());
    }

    #[test]
    fn parses_backend_chain_in_order() {
        let config = parse_yaml_config(
            r#"
authorization:
  backends:
    - type: static
      superusers: [admin]
      groups:
        auditors: ["tests.view_expense"]
      principals:
        alice:
          permissions: ["tests.view_project"]
          groups: [auditors]
      object_permissions:
        - principal: bob
          permission: tests.view_project
          entity_id: "1"
    - type: ownership
"#,
        )
        .unwrap();

        let backends = &config.authorization.backends;
        assert_eq!(backends.len(), 2);

        let BackendConfig::Static(static_backend) = &backends[0] else {
            panic!("expected the static backend first, got {:?}", backends[0]);
        };
        assert_eq!(static_backend.superusers, vec!["admin".to_string()]);
        assert_eq!(
            static_backend.principals["alice"].groups,
            vec!["auditors".to_string()]
        );
        assert_eq!(static_backend.object_permissions[0].entity_id, "1");

        let BackendConfig::Ownership(ownership) = &backends[1] else {
            panic!("expected the ownership backend second, got {:?}", backends[1]);
        };
        assert_eq!(ownership.actions, vec!["view".to_string()]);
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = parse_yaml_config("authorization:\n  enabeld: false\n");
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_take_precedence_over_file_values() {
        let overrides = EnvVarOverrides {
            log_level: Some(LogLevel::Trace),
            log_format: Some(LogFormat::Json),
            log_filter: None,
            authorization_enabled: Some(false),
            authorization_action: Some("read".to_string()),
        };
        let builder = Config::builder().add_source(File::from_str(
            "authorization:\n  enabled: true\n  action: view\n",
            FileFormat::Yaml,
        ));

        let config: FieldAuthzConfig = overrides
            .apply_overrides(builder)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.log.level, LogLevel::Trace);
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(!config.authorization.enabled);
        assert_eq!(config.authorization.action, "read");
    }

    #[test]
    fn empty_action_override_is_rejected() {
        let overrides = EnvVarOverrides {
            log_level: None,
            log_format: None,
            log_filter: None,
            authorization_enabled: None,
            authorization_action: Some("  ".to_string()),
        };

        let result = overrides.apply_overrides(Config::builder());
        assert!(matches!(result, Err(EnvVarOverridesError::EmptyAction)));
    }

    #[test]
    fn schema_describes_top_level_sections() {
        let schema = serde_json::to_value(config_schema()).unwrap();
        let properties = schema["properties"].as_object().unwrap();

        assert!(properties.contains_key("log"));
        assert!(properties.contains_key("authorization"));
    }
}
