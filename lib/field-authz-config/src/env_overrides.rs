use config::{builder::BuilderState, ConfigBuilder, ConfigError};
use envconfig::Envconfig;
use tracing::debug;

use crate::log::{LogFormat, LogLevel};

#[derive(Envconfig)]
pub struct EnvVarOverrides {
    #[envconfig(from = "LOG_LEVEL")]
    pub log_level: Option<LogLevel>,
    #[envconfig(from = "LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
    #[envconfig(from = "LOG_FILTER")]
    pub log_filter: Option<String>,

    #[envconfig(from = "FIELD_AUTHZ_ENABLED")]
    pub authorization_enabled: Option<bool>,
    #[envconfig(from = "FIELD_AUTHZ_ACTION")]
    pub authorization_action: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvVarOverridesError {
    #[error("Failed to override configuration: {0}")]
    FailedToOverrideConfig(#[from] ConfigError),
    #[error("FIELD_AUTHZ_ACTION must not be empty")]
    EmptyAction,
}

impl EnvVarOverrides {
    pub fn apply_overrides<T: BuilderState>(
        mut self,
        mut config: ConfigBuilder<T>,
    ) -> Result<ConfigBuilder<T>, EnvVarOverridesError> {
        if let Some(log_level) = self.log_level.take() {
            debug!("[config-override] 'log.level' = {:?}", log_level);
            config = config.set_override("log.level", log_level.as_str())?;
        }
        if let Some(log_format) = self.log_format.take() {
            debug!("[config-override] 'log.format' = {:?}", log_format);
            config = config.set_override("log.format", log_format.as_str())?;
        }
        if let Some(log_filter) = self.log_filter.take() {
            debug!("[config-override] 'log.filter' = {:?}", log_filter);
            config = config.set_override("log.filter", log_filter)?;
        }

        if let Some(enabled) = self.authorization_enabled.take() {
            debug!("[config-override] 'authorization.enabled' = {}", enabled);
            config = config.set_override("authorization.enabled", enabled)?;
        }
        if let Some(action) = self.authorization_action.take() {
            if action.trim().is_empty() {
                return Err(EnvVarOverridesError::EmptyAction);
            }
            debug!("[config-override] 'authorization.action' = {}", action);
            config = config.set_override("authorization.action", action)?;
        }

        Ok(config)
    }
}
