use field_authz_config::authorization::AuthorizationConfig;

use crate::interceptor::{FieldAuthorizationError, FieldAuthorizationInterceptor};
use crate::plugins::hooks::on_field_resolved::{
    OnFieldResolvedHookPayload, OnFieldResolvedHookResult,
};
use crate::plugins::plugin_trait::ExecutionPlugin;
use crate::response::graphql_error::GraphQLError;

/// Runs every resolved field value through the [`FieldAuthorizationInterceptor`].
pub struct FieldAuthorizationPlugin {
    enabled: bool,
    interceptor: FieldAuthorizationInterceptor,
    denied_message: String,
}

impl FieldAuthorizationPlugin {
    pub fn from_config(config: &AuthorizationConfig) -> Self {
        Self {
            enabled: config.enabled,
            interceptor: FieldAuthorizationInterceptor::with_action(config.action.as_str()),
            denied_message: config.denied_message.clone(),
        }
    }
}

#[async_trait::async_trait]
impl ExecutionPlugin for FieldAuthorizationPlugin {
    fn plugin_name(&self) -> &'static str {
        "field_authorization"
    }

    async fn on_field_resolved<'exec>(
        &'exec self,
        mut payload: OnFieldResolvedHookPayload<'exec>,
    ) -> OnFieldResolvedHookResult<'exec> {
        if !self.enabled {
            return payload.proceed();
        }

        let value = payload.take_value();
        match self
            .interceptor
            .intercept(payload.principal, value, payload.field)
            .await
        {
            Ok(decision) => payload.proceed_with(decision.into_value()),
            Err(error @ FieldAuthorizationError::PermissionDenied { .. }) => {
                let mut graphql_error: GraphQLError = error.into();
                graphql_error.message = self.denied_message.clone();
                payload.end_with_graphql_error(graphql_error)
            }
            Err(error) => {
                tracing::warn!(
                    path = %error.path(),
                    error = %error,
                    "permission backend failed while authorizing a field"
                );
                payload.end_with_graphql_error(error.into())
            }
        }
    }
}
