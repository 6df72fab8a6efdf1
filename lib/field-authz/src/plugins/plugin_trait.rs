use crate::plugins::hooks::on_field_resolved::{
    OnFieldResolvedHookPayload, OnFieldResolvedHookResult,
};

#[async_trait::async_trait]
pub trait ExecutionPlugin: Send + Sync + 'static {
    fn plugin_name(&self) -> &'static str;

    /// Called once per resolved field, depth first and in selection order, before the value
    /// is merged into the response or used to resolve the field's children.
    #[inline]
    async fn on_field_resolved<'exec>(
        &'exec self,
        payload: OnFieldResolvedHookPayload<'exec>,
    ) -> OnFieldResolvedHookResult<'exec> {
        payload.proceed()
    }
}

pub type ExecutionPluginBoxed = Box<dyn ExecutionPlugin>;
