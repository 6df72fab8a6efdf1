use crate::interceptor::FieldContext;
use crate::principal::Principal;
use crate::response::graphql_error::GraphQLError;
use crate::value::ResolvedValue;

pub struct OnFieldResolvedHookPayload<'exec> {
    /// The principal the request is executed for.
    pub principal: &'exec Principal,
    /// Name of the object type declaring the field, e.g. `Query` or `Project`.
    pub parent_type_name: &'exec str,
    /// Schema name of the field. Aliases are not applied here.
    pub field_name: &'exec str,
    /// Nullability and response path of the field.
    pub field: &'exec FieldContext,
    /// The value produced by the resolver, or by a previous plugin.
    /// Whatever is left here is merged into the response and becomes the parent value of the
    /// field's children.
    ///
    /// Example:
    /// ```
    /// async fn on_field_resolved<'exec>(&'exec self, mut payload: OnFieldResolvedHookPayload<'exec>) -> OnFieldResolvedHookResult<'exec> {
    ///     if payload.field_name == "secret" {
    ///         return payload.proceed_with(ResolvedValue::null());
    ///     }
    ///     payload.proceed()
    /// }
    /// ```
    pub value: ResolvedValue,
}

pub enum FieldControlFlow {
    Proceed,
    /// Fails the field. The error is reported and the field is treated as null.
    EndWithGraphQLError(GraphQLError),
}

pub struct OnFieldResolvedHookResult<'exec> {
    pub payload: OnFieldResolvedHookPayload<'exec>,
    pub control_flow: FieldControlFlow,
}

impl<'exec> OnFieldResolvedHookPayload<'exec> {
    /// Takes the value out of the payload, leaving null in its place.
    pub fn take_value(&mut self) -> ResolvedValue {
        std::mem::replace(&mut self.value, ResolvedValue::null())
    }

    pub fn proceed(self) -> OnFieldResolvedHookResult<'exec> {
        OnFieldResolvedHookResult {
            payload: self,
            control_flow: FieldControlFlow::Proceed,
        }
    }

    pub fn proceed_with(mut self, value: ResolvedValue) -> OnFieldResolvedHookResult<'exec> {
        self.value = value;
        self.proceed()
    }

    /// A path-less error gets the field's path attached.
    pub fn end_with_graphql_error(self, mut error: GraphQLError) -> OnFieldResolvedHookResult<'exec> {
        if error.path.is_none() {
            error = error.with_path(&self.field.path);
        }
        OnFieldResolvedHookResult {
            payload: self,
            control_flow: FieldControlFlow::EndWithGraphQLError(error),
        }
    }
}
