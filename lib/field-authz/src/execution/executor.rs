use std::sync::Arc;

use ahash::HashMap;
use futures::future::{BoxFuture, FutureExt};
use graphql_parser::query::parse_query;
use tracing::{debug, trace};

use crate::execution::error::{ExecutionError, ResolverError};
use crate::execution::plan::{plan_operation, FieldPlan, TYPENAME_FIELD};
use crate::execution::resolver::{ResolveParams, Resolver};
use crate::execution::schema::{OutputType, Schema};
use crate::interceptor::{FieldContext, FIELD_RESOLUTION_ERROR_CODE};
use crate::plugins::hooks::on_field_resolved::{FieldControlFlow, OnFieldResolvedHookPayload};
use crate::plugins::plugin_trait::ExecutionPluginBoxed;
use crate::principal::Principal;
use crate::response::graphql_error::GraphQLError;
use crate::response::path::ResponsePath;
use crate::response::value::{ExecutionResponse, ResponseValue};
use crate::value::{EntityCollection, OtherValue, ResolvedValue};

pub const NON_NULL_VIOLATION_CODE: &str = "NON_NULL_VIOLATION";

#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    pub query: String,
    pub operation_name: Option<String>,
    pub variables: HashMap<String, sonic_rs::Value>,
}

impl ExecutionRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: sonic_rs::Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }
}

/// The error for this position has already been reported. The nearest nullable ancestor
/// becomes null.
struct NullBubble;

type Completion = Result<ResponseValue, NullBubble>;

/// Executes query operations field by field, handing every resolved value to the plugins
/// before it is completed.
pub struct Executor {
    schema: Arc<Schema>,
    resolver: Arc<dyn Resolver>,
    plugins: Vec<ExecutionPluginBoxed>,
}

impl Executor {
    pub fn new(schema: Arc<Schema>, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            schema,
            resolver,
            plugins: Vec::new(),
        }
    }

    pub fn with_plugin(mut self, plugin: ExecutionPluginBoxed) -> Self {
        debug!(plugin = plugin.plugin_name(), "registered execution plugin");
        self.plugins.push(plugin);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub async fn execute(
        &self,
        principal: &Principal,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResponse, ExecutionError> {
        let document = parse_query::<String>(&request.query)
            .map_err(|err| ExecutionError::QueryParse(err.to_string()))?;
        let plan = plan_operation(
            &self.schema,
            &document,
            request.operation_name.as_deref(),
            &request.variables,
        )?;

        let mut errors = Vec::new();
        let root = ResolvedValue::object(Vec::new());
        let data = self
            .complete_selections(
                principal,
                self.schema.query_type(),
                &plan,
                root,
                ResponsePath::default(),
                &mut errors,
            )
            .await
            .unwrap_or(ResponseValue::Null);

        trace!(errors = errors.len(), "operation executed");
        Ok(ExecutionResponse { data, errors })
    }

    fn complete_selections<'a>(
        &'a self,
        principal: &'a Principal,
        type_name: &'a str,
        selections: &'a [FieldPlan],
        mut parent: ResolvedValue,
        path: ResponsePath,
        errors: &'a mut Vec<GraphQLError>,
    ) -> BoxFuture<'a, Completion> {
        async move {
            let mut fields = Vec::with_capacity(selections.len());
            for field in selections {
                let field_path = path.field(&field.response_key);
                let value = self
                    .execute_field(principal, type_name, field, &mut parent, field_path, errors)
                    .await?;
                fields.push((field.response_key.clone(), value));
            }
            Ok(ResponseValue::Object(fields))
        }
        .boxed()
    }

    async fn execute_field(
        &self,
        principal: &Principal,
        type_name: &str,
        field: &FieldPlan,
        parent: &mut ResolvedValue,
        path: ResponsePath,
        errors: &mut Vec<GraphQLError>,
    ) -> Completion {
        if field.name == TYPENAME_FIELD {
            return Ok(ResponseValue::Scalar(sonic_rs::Value::from(type_name)));
        }

        let non_null = field.output_type.is_non_null();
        let field_error = |errors: &mut Vec<GraphQLError>, error: GraphQLError| {
            errors.push(error);
            if non_null {
                Err(NullBubble)
            } else {
                Ok(ResponseValue::Null)
            }
        };

        let resolved = match self.resolve_field(principal, type_name, field, parent).await {
            Ok(value) => value,
            Err(error) => {
                debug!(path = %path, error = %error, "resolver failed");
                let error = GraphQLError::from_message_and_code(
                    error.message,
                    FIELD_RESOLUTION_ERROR_CODE,
                )
                .with_path(&path);
                return field_error(errors, error);
            }
        };

        let context = FieldContext::new(non_null, path);
        let value = match self
            .run_field_hooks(principal, type_name, field, resolved, &context)
            .await
        {
            Ok(value) => value,
            Err(error) => return field_error(errors, error),
        };

        self.complete_value(
            principal,
            &field.output_type,
            field,
            value,
            context.path,
            errors,
        )
        .await
    }

    async fn resolve_field(
        &self,
        principal: &Principal,
        type_name: &str,
        field: &FieldPlan,
        parent: &mut ResolvedValue,
    ) -> Result<ResolvedValue, ResolverError> {
        let params = ResolveParams {
            parent: &*parent,
            parent_type: type_name,
            field_name: &field.name,
            arguments: &field.arguments,
            principal,
        };

        let resolved = self.resolver.resolve(params).await?;
        match resolved {
            Some(value) => Ok(value),
            None => Ok(parent
                .take_member(&field.name)
                .unwrap_or_else(ResolvedValue::null)),
        }
    }

    async fn run_field_hooks(
        &self,
        principal: &Principal,
        type_name: &str,
        field: &FieldPlan,
        value: ResolvedValue,
        context: &FieldContext,
    ) -> Result<ResolvedValue, GraphQLError> {
        let mut payload = OnFieldResolvedHookPayload {
            principal,
            parent_type_name: type_name,
            field_name: &field.name,
            field: context,
            value,
        };

        for plugin in &self.plugins {
            let result = plugin.on_field_resolved(payload).await;
            match result.control_flow {
                FieldControlFlow::Proceed => payload = result.payload,
                FieldControlFlow::EndWithGraphQLError(error) => return Err(error),
            }
        }

        Ok(payload.value)
    }

    fn complete_value<'a>(
        &'a self,
        principal: &'a Principal,
        output_type: &'a OutputType,
        field: &'a FieldPlan,
        value: ResolvedValue,
        path: ResponsePath,
        errors: &'a mut Vec<GraphQLError>,
    ) -> BoxFuture<'a, Completion> {
        async move {
            match output_type {
                OutputType::NonNull(inner) => {
                    match self
                        .complete_inner(principal, inner, field, value, path.clone(), errors)
                        .await
                    {
                        Ok(ResponseValue::Null) => {
                            errors.push(
                                GraphQLError::from_message_and_code(
                                    format!(
                                        "Cannot return null for non-nullable field {}.{}",
                                        field.parent_type, field.name
                                    ),
                                    NON_NULL_VIOLATION_CODE,
                                )
                                .with_path(&path),
                            );
                            Err(NullBubble)
                        }
                        completed => completed,
                    }
                }
                nullable => Ok(self
                    .complete_inner(principal, nullable, field, value, path, errors)
                    .await
                    .unwrap_or(ResponseValue::Null)),
            }
        }
        .boxed()
    }

    fn complete_inner<'a>(
        &'a self,
        principal: &'a Principal,
        output_type: &'a OutputType,
        field: &'a FieldPlan,
        value: ResolvedValue,
        path: ResponsePath,
        errors: &'a mut Vec<GraphQLError>,
    ) -> BoxFuture<'a, Completion> {
        async move {
            if value.is_null() {
                return Ok(ResponseValue::Null);
            }

            match output_type {
                OutputType::NonNull(_) => {
                    self.complete_value(principal, output_type, field, value, path, errors)
                        .await
                }
                OutputType::List(item_type) => {
                    let Some(items) = into_items(value) else {
                        errors.push(unexpected_value(field, &path, "a list"));
                        return Err(NullBubble);
                    };

                    let mut completed = Vec::with_capacity(items.len());
                    for (index, item) in items.into_iter().enumerate() {
                        completed.push(
                            self.complete_value(
                                principal,
                                item_type,
                                field,
                                item,
                                path.index(index),
                                errors,
                            )
                            .await?,
                        );
                    }
                    Ok(ResponseValue::List(completed))
                }
                OutputType::Named(type_name) if self.schema.is_leaf(type_name) => match value {
                    ResolvedValue::Other(OtherValue::Scalar(scalar)) => {
                        Ok(ResponseValue::Scalar(scalar))
                    }
                    _ => {
                        errors.push(unexpected_value(field, &path, "a scalar"));
                        Err(NullBubble)
                    }
                },
                OutputType::Named(type_name) => {
                    let parent = match value {
                        ResolvedValue::Collection(collection) => {
                            let kind = collection.kind().clone();
                            ResolvedValue::collection(kind, collection.materialize())
                        }
                        ResolvedValue::Other(OtherValue::Scalar(_)) => {
                            errors.push(unexpected_value(field, &path, "an object"));
                            return Err(NullBubble);
                        }
                        parent => parent,
                    };

                    self.complete_selections(
                        principal,
                        type_name,
                        &field.selections,
                        parent,
                        path,
                        errors,
                    )
                    .await
                }
            }
        }
        .boxed()
    }
}

/// Items of a list position. A collection is evaluated here, once.
fn into_items(value: ResolvedValue) -> Option<Vec<ResolvedValue>> {
    match value {
        ResolvedValue::Collection(collection) => Some(
            EntityCollection::materialize(collection)
                .into_iter()
                .map(ResolvedValue::Entity)
                .collect(),
        ),
        ResolvedValue::Other(OtherValue::Sequence(items)) => Some(items),
        _ => None,
    }
}

fn unexpected_value(field: &FieldPlan, path: &ResponsePath, expected: &str) -> GraphQLError {
    GraphQLError::from_message_and_code(
        format!(
            "Expected {} for field {}.{}",
            expected, field.parent_type, field.name
        ),
        FIELD_RESOLUTION_ERROR_CODE,
    )
    .with_path(path)
}
