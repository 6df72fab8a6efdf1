use crate::response::graphql_error::GraphQLError;

/// Errors that prevent an operation from being executed at all.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Failed to parse schema: {0}")]
    SchemaParse(String),
    #[error("Schema does not define the query root type '{0}'")]
    MissingQueryType(String),
    #[error("Failed to parse query: {0}")]
    QueryParse(String),
    #[error("Document does not contain any operation")]
    NoOperation,
    #[error("Must provide operation name if query contains multiple operations")]
    AmbiguousOperation,
    #[error("Unknown operation named '{0}'")]
    UnknownOperation(String),
    #[error("Only query operations can be executed")]
    UnsupportedOperation,
    #[error("Unknown type '{0}'")]
    UnknownType(String),
    #[error("Cannot query field '{field}' on type '{type_name}'")]
    UnknownField { type_name: String, field: String },
    #[error("Field '{field}' of type '{type_name}' must have a selection of subfields")]
    MissingSelection { type_name: String, field: String },
    #[error("Field '{field}' must not have a selection since type '{type_name}' has no subfields")]
    UnexpectedSelection { type_name: String, field: String },
    #[error("Unknown fragment '{0}'")]
    UnknownFragment(String),
    #[error("Fragment '{0}' spreads itself")]
    FragmentCycle(String),
    #[error("Fragment on '{condition}' cannot be spread within type '{type_name}'")]
    UnsupportedTypeCondition { condition: String, type_name: String },
    #[error("Variable '${0}' is not provided")]
    MissingVariable(String),
    #[error("Failed to convert argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },
}

impl ExecutionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ExecutionError::SchemaParse(_) | ExecutionError::MissingQueryType(_) => {
                "INVALID_SCHEMA"
            }
            ExecutionError::QueryParse(_) => "GRAPHQL_PARSE_FAILED",
            ExecutionError::NoOperation
            | ExecutionError::AmbiguousOperation
            | ExecutionError::UnknownOperation(_) => "OPERATION_RESOLUTION_FAILURE",
            ExecutionError::MissingVariable(_) | ExecutionError::InvalidArgument { .. } => {
                "BAD_USER_INPUT"
            }
            _ => "GRAPHQL_VALIDATION_FAILED",
        }
    }
}

impl From<ExecutionError> for GraphQLError {
    fn from(error: ExecutionError) -> Self {
        GraphQLError::from_message_and_code(error.to_string(), error.error_code())
    }
}

/// A resolver failed to produce a value. Reported at the field's path.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ResolverError {
    pub message: String,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
