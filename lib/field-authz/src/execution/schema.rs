use ahash::{HashMap, HashMapExt, HashSet};
use graphql_parser::schema::{self, Definition, TypeDefinition};

use crate::execution::error::ExecutionError;

const BUILT_IN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Declared output type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputType {
    Named(String),
    List(Box<OutputType>),
    NonNull(Box<OutputType>),
}

impl OutputType {
    pub fn is_non_null(&self) -> bool {
        matches!(self, OutputType::NonNull(_))
    }

    /// The innermost named type, e.g. `Expense` for `[Expense!]!`.
    pub fn named_type(&self) -> &str {
        match self {
            OutputType::Named(name) => name,
            OutputType::List(inner) | OutputType::NonNull(inner) => inner.named_type(),
        }
    }
}

impl<'a> From<&schema::Type<'a, String>> for OutputType {
    fn from(value: &schema::Type<'a, String>) -> Self {
        match value {
            schema::Type::NamedType(name) => OutputType::Named(name.clone()),
            schema::Type::ListType(inner) => OutputType::List(Box::new(inner.as_ref().into())),
            schema::Type::NonNullType(inner) => {
                OutputType::NonNull(Box::new(inner.as_ref().into()))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub fields: HashMap<String, OutputType>,
}

/// The object types of a schema, with just enough information to plan and complete queries.
/// Interfaces, unions and input types are not executed.
#[derive(Debug, Clone)]
pub struct Schema {
    query_type: String,
    objects: HashMap<String, ObjectType>,
    leaf_types: HashSet<String>,
}

impl Schema {
    pub fn parse(sdl: &str) -> Result<Self, ExecutionError> {
        let document = schema::parse_schema::<String>(sdl)
            .map_err(|err| ExecutionError::SchemaParse(err.to_string()))?;

        let mut query_type = "Query".to_string();
        let mut objects = HashMap::new();
        let mut leaf_types: HashSet<String> =
            BUILT_IN_SCALARS.iter().map(|name| name.to_string()).collect();

        for definition in &document.definitions {
            match definition {
                Definition::SchemaDefinition(schema_definition) => {
                    if let Some(query) = &schema_definition.query {
                        query_type = query.clone();
                    }
                }
                Definition::TypeDefinition(TypeDefinition::Object(object)) => {
                    let fields = object
                        .fields
                        .iter()
                        .map(|field| (field.name.clone(), OutputType::from(&field.field_type)))
                        .collect();
                    objects.insert(
                        object.name.clone(),
                        ObjectType {
                            name: object.name.clone(),
                            fields,
                        },
                    );
                }
                Definition::TypeDefinition(TypeDefinition::Scalar(scalar)) => {
                    leaf_types.insert(scalar.name.clone());
                }
                Definition::TypeDefinition(TypeDefinition::Enum(enum_type)) => {
                    leaf_types.insert(enum_type.name.clone());
                }
                _ => {}
            }
        }

        if !objects.contains_key(&query_type) {
            return Err(ExecutionError::MissingQueryType(query_type));
        }

        Ok(Self {
            query_type,
            objects,
            leaf_types,
        })
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.objects.get(name)
    }

    pub fn is_leaf(&self, name: &str) -> bool {
        self.leaf_types.contains(name)
    }
}
