use ahash::{HashMap, HashSet, HashSetExt};
use graphql_parser::query::{
    Definition, Document, FragmentDefinition, OperationDefinition, Selection, SelectionSet,
    TypeCondition, Value,
};
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::execution::error::ExecutionError;
use crate::execution::schema::{OutputType, Schema};

pub const TYPENAME_FIELD: &str = "__typename";

/// A field selection checked against the schema, with its arguments already coerced.
#[derive(Debug, Clone)]
pub struct FieldPlan {
    pub response_key: String,
    pub name: String,
    pub parent_type: String,
    pub output_type: OutputType,
    pub arguments: HashMap<String, sonic_rs::Value>,
    pub selections: Vec<FieldPlan>,
}

type QueryDocument<'a> = Document<'a, String>;

/// Selects the operation to run and plans its root selection set.
pub fn plan_operation(
    schema: &Schema,
    document: &QueryDocument<'_>,
    operation_name: Option<&str>,
    variables: &HashMap<String, sonic_rs::Value>,
) -> Result<Vec<FieldPlan>, ExecutionError> {
    let operation = select_operation(document, operation_name)?;

    let (selection_set, variable_definitions) = match operation {
        OperationDefinition::SelectionSet(selection_set) => (selection_set, &[][..]),
        OperationDefinition::Query(query) => {
            (&query.selection_set, query.variable_definitions.as_slice())
        }
        OperationDefinition::Mutation(_) | OperationDefinition::Subscription(_) => {
            return Err(ExecutionError::UnsupportedOperation)
        }
    };

    let mut variables = variables.clone();
    for definition in variable_definitions {
        if variables.contains_key(&definition.name) {
            continue;
        }
        if let Some(default_value) = &definition.default_value {
            let value = to_json(&definition.name, default_value, &variables)?;
            variables.insert(definition.name.clone(), value);
        }
    }

    let fragments: HashMap<&str, &FragmentDefinition<'_, String>> = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
            Definition::Operation(_) => None,
        })
        .collect();

    let planner = Planner {
        schema,
        fragments,
        variables,
    };
    let mut plans = Vec::new();
    planner.plan_selection_set(
        schema.query_type(),
        selection_set,
        &mut HashSet::new(),
        &mut plans,
    )?;
    Ok(plans)
}

fn select_operation<'d, 'a>(
    document: &'d QueryDocument<'a>,
    operation_name: Option<&str>,
) -> Result<&'d OperationDefinition<'a, String>, ExecutionError> {
    let mut operations = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Operation(operation) => Some(operation),
            Definition::Fragment(_) => None,
        });

    match operation_name {
        Some(wanted) => operations
            .find(|operation| operation_name_of(operation) == Some(wanted))
            .ok_or_else(|| ExecutionError::UnknownOperation(wanted.to_string())),
        None => {
            let first = operations.next().ok_or(ExecutionError::NoOperation)?;
            if operations.next().is_some() {
                return Err(ExecutionError::AmbiguousOperation);
            }
            Ok(first)
        }
    }
}

fn operation_name_of<'d>(operation: &'d OperationDefinition<'_, String>) -> Option<&'d str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(query) => query.name.as_deref(),
        OperationDefinition::Mutation(mutation) => mutation.name.as_deref(),
        OperationDefinition::Subscription(subscription) => subscription.name.as_deref(),
    }
}

struct Planner<'s, 'd, 'a> {
    schema: &'s Schema,
    fragments: HashMap<&'d str, &'d FragmentDefinition<'a, String>>,
    variables: HashMap<String, sonic_rs::Value>,
}

impl<'s, 'd, 'a> Planner<'s, 'd, 'a> {
    fn plan_selection_set(
        &self,
        type_name: &str,
        selection_set: &SelectionSet<'a, String>,
        expanding: &mut HashSet<&'d str>,
        plans: &mut Vec<FieldPlan>,
    ) -> Result<(), ExecutionError> {
        let object = self
            .schema
            .object(type_name)
            .ok_or_else(|| ExecutionError::UnknownType(type_name.to_string()))?;

        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    let response_key = field.alias.as_ref().unwrap_or(&field.name).clone();

                    if field.name == TYPENAME_FIELD {
                        plans.push(FieldPlan {
                            response_key,
                            name: field.name.clone(),
                            parent_type: type_name.to_string(),
                            output_type: OutputType::NonNull(Box::new(OutputType::Named(
                                "String".to_string(),
                            ))),
                            arguments: HashMap::default(),
                            selections: Vec::new(),
                        });
                        continue;
                    }

                    let output_type = object.fields.get(&field.name).ok_or_else(|| {
                        ExecutionError::UnknownField {
                            type_name: type_name.to_string(),
                            field: field.name.clone(),
                        }
                    })?;

                    let named_type = output_type.named_type();
                    let mut selections = Vec::new();
                    if self.schema.is_leaf(named_type) {
                        if !field.selection_set.items.is_empty() {
                            return Err(ExecutionError::UnexpectedSelection {
                                type_name: named_type.to_string(),
                                field: field.name.clone(),
                            });
                        }
                    } else {
                        if field.selection_set.items.is_empty() {
                            return Err(ExecutionError::MissingSelection {
                                type_name: named_type.to_string(),
                                field: field.name.clone(),
                            });
                        }
                        self.plan_selection_set(
                            named_type,
                            &field.selection_set,
                            expanding,
                            &mut selections,
                        )?;
                    }

                    let arguments = field
                        .arguments
                        .iter()
                        .map(|(name, value)| {
                            to_json(name, value, &self.variables).map(|value| (name.clone(), value))
                        })
                        .collect::<Result<HashMap<String, sonic_rs::Value>, ExecutionError>>()?;

                    plans.push(FieldPlan {
                        response_key,
                        name: field.name.clone(),
                        parent_type: type_name.to_string(),
                        output_type: output_type.clone(),
                        arguments,
                        selections,
                    });
                }
                Selection::FragmentSpread(spread) => {
                    let (&name, &fragment) = self
                        .fragments
                        .get_key_value(spread.fragment_name.as_str())
                        .ok_or_else(|| ExecutionError::UnknownFragment(spread.fragment_name.clone()))?;
                    let TypeCondition::On(condition) = &fragment.type_condition;
                    self.check_type_condition(condition, type_name)?;

                    // A spread may only reappear once its own expansion has finished.
                    if !expanding.insert(name) {
                        return Err(ExecutionError::FragmentCycle(name.to_string()));
                    }
                    self.plan_selection_set(type_name, &fragment.selection_set, expanding, plans)?;
                    expanding.remove(name);
                }
                Selection::InlineFragment(inline) => {
                    if let Some(TypeCondition::On(condition)) = &inline.type_condition {
                        self.check_type_condition(condition, type_name)?;
                    }
                    self.plan_selection_set(type_name, &inline.selection_set, expanding, plans)?;
                }
            }
        }

        Ok(())
    }

    fn check_type_condition(&self, condition: &str, type_name: &str) -> Result<(), ExecutionError> {
        if condition != type_name {
            return Err(ExecutionError::UnsupportedTypeCondition {
                condition: condition.to_string(),
                type_name: type_name.to_string(),
            });
        }
        Ok(())
    }
}

fn to_json(
    name: &str,
    value: &Value<'_, String>,
    variables: &HashMap<String, sonic_rs::Value>,
) -> Result<sonic_rs::Value, ExecutionError> {
    if let Some(missing) = first_missing_variable(value, variables) {
        return Err(ExecutionError::MissingVariable(missing.to_string()));
    }

    sonic_rs::to_value(&ArgumentValue { value, variables }).map_err(|err| {
        ExecutionError::InvalidArgument {
            name: name.to_string(),
            message: err.to_string(),
        }
    })
}

fn first_missing_variable<'v>(
    value: &'v Value<'_, String>,
    variables: &HashMap<String, sonic_rs::Value>,
) -> Option<&'v str> {
    match value {
        Value::Variable(name) if !variables.contains_key(name) => Some(name.as_str()),
        Value::List(items) => items
            .iter()
            .find_map(|item| first_missing_variable(item, variables)),
        Value::Object(fields) => fields
            .values()
            .find_map(|field| first_missing_variable(field, variables)),
        _ => None,
    }
}

/// Serializes a query literal, substituting variables.
struct ArgumentValue<'v, 'a> {
    value: &'v Value<'a, String>,
    variables: &'v HashMap<String, sonic_rs::Value>,
}

impl<'v, 'a> ArgumentValue<'v, 'a> {
    fn nested(&self, value: &'v Value<'a, String>) -> ArgumentValue<'v, 'a> {
        ArgumentValue {
            value,
            variables: self.variables,
        }
    }
}

impl Serialize for ArgumentValue<'_, '_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.value {
            Value::Variable(name) => match self.variables.get(name) {
                Some(value) => value.serialize(serializer),
                None => Err(S::Error::custom(format!("variable '${}' is not provided", name))),
            },
            Value::Int(number) => match number.as_i64() {
                Some(int) => serializer.serialize_i64(int),
                None => Err(S::Error::custom("integer out of range")),
            },
            Value::Float(float) => serializer.serialize_f64(*float),
            Value::String(string) => serializer.serialize_str(string),
            Value::Boolean(boolean) => serializer.serialize_bool(*boolean),
            Value::Null => serializer.serialize_unit(),
            Value::Enum(name) => serializer.serialize_str(name),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&self.nested(item))?;
                }
                seq.end()
            }
            Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, &self.nested(value))?;
                }
                map.end()
            }
        }
    }
}
