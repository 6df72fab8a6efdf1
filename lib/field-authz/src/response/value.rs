use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::response::graphql_error::GraphQLError;

/// A completed response value. Objects keep the selection order of the query.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseValue {
    Null,
    Scalar(sonic_rs::Value),
    List(Vec<ResponseValue>),
    Object(Vec<(String, ResponseValue)>),
}

impl ResponseValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ResponseValue::Null)
    }

    pub fn get(&self, response_key: &str) -> Option<&ResponseValue> {
        match self {
            ResponseValue::Object(fields) => fields
                .iter()
                .find(|(key, _)| key == response_key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ResponseValue]> {
        match self {
            ResponseValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl Serialize for ResponseValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ResponseValue::Null => serializer.serialize_unit(),
            ResponseValue::Scalar(value) => value.serialize(serializer),
            ResponseValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ResponseValue::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// The `{ "data": ..., "errors": [...] }` result of executing one operation.
#[derive(Debug, Serialize)]
pub struct ExecutionResponse {
    pub data: ResponseValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl ExecutionResponse {
    pub fn to_value(&self) -> Result<sonic_rs::Value, sonic_rs::Error> {
        sonic_rs::to_value(self)
    }
}
