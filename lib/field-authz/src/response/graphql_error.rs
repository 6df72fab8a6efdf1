use serde::Serialize;
use sonic_rs::Value;
use std::fmt;

use crate::response::path::ResponsePath;

#[derive(Clone, Debug, Serialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<GraphQLErrorPathSegment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLError {
    pub fn from_message_and_code(message: impl Into<String>, code: &str) -> Self {
        GraphQLError {
            message: message.into(),
            path: None,
            extensions: Some(sonic_rs::json!({ "code": code })),
        }
    }

    pub fn with_path(mut self, path: &ResponsePath) -> Self {
        self.path = Some(path.segments().to_vec());
        self
    }

    pub fn code(&self) -> Option<&str> {
        use sonic_rs::JsonValueTrait;

        self.extensions
            .as_ref()
            .and_then(|extensions| extensions.get("code"))
            .and_then(|code| code.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GraphQLErrorPathSegment {
    String(String),
    Index(usize),
}

impl fmt::Display for GraphQLErrorPathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphQLErrorPathSegment::String(field) => f.write_str(field),
            GraphQLErrorPathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}
