use std::fmt;

use crate::response::graphql_error::GraphQLErrorPathSegment;

/// Location of a value in the response, from the root field down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponsePath(Vec<GraphQLErrorPathSegment>);

impl ResponsePath {
    pub fn field(&self, response_key: &str) -> Self {
        self.child(GraphQLErrorPathSegment::String(response_key.to_string()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.child(GraphQLErrorPathSegment::Index(index))
    }

    fn child(&self, segment: GraphQLErrorPathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(segment);
        Self(segments)
    }

    pub fn segments(&self) -> &[GraphQLErrorPathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<GraphQLErrorPathSegment>> for ResponsePath {
    fn from(segments: Vec<GraphQLErrorPathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for ResponsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
