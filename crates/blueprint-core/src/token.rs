//! Deferred references between declared resources.
//!
//! Nothing is deployed while composing, so a resource can only point at
//! another one symbolically. The orchestration platform substitutes the
//! live values when it materializes the template.

use std::fmt;

use serde::{Serialize, Serializer};

/// A value resolved by the orchestration platform at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Literal(String),
    /// The primary identifier of a resource (its physical name or ARN).
    Ref(String),
    /// A named attribute of a resource, e.g. `Cluster.Endpoint.Address`.
    Attr { id: String, attribute: String },
    /// Concatenation of tokens.
    Join(Vec<Token>),
}

impl Token {
    pub fn literal(value: impl Into<String>) -> Self {
        Token::Literal(value.into())
    }

    pub fn join(parts: impl IntoIterator<Item = Token>) -> Self {
        Token::Join(parts.into_iter().collect())
    }

    /// Logical ids this token depends on, in order of appearance.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Token::Literal(_) => vec![],
            Token::Ref(id) | Token::Attr { id, .. } => vec![id.as_str()],
            Token::Join(parts) => parts.iter().flat_map(Token::references).collect(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(value) => f.write_str(value),
            Token::Ref(id) => write!(f, "${{{id}}}"),
            Token::Attr { id, attribute } => write!(f, "${{{id}.{attribute}}}"),
            Token::Join(parts) => parts.iter().try_for_each(|part| write!(f, "{part}")),
        }
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Handle to a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceRef(String);

impl ResourceRef {
    pub(crate) fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    pub fn token(&self) -> Token {
        Token::Ref(self.0.clone())
    }

    pub fn attr(&self, attribute: &str) -> Token {
        Token::Attr {
            id: self.0.clone(),
            attribute: attribute.to_string(),
        }
    }
}
