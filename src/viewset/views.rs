use serde::{Serialize, de::DeserializeOwned};
use std::{collections::BTreeMap, fmt, str::FromStr};
use utoipa::ToSchema;

use crate::{schema::InputSchema, validation::Validatable};

/// The standard operations a view set can synthesize
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    All,
    Create,
    Get,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::All,
        Operation::Create,
        Operation::Get,
        Operation::Update,
        Operation::Delete,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Operation::All => "all",
            Operation::Create => "create",
            Operation::Get => "get",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// `create` and `update` cannot run without an input schema
    #[must_use]
    pub fn requires_input(self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| AttributeError::UnknownOperation(s.to_string()))
    }
}

/// Why a view set cannot synthesize its default routes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    #[error("missing attribute `{0}`")]
    Missing(&'static str),
    #[error("`views` names unknown operation `{0}`")]
    UnknownOperation(String),
    #[error("`views` entry `{0}` requires an input schema")]
    MissingInput(Operation),
}

/// Operation name to optional input schema, in declaration order.
///
/// Keys are plain strings so a table can be assembled from configuration;
/// they are checked against [`Operation`] when the view set is validated.
#[derive(Clone, Debug, Default)]
pub struct Views {
    entries: Vec<(String, Option<InputSchema>)>,
}

impl Views {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an operation. A repeated name replaces the earlier entry.
    #[must_use]
    pub fn with(mut self, operation: impl Into<String>, input: Option<InputSchema>) -> Self {
        let operation = operation.into();
        self.entries.retain(|(name, _)| *name != operation);
        self.entries.push((operation, input));
        self
    }

    #[must_use]
    pub fn all(self) -> Self {
        self.with("all", None)
    }

    #[must_use]
    pub fn get(self) -> Self {
        self.with("get", None)
    }

    #[must_use]
    pub fn delete(self) -> Self {
        self.with("delete", None)
    }

    #[must_use]
    pub fn create<C>(self) -> Self
    where
        C: Serialize + DeserializeOwned + Validatable + ToSchema,
    {
        self.with("create", Some(InputSchema::of::<C>()))
    }

    #[must_use]
    pub fn update<C>(self) -> Self
    where
        C: Serialize + DeserializeOwned + Validatable + ToSchema + Default,
    {
        self.with("update", Some(InputSchema::partial::<C>()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn resolve(&self) -> Result<BTreeMap<Operation, Option<InputSchema>>, AttributeError> {
        let mut resolved = BTreeMap::new();
        for (name, input) in &self.entries {
            let operation: Operation = name.parse()?;
            if operation.requires_input() && input.is_none() {
                return Err(AttributeError::MissingInput(operation));
            }
            resolved.insert(operation, input.clone());
        }
        Ok(resolved)
    }
}
