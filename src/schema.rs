//! Type-erased handles on the serde/utoipa types a view set is declared with.
//!
//! A view set names its output schema, input schemas and primary key type
//! once, as Rust types. The handles below capture what the synthesized
//! handlers need from those types (conversion, validation, documentation) as
//! plain function pointers, so routes can be generated without the handlers
//! being generic over every type involved.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::{borrow::Cow, fmt::Display, str::FromStr};
use utoipa::{
    PartialSchema, ToSchema,
    openapi::{RefOr, Schema},
};

use crate::{errors::ApiError, validation::Validatable};

/// Column name to JSON value, as written to the store
pub type Fields = Map<String, Value>;

/// Pushes a type's schema, and every schema it references, into a component list
pub type SchemaCollector = fn(&mut Vec<(String, RefOr<Schema>)>);

fn collect<T: ToSchema>(schemas: &mut Vec<(String, RefOr<Schema>)>) {
    schemas.push((T::name().into_owned(), T::schema()));
    T::schemas(schemas);
}

/// Documentation reference to a named schema, or to a list of it
#[derive(Clone, Debug)]
pub struct SchemaRef {
    name: Cow<'static, str>,
    list: bool,
    collect: SchemaCollector,
}

impl SchemaRef {
    #[must_use]
    pub fn of<T: ToSchema>() -> Self {
        Self {
            name: T::name(),
            list: false,
            collect: collect::<T>,
        }
    }

    #[must_use]
    pub fn list_of<T: ToSchema>() -> Self {
        Self::of::<T>().into_list()
    }

    #[must_use]
    pub fn into_list(mut self) -> Self {
        self.list = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        self.list
    }

    pub fn collect_schemas(&self, schemas: &mut Vec<(String, RefOr<Schema>)>) {
        (self.collect)(schemas);
    }
}

/// Output schema of a view set: turns stored entity records into response bodies
#[derive(Clone, Debug)]
pub struct SchemaBinding {
    doc: SchemaRef,
    reshape: fn(Value) -> Result<Value, serde_json::Error>,
}

fn reshape<T: Serialize + DeserializeOwned>(entity: Value) -> Result<Value, serde_json::Error> {
    serde_json::to_value(serde_json::from_value::<T>(entity)?)
}

impl SchemaBinding {
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: Serialize + DeserializeOwned + ToSchema,
    {
        Self {
            doc: SchemaRef::of::<T>(),
            reshape: reshape::<T>,
        }
    }

    #[must_use]
    pub fn doc(&self) -> &SchemaRef {
        &self.doc
    }

    /// Serialize one entity record through the schema; fields the schema
    /// does not declare are dropped.
    pub fn from_entity(&self, entity: Value) -> Result<Value, ApiError> {
        Ok((self.reshape)(entity)?)
    }

    pub fn from_entities(&self, entities: Vec<Value>) -> Result<Vec<Value>, ApiError> {
        entities
            .into_iter()
            .map(|entity| self.from_entity(entity))
            .collect()
    }
}

/// Input schema of a `create` or `update` operation
#[derive(Clone, Debug)]
pub struct InputSchema {
    doc: SchemaRef,
    parse: fn(Value) -> Result<Fields, ApiError>,
}

fn decode<C>(body: Value) -> Result<Fields, ApiError>
where
    C: Serialize + DeserializeOwned + Validatable,
{
    let input: C = serde_json::from_value(body)
        .map_err(|err| ApiError::validation_failed(vec![err.to_string()]))?;
    input.validate()?;
    match serde_json::to_value(&input)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(ApiError::internal(
            "Input schema must serialize to an object",
            None,
        )),
    }
}

fn decode_partial<C>(body: Value) -> Result<Fields, ApiError>
where
    C: Serialize + DeserializeOwned + Validatable + Default,
{
    let mut fields = decode::<C>(body)?;
    let defaults = serde_json::to_value(C::default())?;
    fields.retain(|key, value| !value.is_null() && defaults.get(key) != Some(value));
    Ok(fields)
}

impl InputSchema {
    /// Every field of the decoded input is written.
    #[must_use]
    pub fn of<C>() -> Self
    where
        C: Serialize + DeserializeOwned + Validatable + ToSchema,
    {
        Self {
            doc: SchemaRef::of::<C>(),
            parse: decode::<C>,
        }
    }

    /// Only fields that are set and differ from `C::default()` are written.
    #[must_use]
    pub fn partial<C>() -> Self
    where
        C: Serialize + DeserializeOwned + Validatable + ToSchema + Default,
    {
        Self {
            doc: SchemaRef::of::<C>(),
            parse: decode_partial::<C>,
        }
    }

    #[must_use]
    pub fn doc(&self) -> &SchemaRef {
        &self.doc
    }

    /// Decode and validate a request body into the fields to write.
    pub fn parse(&self, body: Value) -> Result<Fields, ApiError> {
        (self.parse)(body)
    }
}

/// Primary key type of a view set, used to decode the `{pk}` path segment
#[derive(Clone, Copy, Debug)]
pub struct PkType {
    name: &'static str,
    parse: fn(&str) -> Result<Value, String>,
}

fn parse_key<T>(raw: &str) -> Result<Value, String>
where
    T: FromStr + Serialize,
    T::Err: Display,
{
    let key = raw.parse::<T>().map_err(|err| err.to_string())?;
    serde_json::to_value(key).map_err(|err| err.to_string())
}

impl PkType {
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: FromStr + Serialize + 'static,
        T::Err: Display,
    {
        Self {
            name: std::any::type_name::<T>(),
            parse: parse_key::<T>,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(
            self.name,
            "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64"
        )
    }

    pub fn parse(&self, raw: &str) -> Result<Value, ApiError> {
        (self.parse)(raw).map_err(|err| {
            ApiError::validation_failed(vec![format!(
                "pk: '{raw}' is not a valid {}: {err}",
                self.name
            )])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Serialize, Deserialize, ToSchema, Default)]
    struct CompanyPatch {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        rank: i32,
    }

    impl Validatable for CompanyPatch {}

    #[derive(Serialize, Deserialize, ToSchema)]
    struct CompanyOut {
        id: i32,
        name: String,
    }

    #[test]
    fn test_partial_input_drops_unset_and_default_fields() {
        let input = InputSchema::partial::<CompanyPatch>();
        let fields = input.parse(json!({"name": "X"})).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["name"], json!("X"));

        let fields = input.parse(json!({"rank": 0})).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn test_full_input_keeps_every_field() {
        let input = InputSchema::of::<CompanyPatch>();
        let fields = input.parse(json!({})).unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_input_type_mismatch_is_validation_error() {
        let input = InputSchema::of::<CompanyPatch>();
        let err = input.parse(json!({"rank": "high"})).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_schema_drops_undeclared_fields() {
        let schema = SchemaBinding::of::<CompanyOut>();
        let out = schema
            .from_entity(json!({"id": 1, "name": "Acme", "secret": "x"}))
            .unwrap();
        assert_eq!(out, json!({"id": 1, "name": "Acme"}));
        assert_eq!(schema.doc().name(), "CompanyOut");
    }

    #[test]
    fn test_pk_type_parses_path_segment() {
        let pk = PkType::of::<i32>();
        assert!(pk.is_integer());
        assert_eq!(pk.parse("42").unwrap(), json!(42));
        assert!(pk.parse("forty-two").is_err());

        let uid = PkType::of::<String>();
        assert!(!uid.is_integer());
        assert_eq!(uid.parse("250100001").unwrap(), json!("250100001"));
    }
}
