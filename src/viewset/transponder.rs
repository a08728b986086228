use axum::{extract::FromRequestParts, http::request::Parts};
use sea_orm::DbErr;
use std::{collections::BTreeMap, fmt, sync::Arc};

use super::{naming, views::Operation};
use crate::{
    errors::ApiError,
    schema::{InputSchema, PkType, SchemaBinding},
    store::EntityStore,
};

/// Everything a view set declared about its model, once validated
pub struct ModelBinding {
    pub(crate) store: Arc<dyn EntityStore>,
    pub(crate) schema: SchemaBinding,
    pub(crate) pk_name: String,
    pub(crate) pk_type: PkType,
    pub(crate) operations: BTreeMap<Operation, Option<InputSchema>>,
}

impl ModelBinding {
    #[must_use]
    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn schema(&self) -> &SchemaBinding {
        &self.schema
    }

    #[must_use]
    pub fn pk_name(&self) -> &str {
        &self.pk_name
    }

    #[must_use]
    pub fn pk_type(&self) -> PkType {
        self.pk_type
    }

    pub fn operations(&self) -> impl Iterator<Item = (Operation, Option<&InputSchema>)> {
        self.operations.iter().map(|(op, input)| (*op, input.as_ref()))
    }

    /// Input schema declared for `operation`
    pub fn input(&self, operation: Operation) -> Result<&InputSchema, ApiError> {
        self.operations
            .get(&operation)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                ApiError::internal(
                    format!("No input schema declared for `{operation}`"),
                    None,
                )
            })
    }
}

impl fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBinding")
            .field("table", &self.store.table())
            .field("pk", &self.pk_name)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

struct Inner {
    name: String,
    segment: String,
    page_size: Option<u64>,
    model: Option<ModelBinding>,
}

/// The one runtime instance of a registered view set.
///
/// Created on first registration and shared by every route of the view set.
/// Handlers receive it as an extractor, the way a method receives `self`;
/// it carries no per-request state.
#[derive(Clone)]
pub struct Transponder {
    inner: Arc<Inner>,
}

impl Transponder {
    pub(crate) fn new(
        name: impl Into<String>,
        page_size: Option<u64>,
        model: Option<ModelBinding>,
    ) -> Self {
        let name = name.into();
        Self {
            inner: Arc::new(Inner {
                segment: naming::path_segment(&name),
                name,
                page_size,
                model,
            }),
        }
    }

    /// Name of the view set, e.g. `CompanyViewSet`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Derived path segment, e.g. `company`
    #[must_use]
    pub fn segment(&self) -> &str {
        &self.inner.segment
    }

    #[must_use]
    pub fn page_size(&self) -> Option<u64> {
        self.inner.page_size
    }

    /// Resource name used in error messages, e.g. `Company`
    #[must_use]
    pub fn resource(&self) -> &str {
        naming::strip_suffix(&self.inner.name)
    }

    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.inner.model.is_none()
    }

    /// The validated model declaration; manual view sets have none.
    pub fn model(&self) -> Result<&ModelBinding, ApiError> {
        self.inner.model.as_ref().ok_or_else(|| {
            ApiError::internal(format!("{} declares no model", self.inner.name), None)
        })
    }

    pub fn not_found(&self, pk: &str) -> ApiError {
        ApiError::not_found(self.resource(), Some(pk.to_string()))
    }

    /// Map a lookup failure, naming this view set's resource when the record is missing
    pub fn lookup_error(&self, err: DbErr, pk: &str) -> ApiError {
        match err {
            DbErr::RecordNotFound(_) => self.not_found(pk),
            other => other.into(),
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Transponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transponder")
            .field("name", &self.inner.name)
            .field("segment", &self.inner.segment)
            .field("manual", &self.is_manual())
            .finish_non_exhaustive()
    }
}

impl<S> FromRequestParts<S> for Transponder
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Transponder>()
            .cloned()
            .ok_or_else(|| ApiError::internal("Route is not bound to a view set", None))
    }
}
