//! # View sets
//!
//! A view set bundles a Sea-ORM entity, its output schema, its primary key
//! type and a table of standard operations. Registering it on an
//! [`ApiRouter`] compiles that declaration into Axum routes: one synthesized
//! handler per declared operation, plus any explicitly authored [`Action`]s.
//!
//! ```rust,ignore
//! let companies = ViewSet::new("CompanyViewSet")
//!     .model::<company::Entity, company::ActiveModel>()
//!     .schema::<CompanySchema>()
//!     .pk::<i32>("id")
//!     .page_size(10)
//!     .views(
//!         Views::new()
//!             .all()
//!             .create::<CompanyCreate>()
//!             .get()
//!             .update::<CompanyUpdate>()
//!             .delete(),
//!     )
//!     .action(Action::get("query_company_include_users", "/query_company_include_users", query));
//!
//! companies.register(&mut router);
//! ```
//!
//! | operation | method | path        |
//! |-----------|--------|-------------|
//! | `all`     | GET    | `/all`      |
//! | `create`  | POST   | (prefix)    |
//! | `get`     | GET    | `/{pk}`     |
//! | `update`  | PATCH  | `/{pk}`     |
//! | `delete`  | DELETE | `/{pk}`     |
//!
//! Paths are prefixed with the segment derived from the view set name
//! (`CompanyViewSet` -> `/company`) unless `auto_prefix(false)` is set.
//! A view set missing any of model, schema, pk type or views is *manual*:
//! only its explicit actions are registered.

mod action;
pub mod naming;
mod synthesize;
mod transponder;
mod views;

pub use action::Action;
pub use transponder::{ModelBinding, Transponder};
pub use views::{AttributeError, Operation, Views};

use axum::extract::FromRef;
use sea_orm::DatabaseConnection;
use serde::{Serialize, de::DeserializeOwned};
use std::{collections::HashSet, fmt::Display, str::FromStr, sync::Arc, sync::OnceLock};
use utoipa::ToSchema;

use crate::{
    router::ApiRouter,
    schema::{PkType, SchemaBinding},
    store::{EntityStore, SeaOrmStore},
};

pub struct ViewSet<S = ()> {
    name: String,
    store: Option<Arc<dyn EntityStore>>,
    schema: Option<SchemaBinding>,
    pk: Option<(String, PkType)>,
    page_size: Option<u64>,
    views: Option<Views>,
    auto_prefix: bool,
    actions: Vec<Action<S>>,
    transponder: OnceLock<Transponder>,
}

impl<S> ViewSet<S> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: None,
            schema: None,
            pk: None,
            page_size: None,
            views: None,
            auto_prefix: true,
            actions: Vec::new(),
            transponder: OnceLock::new(),
        }
    }

    /// Back the view set with a Sea-ORM entity
    #[must_use]
    pub fn model<E, A>(self) -> Self
    where
        SeaOrmStore<E, A>: EntityStore + 'static,
        E: sea_orm::EntityTrait,
    {
        self.store(SeaOrmStore::<E, A>::new())
    }

    /// Back the view set with any store
    #[must_use]
    pub fn store(mut self, store: impl EntityStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    #[must_use]
    pub fn schema<T>(mut self) -> Self
    where
        T: Serialize + DeserializeOwned + ToSchema,
    {
        self.schema = Some(SchemaBinding::of::<T>());
        self
    }

    #[must_use]
    pub fn pk<T>(mut self, name: impl Into<String>) -> Self
    where
        T: FromStr + Serialize + 'static,
        T::Err: Display,
    {
        self.pk = Some((name.into(), PkType::of::<T>()));
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn views(mut self, views: Views) -> Self {
        self.views = Some(views);
        self
    }

    /// Whether routes are prefixed with the derived path segment (default true)
    #[must_use]
    pub fn auto_prefix(mut self, enabled: bool) -> Self {
        self.auto_prefix = enabled;
        self
    }

    #[must_use]
    pub fn action(mut self, action: Action<S>) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derived path segment, e.g. `company`
    #[must_use]
    pub fn segment(&self) -> String {
        naming::path_segment(&self.name)
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.transponder.get().is_some()
    }

    /// The shared runtime instance, once registered
    #[must_use]
    pub fn transponder(&self) -> Option<&Transponder> {
        self.transponder.get()
    }

    /// Check that the declaration is complete enough to synthesize routes.
    pub fn validate(&self) -> Result<ModelBinding, AttributeError> {
        let store = self.store.clone().ok_or(AttributeError::Missing("model"))?;
        let schema = self.schema.clone().ok_or(AttributeError::Missing("schema"))?;
        let (pk_name, pk_type) = self.pk.clone().ok_or(AttributeError::Missing("pk_type"))?;
        let views = self.views.as_ref().ok_or(AttributeError::Missing("views"))?;
        Ok(ModelBinding {
            store,
            schema,
            pk_name,
            pk_type,
            operations: views.resolve()?,
        })
    }

    fn declares_model(&self) -> bool {
        self.store.is_some() || self.schema.is_some() || self.pk.is_some() || self.views.is_some()
    }

    /// Validate, degrading to manual mode with a warning when incomplete.
    fn compile(&self) -> Option<ModelBinding> {
        match self.validate() {
            Ok(model) => Some(model),
            Err(err) if self.declares_model() => {
                tracing::warn!(
                    viewset = %self.name,
                    error = %err,
                    "view set declaration is incomplete, only explicit actions are registered"
                );
                None
            }
            Err(_) => {
                tracing::debug!(viewset = %self.name, "manual view set");
                None
            }
        }
    }
}

impl<S> ViewSet<S>
where
    S: Clone + Send + Sync + 'static,
    DatabaseConnection: FromRef<S>,
{
    /// Compile the view set into routes on `router`.
    ///
    /// The first call creates the [`Transponder`] and adds the routes, sorted
    /// by path. Later calls leave `router` untouched.
    pub fn register(&self, router: &mut ApiRouter<S>) {
        if self.is_registered() {
            tracing::debug!(viewset = %self.name, "view set already registered");
            return;
        }

        let model = self.compile();
        let explicit: HashSet<&str> = self.actions.iter().map(Action::name).collect();
        let mut actions = self.actions.clone();
        if let Some(model) = &model {
            actions.extend(synthesize::actions::<S>(model, &explicit));
        }

        let transponder = Transponder::new(self.name.clone(), self.page_size, model);
        if self.transponder.set(transponder.clone()).is_err() {
            return;
        }

        let prefix = if self.auto_prefix {
            format!("/{}", transponder.segment())
        } else {
            String::new()
        };
        let mut routes: Vec<_> = actions
            .into_iter()
            .map(|action| action.into_route(&prefix, &transponder))
            .collect();
        routes.sort_by(|(a, _), (b, _)| a.path.cmp(&b.path));

        let mut added = 0usize;
        for (info, handler) in routes {
            if let Some(method) = info.methods.iter().find(|m| router.contains(m, &info.path)) {
                tracing::warn!(
                    viewset = %self.name,
                    route = %info.name,
                    method = %method,
                    path = %info.path,
                    "route already registered, skipping"
                );
                continue;
            }
            router.add(info, handler);
            added += 1;
        }

        tracing::info!(
            viewset = %self.name,
            routes = added,
            manual = transponder.is_manual(),
            "view set registered"
        );
    }
}
