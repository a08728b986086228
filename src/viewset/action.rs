use axum::{
    Extension,
    handler::Handler,
    http::Method,
    routing::{MethodFilter, MethodRouter, on},
};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::{naming, transponder::Transponder};
use crate::{
    errors::ErrorResponse,
    router::{ResponseDoc, RouteInfo},
    schema::SchemaRef,
};

/// A route on a view set: explicitly authored, or synthesized from `views`.
///
/// ```rust,ignore
/// Action::patch("add_users", "/{pk}/add_users", add_users)
///     .request_schema(SchemaRef::list_of::<CompanyAddUser>())
///     .response::<CompanySchema>()
/// ```
///
/// The path is relative to the view set prefix. Handlers may extract the
/// view set's [`Transponder`] alongside their other arguments.
pub struct Action<S = ()> {
    pub(crate) name: String,
    pub(crate) path: String,
    pub(crate) methods: Vec<Method>,
    handler: MethodRouter<S>,
    status: u16,
    summary: Option<String>,
    description: Option<String>,
    tags: Option<Vec<String>>,
    request: Option<SchemaRef>,
    response: Option<SchemaRef>,
    responses: BTreeMap<u16, ResponseDoc>,
    synthesized: bool,
}

impl<S> Clone for Action<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            path: self.path.clone(),
            methods: self.methods.clone(),
            handler: self.handler.clone(),
            status: self.status,
            summary: self.summary.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            request: self.request.clone(),
            response: self.response.clone(),
            responses: self.responses.clone(),
            synthesized: self.synthesized,
        }
    }
}

impl<S> Action<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// `name` is the handler name: it sets the default summary and decides
    /// which synthesized operation, if any, this route replaces.
    pub fn new<H, T>(
        name: impl Into<String>,
        path: impl Into<String>,
        methods: &[Method],
        handler: H,
    ) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        let methods = if methods.is_empty() {
            vec![Method::GET]
        } else {
            methods.to_vec()
        };
        let filter = methods
            .iter()
            .filter_map(|method| MethodFilter::try_from(method.clone()).ok())
            .reduce(MethodFilter::or)
            .unwrap_or(MethodFilter::GET);

        Self {
            name: name.into(),
            path: path.into(),
            methods,
            handler: on(filter, handler),
            status: 200,
            summary: None,
            description: None,
            tags: None,
            request: None,
            response: None,
            responses: BTreeMap::new(),
            synthesized: false,
        }
    }

    pub fn get<H, T>(name: impl Into<String>, path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        Self::new(name, path, &[Method::GET], handler)
    }

    pub fn post<H, T>(name: impl Into<String>, path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        Self::new(name, path, &[Method::POST], handler)
    }

    pub fn patch<H, T>(name: impl Into<String>, path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        Self::new(name, path, &[Method::PATCH], handler)
    }

    pub fn delete<H, T>(name: impl Into<String>, path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        Self::new(name, path, &[Method::DELETE], handler)
    }
}

impl<S> Action<S> {
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Success status code, 200 unless set
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn request<T: ToSchema>(self) -> Self {
        self.request_schema(SchemaRef::of::<T>())
    }

    #[must_use]
    pub fn request_schema(mut self, schema: SchemaRef) -> Self {
        self.request = Some(schema);
        self
    }

    #[must_use]
    pub fn response<T: ToSchema>(self) -> Self {
        self.response_schema(SchemaRef::of::<T>())
    }

    #[must_use]
    pub fn response_list<T: ToSchema>(self) -> Self {
        self.response_schema(SchemaRef::list_of::<T>())
    }

    #[must_use]
    pub fn response_schema(mut self, schema: SchemaRef) -> Self {
        self.response = Some(schema);
        self
    }

    /// Document an additional response for `status`
    #[must_use]
    pub fn respond(mut self, status: u16, description: impl Into<String>, schema: Option<SchemaRef>) -> Self {
        self.responses.insert(
            status,
            ResponseDoc {
                description: description.into(),
                schema,
            },
        );
        self
    }

    /// Shorthand for the 404 override of single-record routes
    #[must_use]
    pub fn not_found(self) -> Self {
        self.respond(404, "Not Found", Some(SchemaRef::of::<ErrorResponse>()))
    }

    pub(crate) fn synthesized(mut self) -> Self {
        self.synthesized = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<S> Action<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Resolve metadata defaults and bind the handler to the view set's transponder.
    pub(crate) fn into_route(self, prefix: &str, transponder: &Transponder) -> (RouteInfo, MethodRouter<S>) {
        let viewset = transponder.name();
        let info = RouteInfo {
            summary: self
                .summary
                .unwrap_or_else(|| naming::default_summary(&self.name)),
            tags: naming::default_tags(self.tags, viewset),
            name: self.name,
            path: format!("{prefix}{}", self.path),
            methods: self.methods,
            description: self.description,
            status: self.status,
            request: self.request,
            response: self.response,
            responses: self.responses,
            synthesized: self.synthesized,
            integer_pk: transponder
                .model()
                .is_ok_and(|model| model.pk_type().is_integer()),
            viewset: viewset.to_string(),
        };
        let handler = self.handler.layer(Extension(transponder.clone()));
        (info, handler)
    }
}
