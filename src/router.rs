use axum::{Router, http::Method, routing::MethodRouter};
use std::collections::BTreeMap;

use crate::schema::SchemaRef;

/// Documentation for one non-default response of a route
#[derive(Clone, Debug)]
pub struct ResponseDoc {
    pub description: String,
    pub schema: Option<SchemaRef>,
}

/// Metadata of a registered route
#[derive(Clone, Debug)]
pub struct RouteInfo {
    /// Handler name, e.g. `all`
    pub name: String,
    pub path: String,
    pub methods: Vec<Method>,
    pub summary: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Success status code
    pub status: u16,
    pub request: Option<SchemaRef>,
    pub response: Option<SchemaRef>,
    pub responses: BTreeMap<u16, ResponseDoc>,
    pub synthesized: bool,
    /// Whether `{pk}` in the path is an integer key
    pub integer_pk: bool,
    /// View set that registered the route
    pub viewset: String,
}

/// An Axum router under a path prefix, together with the metadata of the
/// routes added to it.
pub struct ApiRouter<S = ()> {
    prefix: String,
    router: Router<S>,
    routes: Vec<RouteInfo>,
}

impl<S> ApiRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// `prefix` is empty or starts with `/`
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_end_matches('/').to_string(),
            router: Router::new(),
            routes: Vec::new(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Routes added so far, paths relative to this router's prefix
    #[must_use]
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    #[must_use]
    pub fn contains(&self, method: &Method, path: &str) -> bool {
        self.routes
            .iter()
            .any(|route| route.path == path && route.methods.contains(method))
    }

    pub fn add(&mut self, info: RouteInfo, handler: MethodRouter<S>) {
        let path = if info.path.is_empty() { "/" } else { info.path.as_str() };
        self.router = std::mem::replace(&mut self.router, Router::new()).route(path, handler);
        self.routes.push(info);
    }

    /// Mount `other` under its own prefix, relative to this router
    pub fn include(&mut self, other: ApiRouter<S>) {
        let (router, routes) = other.finish();
        self.router = std::mem::replace(&mut self.router, Router::new()).merge(router);
        self.routes.extend(routes);
    }

    /// The Axum router with every route mounted under the prefix, and the
    /// route table with full paths.
    #[must_use]
    pub fn finish(self) -> (Router<S>, Vec<RouteInfo>) {
        let prefix = self.prefix;
        let routes = self
            .routes
            .into_iter()
            .map(|mut route| {
                route.path = format!("{prefix}{}", route.path);
                route
            })
            .collect();
        let router = if prefix.is_empty() {
            self.router
        } else {
            Router::new().nest(&prefix, self.router)
        };
        (router, routes)
    }
}
