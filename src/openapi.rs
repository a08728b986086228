//! OpenAPI document generated from a route table.

use axum::http::Method;
use utoipa::openapi::{
    ComponentsBuilder, OpenApi, OpenApiBuilder, Ref, RefOr, Required, Schema,
    content::{Content, ContentBuilder},
    info::InfoBuilder,
    path::{HttpMethod, Operation, OperationBuilder, ParameterBuilder, ParameterIn, PathItem, PathsBuilder},
    request_body::RequestBodyBuilder,
    response::ResponseBuilder,
    schema::{Array, ObjectBuilder, Type},
};

use crate::{router::RouteInfo, schema::SchemaRef};

fn http_method(method: &Method) -> Option<HttpMethod> {
    Some(match *method {
        Method::GET => HttpMethod::Get,
        Method::POST => HttpMethod::Post,
        Method::PUT => HttpMethod::Put,
        Method::PATCH => HttpMethod::Patch,
        Method::DELETE => HttpMethod::Delete,
        Method::HEAD => HttpMethod::Head,
        Method::OPTIONS => HttpMethod::Options,
        Method::TRACE => HttpMethod::Trace,
        _ => return None,
    })
}

fn schema_of(schema: &SchemaRef) -> RefOr<Schema> {
    let reference = RefOr::Ref(Ref::from_schema_name(schema.name()));
    if schema.is_list() {
        RefOr::T(Schema::Array(Array::new(reference)))
    } else {
        reference
    }
}

fn json_content(schema: &SchemaRef) -> Content {
    ContentBuilder::new().schema(Some(schema_of(schema))).build()
}

/// Names of the `{param}` segments of a path
fn path_params(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
}

fn operation(route: &RouteInfo, method: &Method) -> Operation {
    let mut builder = OperationBuilder::new()
        .operation_id(Some(format!(
            "{}_{}_{}",
            route.viewset,
            route.name,
            method.as_str().to_lowercase()
        )))
        .summary(Some(route.summary.clone()))
        .description(route.description.clone())
        .tags(Some(route.tags.clone()));

    for name in path_params(&route.path) {
        let kind = if name == "pk" && route.integer_pk {
            Type::Integer
        } else {
            Type::String
        };
        builder = builder.parameter(
            ParameterBuilder::new()
                .name(name)
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .schema(Some(RefOr::T(Schema::Object(
                    ObjectBuilder::new().schema_type(kind).build(),
                ))))
                .build(),
        );
    }

    if let Some(request) = &route.request {
        builder = builder.request_body(Some(
            RequestBodyBuilder::new()
                .content("application/json", json_content(request))
                .required(Some(Required::True))
                .build(),
        ));
    }

    let mut success = ResponseBuilder::new().description("Successful Response");
    if let Some(response) = &route.response {
        success = success.content("application/json", json_content(response));
    }
    builder = builder.response(route.status.to_string(), success.build());

    for (status, doc) in &route.responses {
        let mut response = ResponseBuilder::new().description(doc.description.clone());
        if let Some(schema) = &doc.schema {
            response = response.content("application/json", json_content(schema));
        }
        builder = builder.response(status.to_string(), response.build());
    }

    builder.build()
}

/// Build the document for `routes`. Path parameters are documented as
/// strings, except `{pk}` of view sets keyed by an integer.
#[must_use]
pub fn document(title: &str, version: &str, routes: &[RouteInfo]) -> OpenApi {
    let mut paths = PathsBuilder::new();
    let mut schemas = Vec::new();

    for route in routes {
        for method in &route.methods {
            let Some(http) = http_method(method) else {
                continue;
            };
            paths = paths.path(
                route.path.clone(),
                PathItem::new(http, operation(route, method)),
            );
        }
        for schema in route
            .request
            .iter()
            .chain(route.response.iter())
            .chain(route.responses.values().filter_map(|doc| doc.schema.as_ref()))
        {
            schema.collect_schemas(&mut schemas);
        }
    }

    let mut components = ComponentsBuilder::new();
    let mut seen = std::collections::HashSet::new();
    for (name, schema) in schemas {
        if seen.insert(name.clone()) {
            components = components.schema(name, schema);
        }
    }

    OpenApiBuilder::new()
        .info(InfoBuilder::new().title(title).version(version).build())
        .paths(paths.build())
        .components(Some(components.build()))
        .build()
}
