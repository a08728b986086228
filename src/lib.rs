//! Declarative CRUD routing for Axum and Sea-ORM.
//!
//! A [`ViewSet`] describes a resource: its entity, output schema, primary
//! key type and which standard operations to expose. Registering it on an
//! [`ApiRouter`] compiles the declaration into routes and OpenAPI metadata.
//! The [`sample`] module is a complete service built this way.

pub mod config;
pub mod errors;
pub mod logging;
pub mod openapi;
pub mod router;
pub mod sample;
pub mod schema;
pub mod store;
pub mod validation;
pub mod viewset;

pub use errors::{ApiError, ErrorResponse};
pub use router::{ApiRouter, RouteInfo};
pub use viewset::{Action, Transponder, ViewSet, Views};
