//! Service dispatch layer for CRUD microservices.
//!
//! # Architecture Overview
//!
//! ```text
//!     Request {topic, cmd, args, params}
//!     ─────────────────────────────────▶ transport ──▶ app handler
//!                                                          │
//!                                   ┌──────────────────────┴──────────┐
//!                                   ▼                                 ▼
//!                          routing (middleware)              service::ActionResolver
//!                    pattern → iter → runner                  CRUD verb or named action
//!                      defined result short-circuits                  │
//!                                                                     ▼
//!                                                              Service impl
//!
//!     Cross-cutting: config (TOML) · observability (tracing, metrics) · error
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod observability;
pub mod routing;
pub mod service;
pub mod transport;

pub use app::{App, Application, ProxyService};
pub use config::AppConfig;
pub use error::{DispatchError, DispatchResult};
pub use routing::{action, RequestContext, RouteDef, RouteNode, Router};
pub use service::{ActionResolver, ActionTable, Id, Method, Params, Service, ServiceApi, ServiceCall};
pub use transport::{LocalTransport, Transport};
