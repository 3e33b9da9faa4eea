//! Application assembly.
//!
//! # Data Flow
//! ```text
//! Registration phase (Application, owned builder):
//!     service(location, svc) → ActionResolver per location
//!     use_route / mount      → root RouteNode
//!     settings / configure
//!
//! start() → Router::new (tree frozen, patterns compiled)
//!         → setup(location) per service
//!         → transport.add({<domain>.<location>, verb}) × 6 per service
//!
//! Serving phase (App, shared):
//!     Request → route tree at /<location> (middleware)
//!             → defined result: short-circuit
//!             → otherwise: ActionResolver::call(verb, normalized args)
//! ```
//!
//! # Design Decisions
//! - The builder is consumed by `start`, so nothing can be registered once serving
//! - Remote services are reached through `ProxyService`, which speaks the same `ServiceApi`

pub mod application;
pub mod proxy;
pub mod settings;

pub use application::{App, Application};
pub use proxy::ProxyService;
pub use settings::Settings;
