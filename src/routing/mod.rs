//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteDef / RouteNode tree (+ mounted subtrees)
//!     → Router::new compiles every pattern (pattern.rs cache)
//!     → Freeze as immutable Router
//!
//! Incoming Call (path, params, args):
//!     → runner.rs creates RequestContext + RouteIter
//!     → iter.rs yields the next matching frame (parent before children)
//!     → context.rs runs the frame's action (advance / finish)
//!     → first defined result wins, else /error route or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Matching is lazy: frames are computed only when the dispatcher asks
//! - Deterministic: same input always visits the same routes in the same order
//! - Sync and async handler faults surface the same way

pub mod context;
pub mod iter;
pub mod pattern;
pub mod route;
pub mod runner;

pub use context::RequestContext;
pub use iter::{MatchFrame, RouteIter};
pub use pattern::{compile, Matcher, PathMatch, PatternError};
pub use route::{action, RouteAction, RouteDef, RouteNode, ERROR_ROUTE_PATH};
pub use runner::Router;
