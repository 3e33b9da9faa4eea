//! Service subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound call (verb, args, params)
//!     → params.rs (normalize positional args into ServiceCall)
//!     → resolver.rs (CRUD or named action?)
//!         → CRUD:   Service::{find,get,create,update,patch,remove}
//!         → action: action.rs table lookup → handler(service, ActionArgs)
//!     → Result or DispatchError
//! ```
//!
//! # Design Decisions
//! - Actions live in an explicit table, never looked up by string-built method names
//! - A CRUD verb name is never an action
//! - Identifiers are validated only for literal CRUD calls

pub mod action;
pub mod api;
pub mod memory;
pub mod method;
pub mod params;
pub mod resolver;

pub use action::{Action, ActionArgs, ActionHandler, ActionTable};
pub use api::{ActionRef, Service, ServiceApi};
pub use memory::MemoryService;
pub use method::{is_crud_name, Method};
pub use params::{Id, Params, ServiceCall, QUERY_ACTION_KEY};
pub use resolver::{ActionResolver, Intent};
