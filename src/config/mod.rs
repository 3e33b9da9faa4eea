//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → Application::from_config (transport timeout, settings)
//!     → observability (log level, metrics endpoint)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the route tree it feeds is frozen at start
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AppConfig, ObservabilityConfig, TransportConfig};
pub use validation::{validate_config, ValidationError};
