//! Conversion routes and the registry that maps source formats to them.
//!
//! A registry is built once at startup and is immutable afterwards.
//! Registering the same source key twice is a configuration error, not a
//! silent overwrite.

mod accept;
mod catalog;
mod registry;
mod types;

pub use accept::AcceptFilter;
pub use catalog::{
    smart_convert_registry, tool_registry, tool_route, CompressionLevel, Tool, ToolOptions,
};
pub use registry::{RouteRegistry, RouteRegistryBuilder};
pub use types::{ConversionRoute, TargetFormat};

use thiserror::Error;

/// Route configuration and lookup errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("A route is already registered for source format '{0}'")]
    DuplicateRoute(String),

    #[error("No route registered for source format '{0}'")]
    UnknownRoute(String),

    #[error("Route '{route}' cannot produce '{target}'")]
    UnsupportedTarget { route: String, target: String },

    #[error("Route '{0}' declares no target formats")]
    NoTargets(String),

    #[error("Unknown tool '{0}'")]
    UnknownTool(String),
}
