//! Name resolution for RPC channels.
//!
//! A target string such as `localhost:50051` or `dns:///example.com` is
//! handed to a [`ResolverRegistry`], which picks a resolver by scheme. The
//! resolver reports address snapshots (and optional service config) to a
//! [`ResolverListener`] every time a resolution pass completes.

pub mod address;
pub mod backoff;
pub mod listener;
pub mod lookup;
pub mod registry;
pub mod resolver;
pub mod service_config;
pub mod status;
pub mod target;

#[cfg(test)]
mod testing;

pub use address::Address;
pub use backoff::{Backoff, BackoffConfig};
pub use listener::{ResolutionEvent, ResolverListener};
pub use registry::{
    create_resolver, default_authority, register_all, register_resolver, ResolverFactory,
    ResolverRegistry,
};
pub use resolver::{Resolver, ResolverOptions};
pub use service_config::ServiceConfig;
pub use status::{Code, Status};
pub use target::Target;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("no resolver registered for target {0} and no default scheme set")]
    NoResolver(String),

    #[error("resolvers must be created inside a tokio runtime or given one in options")]
    NoRuntime,
}

impl Error {
    pub(crate) fn invalid_target(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
