pub mod hickory;
pub mod system;

pub use self::{hickory::HickoryLookup, system::SystemLookup};

use anyhow::Result;
use std::{
    fmt::Debug,
    net::{Ipv4Addr, Ipv6Addr},
    vec::Vec,
};

/// Naming primitives a resolver is built on.
#[async_trait::async_trait]
#[auto_impl::auto_impl(Arc, Box)]
pub trait Lookup: Debug + Send + Sync {
    async fn lookup_ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>>;
    async fn lookup_ipv6(&self, name: &str) -> Result<Vec<Ipv6Addr>>;

    /// TXT records of `name`, each as the list of its strings. A name without
    /// TXT records yields an empty list, not an error.
    async fn lookup_txt(&self, _name: &str) -> Result<Vec<Vec<String>>> {
        Ok(Vec::new())
    }
}
