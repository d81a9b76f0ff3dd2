use super::{HickoryLookup, Lookup};
use anyhow::{Context, Result};
use dns_lookup::{getaddrinfo, AddrFamily, AddrInfoHints, SockType};
use itertools::Itertools;
use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    sync::Arc,
    time::Duration,
};
use tracing::warn;

/// Addresses from the platform resolver (`getaddrinfo`, so hosts files and
/// the local name service switch apply), TXT records from a hickory resolver
/// built from the system DNS configuration.
#[derive(Debug, Clone)]
pub struct SystemLookup {
    timeout: Duration,
    txt: Option<Arc<HickoryLookup>>,
}

#[async_trait::async_trait]
impl Lookup for SystemLookup {
    async fn lookup_ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>> {
        // We won't error out if we see an ipv6 address.
        Ok(self
            .lookup(name, AddrFamily::Inet)
            .await?
            .into_iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(ip_) => Some(ip_),
                IpAddr::V6(_) => None,
            })
            .unique()
            .collect())
    }

    async fn lookup_ipv6(&self, name: &str) -> Result<Vec<Ipv6Addr>> {
        Ok(self
            .lookup(name, AddrFamily::Inet6)
            .await?
            .into_iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(_) => None,
                IpAddr::V6(ip_) => Some(ip_),
            })
            .unique()
            .collect())
    }

    async fn lookup_txt(&self, name: &str) -> Result<Vec<Vec<String>>> {
        match &self.txt {
            Some(txt) => txt.lookup_txt(name).await,
            None => Ok(Vec::new()),
        }
    }
}

impl SystemLookup {
    pub fn new(timeout: Duration) -> Self {
        let txt = match HickoryLookup::from_system_conf(timeout) {
            Ok(lookup) => Some(Arc::new(lookup)),
            Err(err) => {
                warn!(
                    "Failed to load system DNS configuration, TXT lookups are disabled: {}",
                    err
                );
                None
            }
        };

        Self { timeout, txt }
    }

    /// A system lookup that never queries TXT records.
    pub fn without_txt(timeout: Duration) -> Self {
        Self { timeout, txt: None }
    }

    async fn lookup(&self, name: &str, family: AddrFamily) -> Result<Vec<IpAddr>> {
        let hints = AddrInfoHints {
            socktype: SockType::Stream.into(),
            address: family.into(),
            ..AddrInfoHints::default()
        };

        let query = name.to_owned();
        let task =
            tokio::task::spawn_blocking(move || getaddrinfo(Some(&query), None, Some(hints)));

        Ok(tokio::time::timeout(self.timeout, task)
            .await
            .with_context(|| format!("Lookup of {} timed out after {:?}", name, self.timeout))??
            .map_err(Into::<std::io::Error>::into)
            .with_context(|| format!("Failed to look up {}", name))?
            .filter_map(|r| r.ok())
            .map(|r| r.sockaddr.ip())
            .collect())
    }
}

impl Default for SystemLookup {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
