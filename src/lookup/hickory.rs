use super::Lookup;
use anyhow::{bail, Result};
use hickory_proto::xfer::Protocol;
use hickory_resolver::{
    config::{NameServerConfig, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
    TokioResolver,
};
use std::{
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

#[derive(Debug)]
pub struct HickoryLookup {
    client: TokioResolver,
}

impl HickoryLookup {
    pub fn new(nameservers: Vec<NameServerConfig>, timeout: Duration) -> Self {
        let mut options = ResolverOpts::default();
        options.timeout = timeout;

        let mut config = ResolverConfig::default();
        for nameserver in nameservers {
            config.add_name_server(nameserver);
        }

        Self {
            client: TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
                .with_options(options)
                .build(),
        }
    }

    /// Queries a single server, over UDP with TCP fallback.
    pub fn with_server(server: SocketAddr, timeout: Duration) -> Self {
        Self::new(
            vec![
                NameServerConfig::new(server, Protocol::Udp),
                NameServerConfig::new(server, Protocol::Tcp),
            ],
            timeout,
        )
    }

    /// Uses the name servers of the system configuration (`resolv.conf`).
    pub fn from_system_conf(timeout: Duration) -> Result<Self> {
        let mut builder = TokioResolver::builder_tokio()?;
        builder.options_mut().timeout = timeout;

        Ok(Self {
            client: builder.build(),
        })
    }
}

#[async_trait::async_trait]
impl Lookup for HickoryLookup {
    async fn lookup_ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>> {
        Ok(self
            .client
            .ipv4_lookup(name)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
        .and_then(|r: Vec<Ipv4Addr>| {
            if r.is_empty() {
                bail!("Failed to find result for domain {}", name)
            } else {
                Ok(r)
            }
        })
    }

    async fn lookup_ipv6(&self, name: &str) -> Result<Vec<Ipv6Addr>> {
        Ok(self
            .client
            .ipv6_lookup(name)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
        .and_then(|r: Vec<Ipv6Addr>| {
            if r.is_empty() {
                bail!("Failed to find result for domain {}", name)
            } else {
                Ok(r)
            }
        })
    }

    async fn lookup_txt(&self, name: &str) -> Result<Vec<Vec<String>>> {
        match self.client.txt_lookup(name).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|txt| {
                    txt.txt_data()
                        .iter()
                        .map(|data| String::from_utf8_lossy(data).into_owned())
                        .collect()
                })
                .collect()),
            Err(err) if err.is_no_records_found() => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn resolve() -> Result<()> {
        let resolver =
            HickoryLookup::with_server("8.8.8.8:53".parse().unwrap(), Duration::from_secs(5));

        assert!(!resolver.lookup_ipv4("apple.com").await?.is_empty());
        assert!(!resolver.lookup_ipv6("facebook.com").await?.is_empty());
        assert!(!resolver.lookup_txt("google.com").await?.is_empty());
        assert!(resolver
            .lookup_txt("_grpc_config.example.com")
            .await?
            .is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn unreachable_server_fails() {
        // TEST-NET-1 is not routable, nothing answers there.
        let resolver =
            HickoryLookup::with_server("192.0.2.1:53".parse().unwrap(), Duration::from_millis(50));

        assert!(resolver.lookup_ipv4("example.com").await.is_err());
    }
}
