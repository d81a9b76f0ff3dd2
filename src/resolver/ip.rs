//! Resolvers for `ipv4:` and `ipv6:` targets, listing literal addresses:
//! `ipv4:10.0.0.1:80,10.0.0.2` or `ipv6:[::1]:80,::2`.

use super::{fixed::FixedResolver, Resolver, ResolverOptions};
use crate::{
    address::{Address, HostPort},
    registry::ResolverFactory,
    resolver::dns::DEFAULT_PORT,
    Error, ResolverListener, Result, Target,
};
use anyhow::{anyhow, bail};
use std::{net::IpAddr, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    pub fn scheme(&self) -> &'static str {
        match self {
            IpFamily::V4 => "ipv4",
            IpFamily::V6 => "ipv6",
        }
    }

    fn matches(&self, ip: &IpAddr) -> bool {
        match self {
            IpFamily::V4 => ip.is_ipv4(),
            IpFamily::V6 => ip.is_ipv6(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IpResolverFactory {
    family: IpFamily,
}

impl IpResolverFactory {
    pub fn new(family: IpFamily) -> Self {
        Self { family }
    }

    fn parse(&self, path: &str) -> anyhow::Result<Vec<Address>> {
        if path.is_empty() {
            bail!("No address given");
        }

        path.split(',')
            .map(|entry| {
                let name: HostPort = entry.parse()?;
                let ip = name
                    .ip()
                    .ok_or(anyhow!("{} is not an IP literal", entry))?;
                if !self.family.matches(&ip) {
                    bail!("{} is not an {} address", entry, self.family.scheme());
                }
                Ok(Address::new_from_ip(ip, name.port_or(DEFAULT_PORT)))
            })
            .collect()
    }
}

impl ResolverFactory for IpResolverFactory {
    fn build(
        &self,
        target: &Target,
        listener: Arc<dyn ResolverListener>,
        options: ResolverOptions,
    ) -> Result<Box<dyn Resolver>> {
        let addresses = self
            .parse(&target.path)
            .map_err(|err| Error::invalid_target(target.to_string(), format!("{:#}", err)))?;

        Ok(Box::new(FixedResolver::new(addresses, listener, &options)?))
    }

    fn default_authority(&self, _target: &Target) -> String {
        "localhost".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{rendered, RecordingListener};
    use rstest::*;

    #[rstest]
    #[case(IpFamily::V4, "10.0.0.1", vec!["10.0.0.1:443"])]
    #[case(IpFamily::V4, "10.0.0.1:80,10.0.0.2", vec!["10.0.0.1:80", "10.0.0.2:443"])]
    #[case(IpFamily::V6, "::1", vec!["[::1]:443"])]
    #[case(IpFamily::V6, "[::1]:80,[fe80::2]", vec!["[::1]:80", "[fe80::2]:443"])]
    fn parse_valid(#[case] family: IpFamily, #[case] path: &str, #[case] expected: Vec<&str>) {
        let addresses = IpResolverFactory::new(family).parse(path).unwrap();
        let rendered: Vec<_> = addresses.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, expected);
    }

    #[rstest]
    #[case(IpFamily::V4, "")]
    #[case(IpFamily::V4, "localhost")]
    #[case(IpFamily::V4, "10.0.0.1,")]
    #[case(IpFamily::V4, "::1")]
    #[case(IpFamily::V6, "10.0.0.1:80")]
    #[case(IpFamily::V6, "::1:80,")]
    fn parse_invalid(#[case] family: IpFamily, #[case] path: &str) {
        assert!(IpResolverFactory::new(family).parse(path).is_err());
    }

    #[tokio::test]
    async fn resolves_literals() {
        let listener = Arc::new(RecordingListener::default());
        let resolver = IpResolverFactory::new(IpFamily::V4)
            .build(
                &Target::new("ipv4", None, "127.0.0.1:50051,127.0.0.2"),
                listener.clone(),
                ResolverOptions::default(),
            )
            .unwrap();
        resolver.update_resolution();

        let events = listener.wait_for(1).await;
        assert_eq!(
            rendered(&events[0]),
            vec!["127.0.0.1:50051", "127.0.0.2:443"]
        );
    }

    #[tokio::test]
    async fn rejects_bad_literal() {
        let listener = Arc::new(RecordingListener::default());
        let result = IpResolverFactory::new(IpFamily::V6).build(
            &Target::new("ipv6", None, "127.0.0.1"),
            listener,
            ResolverOptions::default(),
        );

        assert!(matches!(result, Err(Error::InvalidTarget { .. })));
    }
}
