//! Resolver for `dns:` targets.
//!
//! `dns:host[:port]`, `dns:///host[:port]` and bare `host[:port]` targets
//! resolve through the system lookup. `dns://server[:port]/host[:port]`
//! queries the given DNS server instead.

use super::{Resolver, ResolverOptions};
use crate::{
    address::{Address, HostPort},
    backoff::Backoff,
    listener::Delivery,
    lookup::{HickoryLookup, Lookup, SystemLookup},
    registry::ResolverFactory,
    service_config::{self, ServiceConfig},
    status::Status,
    Error, ResolverListener, Result, Target,
};
use anyhow::anyhow;
use itertools::{interleave, Itertools};
use parking_lot::Mutex;
use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    sync::Arc,
};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, info, warn};

pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_DNS_PORT: u16 = 53;

type Resolution = (Vec<Address>, std::result::Result<Option<ServiceConfig>, Status>);

#[derive(Debug, Default, Clone)]
pub struct DnsResolverFactory;

impl ResolverFactory for DnsResolverFactory {
    fn build(
        &self,
        target: &Target,
        listener: Arc<dyn ResolverListener>,
        options: ResolverOptions,
    ) -> Result<Box<dyn Resolver>> {
        Ok(Box::new(DnsResolver::new(target, listener, options)?))
    }

    fn default_authority(&self, target: &Target) -> String {
        target.path.clone()
    }
}

pub struct DnsResolver {
    inner: Arc<Inner>,
}

struct Inner {
    target: String,
    name: HostPort,
    port: u16,
    lookup: Arc<dyn Lookup>,
    service_config: bool,
    percentage: u8,
    runtime: Handle,
    delivery: Delivery,
    state: Mutex<State>,
}

/// `pending` covers both an in-flight pass and an armed retry timer; `task`
/// is whichever of the two is current.
struct State {
    pending: bool,
    backoff: Backoff,
    task: Option<JoinHandle<()>>,
}

fn parse_dns_server(authority: &str) -> anyhow::Result<SocketAddr> {
    let server: HostPort = authority.parse()?;
    let ip = server
        .ip()
        .ok_or(anyhow!("DNS server {} is not an IP literal", authority))?;
    Ok(SocketAddr::new(ip, server.port_or(DEFAULT_DNS_PORT)))
}

impl DnsResolver {
    pub fn new(
        target: &Target,
        listener: Arc<dyn ResolverListener>,
        options: ResolverOptions,
    ) -> Result<Self> {
        let name: HostPort = target.path.parse().map_err(|err: anyhow::Error| {
            Error::invalid_target(target.to_string(), format!("{:#}", err))
        })?;
        let runtime = options.runtime_handle()?;

        let server = match target.authority.as_deref() {
            None | Some("") => None,
            Some(authority) => Some(parse_dns_server(authority).map_err(|err| {
                Error::invalid_target(target.to_string(), format!("{:#}", err))
            })?),
        };

        let lookup: Arc<dyn Lookup> = match (options.lookup, server) {
            (Some(lookup), _) => lookup,
            (None, None) => Arc::new(SystemLookup::new(options.query_timeout)),
            (None, Some(server)) => {
                Arc::new(HickoryLookup::with_server(server, options.query_timeout))
            }
        };

        debug!("Created DNS resolver for {} using {:?}", target, lookup);

        Ok(Self {
            inner: Arc::new(Inner {
                target: target.to_string(),
                port: name.port_or(DEFAULT_PORT),
                name,
                lookup,
                service_config: options.service_config,
                percentage: rand::random_range(0..100),
                runtime,
                delivery: Delivery::new(listener),
                state: Mutex::new(State {
                    pending: false,
                    backoff: Backoff::new(options.backoff),
                    task: None,
                }),
            }),
        })
    }
}

impl Resolver for DnsResolver {
    fn update_resolution(&self) {
        self.inner.start_resolution();
    }

    fn destroy(&self) {
        self.inner.destroy();
    }
}

impl Drop for DnsResolver {
    fn drop(&mut self) {
        self.inner.destroy();
    }
}

impl Inner {
    fn start_resolution(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if self.delivery.is_shut() {
            return;
        }
        if state.pending {
            debug!("Resolution of {} already pending", self.target);
            return;
        }

        state.pending = true;
        let inner = self.clone();
        state.task = Some(self.runtime.spawn(async move { inner.run().await }));
    }

    async fn run(self: Arc<Self>) {
        let token = self.delivery.token().clone();
        let outcome = tokio::select! {
            _ = token.cancelled() => return,
            outcome = self.resolve() => outcome,
        };

        match outcome {
            Ok((addresses, service_config)) => {
                {
                    let mut state = self.state.lock();
                    state.pending = false;
                    state.task = None;
                    state.backoff.reset();
                }

                info!("Resolved {} to {}", self.target, addresses.iter().join(", "));
                if let Err(status) = &service_config {
                    warn!("Service config of {} rejected: {}", self.target, status.details);
                }
                self.delivery.resolved(addresses, service_config);
            }
            Err(status) => {
                warn!("{}", status.details);
                if self.delivery.failed(status) {
                    self.schedule_retry();
                }
            }
        }
    }

    fn schedule_retry(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if self.delivery.is_shut() {
            return;
        }

        let delay = state.backoff.next_delay();
        debug!("Retrying resolution of {} in {:?}", self.target, delay);

        let inner = self.clone();
        state.task = Some(self.runtime.spawn(async move {
            let token = inner.delivery.token().clone();
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            inner.state.lock().pending = false;
            inner.start_resolution();
        }));
    }

    fn destroy(&self) {
        self.delivery.shut();

        let mut state = self.state.lock();
        state.pending = false;
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }

    async fn resolve(&self) -> std::result::Result<Resolution, Status> {
        if let Some(ip) = self.name.ip() {
            return Ok((vec![Address::new_from_ip(ip, self.port)], Ok(None)));
        }

        let host = self.name.host.as_str();
        let addresses = async {
            let (v4, v6) = futures::join!(
                self.lookup.lookup_ipv4(host),
                self.lookup.lookup_ipv6(host)
            );
            self.aggregate(v4, v6)
        };
        let service_config = async {
            if self.service_config {
                self.fetch_service_config(host).await
            } else {
                Ok(None)
            }
        };

        let (addresses, service_config) = futures::join!(addresses, service_config);
        Ok((addresses?, service_config))
    }

    /// IPv4 and IPv6 results interleaved, IPv4 first.
    fn aggregate(
        &self,
        v4: anyhow::Result<Vec<Ipv4Addr>>,
        v6: anyhow::Result<Vec<Ipv6Addr>>,
    ) -> std::result::Result<Vec<Address>, Status> {
        let mut errors = Vec::new();
        let v4 = v4.unwrap_or_else(|err| {
            errors.push(format!("{:#}", err));
            Vec::new()
        });
        let v6 = v6.unwrap_or_else(|err| {
            errors.push(format!("{:#}", err));
            Vec::new()
        });

        let addresses: Vec<_> = interleave(
            v4.into_iter().map(IpAddr::V4),
            v6.into_iter().map(IpAddr::V6),
        )
        .unique()
        .map(|ip| Address::new_from_ip(ip, self.port))
        .collect();

        if addresses.is_empty() {
            let cause = if errors.is_empty() {
                "no addresses found".to_owned()
            } else {
                errors.join("; ")
            };
            return Err(Status::unavailable(format!(
                "Name resolution failed for target {}: {}",
                self.target, cause
            )));
        }

        Ok(addresses)
    }

    async fn fetch_service_config(
        &self,
        host: &str,
    ) -> std::result::Result<Option<ServiceConfig>, Status> {
        match self.lookup.lookup_txt(&service_config::txt_name(host)).await {
            Ok(records) => service_config::extract_and_select(
                &records,
                self.percentage,
                service_config::local_hostname(),
            ),
            Err(err) => Err(Status::unavailable(format!(
                "TXT query for {} failed: {:#}",
                host, err
            ))),
        }
    }
}
