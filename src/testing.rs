use crate::{
    address::Address,
    listener::{ResolutionEvent, ResolverListener},
    lookup::Lookup,
    service_config::ServiceConfig,
    status::Status,
};
use anyhow::{bail, Result};
use std::{
    collections::{HashMap, HashSet},
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};
use tokio::sync::Notify;

/// Scripted naming primitives.
#[derive(Debug, Default)]
pub struct FakeLookup {
    hosts: Mutex<HashMap<String, Vec<IpAddr>>>,
    txt: Mutex<HashMap<String, Vec<Vec<String>>>>,
    failing_txt: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    address_lookups: AtomicUsize,
    txt_lookups: AtomicUsize,
}

#[allow(dead_code)]
impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(self, name: &str, ips: &[&str]) -> Self {
        self.set_host(name, ips);
        self
    }

    pub fn with_txt(self, name: &str, records: &[&str]) -> Self {
        self.txt.lock().unwrap().insert(
            name.to_owned(),
            records.iter().map(|r| vec![(*r).to_owned()]).collect(),
        );
        self
    }

    pub fn with_failing_txt(self, name: &str) -> Self {
        self.failing_txt.lock().unwrap().insert(name.to_owned());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_host(&self, name: &str, ips: &[&str]) {
        self.hosts.lock().unwrap().insert(
            name.to_owned(),
            ips.iter().map(|ip| ip.parse().unwrap()).collect(),
        );
    }

    pub fn remove_host(&self, name: &str) {
        self.hosts.lock().unwrap().remove(name);
    }

    /// Number of IPv4 lookups, one per resolution pass.
    pub fn address_lookups(&self) -> usize {
        self.address_lookups.load(Ordering::SeqCst)
    }

    pub fn txt_lookups(&self) -> usize {
        self.txt_lookups.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn ips(&self, name: &str) -> Result<Vec<IpAddr>> {
        match self.hosts.lock().unwrap().get(name) {
            Some(ips) => Ok(ips.clone()),
            None => bail!("No such host {}", name),
        }
    }
}

#[async_trait::async_trait]
impl Lookup for FakeLookup {
    async fn lookup_ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>> {
        self.address_lookups.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        Ok(self
            .ips(name)?
            .into_iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            })
            .collect())
    }

    async fn lookup_ipv6(&self, name: &str) -> Result<Vec<Ipv6Addr>> {
        self.wait().await;
        Ok(self
            .ips(name)?
            .into_iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(_) => None,
                IpAddr::V6(ip) => Some(ip),
            })
            .collect())
    }

    async fn lookup_txt(&self, name: &str) -> Result<Vec<Vec<String>>> {
        self.txt_lookups.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if self.failing_txt.lock().unwrap().contains(name) {
            bail!("SERVFAIL for {}", name);
        }
        Ok(self
            .txt
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default())
    }
}

/// Listener keeping every event it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ResolutionEvent>>,
    notify: Notify,
}

#[allow(dead_code)]
impl RecordingListener {
    pub fn events(&self) -> Vec<ResolutionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub async fn wait_for(&self, count: usize) -> Vec<ResolutionEvent> {
        loop {
            {
                let events = self.events.lock().unwrap();
                if events.len() >= count {
                    return events.clone();
                }
            }
            self.notify.notified().await;
        }
    }

    fn push(&self, event: ResolutionEvent) {
        self.events.lock().unwrap().push(event);
        self.notify.notify_one();
    }
}

impl ResolverListener for RecordingListener {
    fn on_successful_resolution(
        &self,
        addresses: Vec<Address>,
        service_config: Option<ServiceConfig>,
        service_config_error: Option<Status>,
    ) {
        self.push(ResolutionEvent::Resolved {
            addresses,
            service_config,
            service_config_error,
        })
    }

    fn on_error(&self, status: Status) {
        self.push(ResolutionEvent::Failed(status))
    }
}

/// Addresses of a `Resolved` event rendered as strings.
pub fn rendered(event: &ResolutionEvent) -> Vec<String> {
    match event {
        ResolutionEvent::Resolved { addresses, .. } => {
            addresses.iter().map(ToString::to_string).collect()
        }
        ResolutionEvent::Failed(status) => panic!("Resolution failed: {}", status),
    }
}
