use anyhow::{anyhow, bail, Context};
use std::{
    fmt::Display,
    net::{IpAddr, Ipv6Addr, SocketAddr},
    path::PathBuf,
    str::FromStr,
};

/// A resolved backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl Address {
    pub fn new_from_ip(ip: IpAddr, port: u16) -> Self {
        Address::Tcp(SocketAddr::new(ip, port))
    }

    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match self {
            Address::Tcp(addr) => Some(*addr),
            Address::Unix(_) => None,
        }
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Address::Tcp(addr)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Address::Tcp(addr) => write!(f, "{}", addr),
            Address::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A `host[:port]` name as written in a target.
///
/// IPv6 literals may appear bare (`::1`, no port) or bracketed (`[::1]:443`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub port: Option<u16>,
}

impl HostPort {
    pub fn new(host: &str, port: Option<u16>) -> Self {
        Self {
            host: host.to_owned(),
            port,
        }
    }

    /// The host as an IP literal, if it is one.
    pub fn ip(&self) -> Option<IpAddr> {
        self.host.parse().ok()
    }

    pub fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }
}

fn parse_port(port: &str) -> anyhow::Result<u16> {
    port.parse()
        .with_context(|| format!("Failed to parse port \"{}\"", port))
}

impl FromStr for HostPort {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        if value.is_empty() {
            bail!("Name is empty");
        }

        if value.chars().any(|c| c.is_whitespace() || c == '/') {
            bail!("Name contains invalid characters");
        }

        if let Some(rest) = value.strip_prefix('[') {
            let (host, rest) = rest
                .split_once(']')
                .ok_or(anyhow!("Missing closing bracket in IPv6 literal"))?;
            host.parse::<Ipv6Addr>()
                .context("Bracketed host is not an IPv6 literal")?;

            let port = match rest {
                "" => None,
                rest => Some(parse_port(
                    rest.strip_prefix(':')
                        .ok_or(anyhow!("Unexpected characters after IPv6 literal"))?,
                )?),
            };

            return Ok(HostPort::new(host, port));
        }

        if value.parse::<Ipv6Addr>().is_ok() {
            return Ok(HostPort::new(value, None));
        }

        match value.rsplit_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    bail!("Host is empty");
                }
                if host.contains(':') {
                    bail!("IPv6 literals with a port must be bracketed");
                }
                Ok(HostPort::new(host, Some(parse_port(port)?)))
            }
            None => Ok(HostPort::new(value, None)),
        }
    }
}

impl Display for HostPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bracket = self.host.contains(':');
        match (bracket, self.port) {
            (true, Some(port)) => write!(f, "[{}]:{}", self.host, port),
            (false, Some(port)) => write!(f, "{}:{}", self.host, port),
            (_, None) => write!(f, "{}", self.host),
        }
    }
}
