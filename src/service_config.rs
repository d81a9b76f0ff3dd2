//! Service config carried in DNS TXT records.
//!
//! A record of the form `grpc_config=<json>` holds a list of choices. Each
//! choice may restrict itself to some client languages, a percentage of
//! clients and some client hostnames. The first choice accepting this client
//! wins; its `serviceConfig` object is handed to the listener untouched.

use crate::status::Status;
use anyhow::bail;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::{fmt::Display, str::FromStr};

pub const TXT_NAME_PREFIX: &str = "_grpc_config.";
pub const TXT_ATTRIBUTE: &str = "grpc_config=";
pub const CLIENT_LANGUAGE: &str = "rust";

lazy_static! {
    static ref LOCAL_HOSTNAME: Option<String> = dns_lookup::get_hostname().ok();
}

pub fn local_hostname() -> Option<&'static str> {
    LOCAL_HOSTNAME.as_deref()
}

/// Name queried for the TXT record of `host`.
pub fn txt_name(host: &str) -> String {
    format!("{}{}", TXT_NAME_PREFIX, host)
}

/// An opaque service config object.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig(Map<String, Value>);

impl ServiceConfig {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl TryFrom<Value> for ServiceConfig {
    type Error = anyhow::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(ServiceConfig(map)),
            other => bail!("Service config must be a JSON object, got {}", other),
        }
    }
}

impl FromStr for ServiceConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str::<Value>(s)?.try_into()
    }
}

impl Display for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Choice {
    client_language: Option<Vec<String>>,
    percentage: Option<f64>,
    client_hostname: Option<Vec<String>>,
    service_config: Value,
}

impl Choice {
    fn validate(&self) -> anyhow::Result<()> {
        if let Some(percentage) = self.percentage {
            if !(0.0..=100.0).contains(&percentage) {
                bail!("Choice percentage {} is out of range", percentage);
            }
        }
        if !self.service_config.is_object() {
            bail!("Choice serviceConfig must be a JSON object");
        }
        Ok(())
    }

    fn accepts(&self, percentage: u8, hostname: Option<&str>) -> bool {
        if let Some(languages) = &self.client_language {
            if !languages
                .iter()
                .any(|l| l.eq_ignore_ascii_case(CLIENT_LANGUAGE))
            {
                return false;
            }
        }

        if let Some(threshold) = self.percentage {
            if f64::from(percentage) >= threshold {
                return false;
            }
        }

        if let Some(hostnames) = &self.client_hostname {
            match hostname {
                Some(hostname) => {
                    if !hostnames.iter().any(|h| h == hostname) {
                        return false;
                    }
                }
                None => return false,
            }
        }

        true
    }
}

fn select(
    json: &str,
    percentage: u8,
    hostname: Option<&str>,
) -> anyhow::Result<Option<ServiceConfig>> {
    let choices: Vec<Choice> = serde_json::from_str(json)?;

    for choice in choices.iter() {
        choice.validate()?;
    }

    choices
        .into_iter()
        .find(|c| c.accepts(percentage, hostname))
        .map(|c| c.service_config.try_into())
        .transpose()
}

/// Picks the service config for this client out of the TXT records of a
/// name.
///
/// `records` holds one entry per TXT record, each being the list of strings
/// of that record. Only the first record carrying the `grpc_config=`
/// attribute is considered. `percentage` is the client's draw in `0..100`.
pub fn extract_and_select(
    records: &[Vec<String>],
    percentage: u8,
    hostname: Option<&str>,
) -> Result<Option<ServiceConfig>, Status> {
    let record = records
        .iter()
        .map(|strings| strings.concat())
        .find(|r| r.starts_with(TXT_ATTRIBUTE));

    let Some(record) = record else {
        return Ok(None);
    };

    select(&record[TXT_ATTRIBUTE.len()..], percentage, hostname)
        .map_err(|err| Status::unavailable(format!("Parsing service config failed: {}", err)))
}

impl From<ServiceConfig> for Value {
    fn from(config: ServiceConfig) -> Self {
        Value::Object(config.0)
    }
}
