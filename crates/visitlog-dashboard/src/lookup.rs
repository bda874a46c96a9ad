//! Public IP resolution through third-party lookup services.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{error, info, warn};

use visitlog_core::config::Config;
use visitlog_core::visit::{ERROR, UNKNOWN};

use crate::error::DashboardError;

/// Resolves the public IP of the machine running the dashboard.
///
/// Never fails: lookups that cannot produce an address return the
/// `"Unknown"` or `"Error"` sentinel instead.
#[async_trait]
pub trait IpLookup: Send + Sync + 'static {
    async fn resolve(&self) -> String;
}

/// Two-step lookup: primary service, then one fallback. No retries, no
/// timeout.
pub struct HttpIpLookup {
    client: reqwest::Client,
    primary_url: String,
    fallback_url: String,
}

#[derive(Debug, Deserialize)]
struct IpResponse {
    #[serde(default)]
    ip: Option<serde_json::Value>,
}

impl IpResponse {
    fn into_ip(self) -> String {
        match self.ip {
            Some(serde_json::Value::String(ip)) if !ip.is_empty() => ip,
            _ => UNKNOWN.to_string(),
        }
    }
}

enum Attempt {
    Resolved(String),
    Rejected(StatusCode),
    Unreachable(reqwest::Error),
    Malformed(reqwest::Error),
}

impl HttpIpLookup {
    pub fn new(primary_url: &str, fallback_url: &str) -> Result<Self, DashboardError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("visitlog/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            primary_url: primary_url.to_string(),
            fallback_url: fallback_url.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, DashboardError> {
        Self::new(&config.primary_lookup_url, &config.fallback_lookup_url)
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Unreachable(e),
        };
        let status = response.status();
        if !status.is_success() {
            return Attempt::Rejected(status);
        }
        match response.json::<IpResponse>().await {
            Ok(body) => Attempt::Resolved(body.into_ip()),
            Err(e) => Attempt::Malformed(e),
        }
    }
}

#[async_trait]
impl IpLookup for HttpIpLookup {
    async fn resolve(&self) -> String {
        match self.attempt(&self.primary_url).await {
            Attempt::Resolved(ip) => {
                info!(ip = %ip, "Public IP resolved by primary lookup");
                return ip;
            }
            Attempt::Rejected(status) => {
                warn!(url = %self.primary_url, status = %status, "Primary IP lookup rejected, trying fallback");
            }
            Attempt::Unreachable(e) => {
                warn!(url = %self.primary_url, error = %e, "Primary IP lookup unreachable, trying fallback");
            }
            Attempt::Malformed(e) => {
                error!(url = %self.primary_url, error = %e, "Primary IP lookup returned an unreadable body");
                return ERROR.to_string();
            }
        }

        match self.attempt(&self.fallback_url).await {
            Attempt::Resolved(ip) => {
                info!(ip = %ip, "Public IP resolved by fallback lookup");
                ip
            }
            Attempt::Rejected(status) => {
                warn!(url = %self.fallback_url, status = %status, "Fallback IP lookup rejected");
                UNKNOWN.to_string()
            }
            Attempt::Unreachable(e) | Attempt::Malformed(e) => {
                error!(url = %self.fallback_url, error = %e, "Fallback IP lookup failed");
                ERROR.to_string()
            }
        }
    }
}
