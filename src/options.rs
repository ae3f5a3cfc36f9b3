//! Configuration options for the binding client.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{BindingError, Result};

/// Protocol version announced in the endpoint query string
pub const PROTOCOL_VERSION: u8 = 7;

/// Client name announced in the endpoint query string
pub const CLIENT_NAME: &str = "pusher-binding-rust";

/// Configuration accepted when constructing a [`Client`](crate::Client).
///
/// `cluster` and `host` address the same concern (endpoint selection), so the
/// builder keeps them mutually exclusive: setting one clears the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Application key
    pub app_key: String,

    /// Cluster identifier (e.g., "mt1", "eu", "ap1")
    #[serde(default)]
    pub cluster: Option<String>,

    /// Custom host
    #[serde(default)]
    pub host: Option<String>,

    /// Port (default: 443 for wss, 80 for ws)
    #[serde(default)]
    pub port: Option<u16>,

    /// Use an encrypted (TLS) connection
    #[serde(default)]
    pub encrypted: Option<bool>,

    /// Let the transport reconnect on its own
    #[serde(default)]
    pub auto_reconnect: Option<bool>,

    /// Activity timeout in milliseconds
    #[serde(default)]
    pub activity_timeout_ms: Option<u64>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            app_key: String::new(),
            cluster: None,
            host: None,
            port: None,
            encrypted: Some(true),
            auto_reconnect: Some(true),
            activity_timeout_ms: None,
        }
    }
}

impl ClientOptions {
    /// Create new options with just the app key
    pub fn new(app_key: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            ..Default::default()
        }
    }

    /// Parse options handed over as a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        if options.cluster.is_some() && options.host.is_some() {
            return Err(BindingError::config(
                "`cluster` and `host` are mutually exclusive",
            ));
        }
        Ok(options)
    }

    /// Builder pattern: set cluster (clears any custom host)
    pub fn cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self.host = None;
        self
    }

    /// Builder pattern: set custom host (clears any cluster)
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self.cluster = None;
        self
    }

    /// Builder pattern: set port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder pattern: enable/disable encryption
    pub fn encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = Some(encrypted);
        self
    }

    /// Builder pattern: enable/disable transport-driven reconnection
    pub fn auto_reconnect(mut self, auto_reconnect: bool) -> Self {
        self.auto_reconnect = Some(auto_reconnect);
        self
    }

    /// Builder pattern: set activity timeout
    pub fn activity_timeout(mut self, timeout: Duration) -> Self {
        self.activity_timeout_ms = Some(
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        );
        self
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted.unwrap_or(true)
    }

    pub fn is_auto_reconnect(&self) -> bool {
        self.auto_reconnect.unwrap_or(true)
    }

    pub fn get_activity_timeout(&self) -> Option<Duration> {
        self.activity_timeout_ms.map(Duration::from_millis)
    }

    /// Get the effective WebSocket endpoint.
    ///
    /// Meant for transport implementations; the client never calls this, so a
    /// malformed host only surfaces when a transport asks for the URL.
    pub fn endpoint_url(&self) -> Result<Url> {
        let encrypted = self.is_encrypted();
        let scheme = if encrypted { "wss" } else { "ws" };

        let host = if let Some(ref host) = self.host {
            host.clone()
        } else if let Some(ref cluster) = self.cluster {
            format!("ws-{}.pusher.com", cluster)
        } else {
            "ws.pusherapp.com".to_string()
        };

        let port = self.port.unwrap_or(if encrypted { 443 } else { 80 });

        // Don't include port in URL if it's the default for the scheme
        let port_str = if (encrypted && port == 443) || (!encrypted && port == 80) {
            String::new()
        } else {
            format!(":{}", port)
        };

        let url = Url::parse(&format!(
            "{}://{}{}/app/{}?protocol={}&client={}&version={}",
            scheme,
            host,
            port_str,
            self.app_key,
            PROTOCOL_VERSION,
            CLIENT_NAME,
            env!("CARGO_PKG_VERSION")
        ))?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_endpoint() {
        let opts = ClientOptions::new("test-key").cluster("mt1");
        let url = opts.endpoint_url().unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.host_str(), Some("ws-mt1.pusher.com"));
        assert_eq!(url.port(), None);
        assert_eq!(url.path(), "/app/test-key");
    }

    #[test]
    fn test_custom_host_endpoint() {
        let opts = ClientOptions::new("test-key")
            .host("localhost")
            .port(6001)
            .encrypted(false);
        let url = opts.endpoint_url().unwrap();
        assert!(url.as_str().starts_with("ws://localhost:6001/app/test-key"));
    }

    #[test]
    fn test_host_and_cluster_are_exclusive() {
        let opts = ClientOptions::new("k").cluster("eu").host("example.com");
        assert_eq!(opts.cluster, None);
        assert_eq!(opts.host.as_deref(), Some("example.com"));

        let opts = opts.cluster("ap1");
        assert_eq!(opts.host, None);
        assert_eq!(opts.cluster.as_deref(), Some("ap1"));
    }

    #[test]
    fn test_from_json() {
        let opts = ClientOptions::from_json(
            r#"{"app_key":"k","cluster":"mt1","encrypted":true,"activity_timeout_ms":30000}"#,
        )
        .unwrap();
        assert_eq!(opts.cluster.as_deref(), Some("mt1"));
        assert!(opts.is_encrypted());
        assert!(opts.is_auto_reconnect());
        assert_eq!(opts.get_activity_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_from_json_rejects_host_with_cluster() {
        let err = ClientOptions::from_json(r#"{"app_key":"k","cluster":"mt1","host":"h"}"#)
            .unwrap_err();
        assert!(matches!(err, BindingError::ConfigurationError { .. }));
    }

    #[test]
    fn test_activity_timeout_saturates() {
        let opts = ClientOptions::new("test-key").activity_timeout(Duration::MAX);
        assert_eq!(opts.activity_timeout_ms, Some(u64::MAX));
    }
}
