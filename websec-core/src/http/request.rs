//! What the toolkit needs to know about the current request.

use serde::{Deserialize, Serialize};

/// Request metadata as handed over by the host server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestInfo {
    /// Server-provided HTTPS flag (`on`, `1`, `off`, ...)
    pub https: Option<String>,
    pub forwarded_proto: Option<String>,
    pub forwarded_host: Option<String>,
    pub host: Option<String>,
    pub server_name: Option<String>,
    pub server_port: Option<u16>,
    pub request_uri: String,
}

impl RequestInfo {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            request_uri: "/".to_string(),
            ..Self::default()
        }
    }

    pub fn with_https(mut self, flag: impl Into<String>) -> Self {
        self.https = Some(flag.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.server_port = Some(port);
        self
    }

    pub fn with_forwarded(mut self, proto: Option<&str>, host: Option<&str>) -> Self {
        self.forwarded_proto = proto.map(str::to_string);
        self.forwarded_host = host.map(str::to_string);
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.request_uri = uri.into();
        self
    }

    pub fn is_https(&self) -> bool {
        if let Some(flag) = &self.https {
            let flag = flag.to_ascii_lowercase();
            if flag == "on" || flag == "1" {
                return true;
            }
        }

        if let Some(proto) = &self.forwarded_proto {
            if proto.eq_ignore_ascii_case("https") {
                return true;
            }
        }

        self.server_port == Some(443)
    }

    /// Host this request was addressed to.
    ///
    /// With `allow_proxy` the last entry of `X-Forwarded-Host` wins. A `Host`
    /// value carrying the server port has that suffix removed. Returns an
    /// empty string when nothing usable is known.
    pub fn local_host(&self, allow_proxy: bool) -> String {
        if allow_proxy {
            if let Some(forwarded) = self.forwarded_host.as_deref().filter(|h| !h.is_empty()) {
                let host = forwarded.rsplit(',').next().unwrap_or(forwarded).trim();
                if !host.is_empty() {
                    return host.to_string();
                }
            }
        }

        if let Some(host) = self.host.as_deref().filter(|h| !h.is_empty()) {
            if let Some(port) = self.server_port {
                let suffix = format!(":{}", port);
                if let Some(stripped) = host.strip_suffix(&suffix) {
                    return stripped.to_string();
                }
            }
            return host.to_string();
        }

        match (&self.server_name, self.server_port) {
            (Some(name), Some(_)) => name.clone(),
            _ => String::new(),
        }
    }
}
