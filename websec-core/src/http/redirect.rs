//! Open-redirect-safe `Location` construction.

use url::Url;

use super::headers::Location;
use super::request::RequestInfo;
use crate::config::RedirectConfig;
use crate::error::{Result, SecurityError};

#[derive(Debug, Clone, Default)]
pub struct Redirector {
    whitelist: Vec<String>,
    allow_proxy: bool,
}

impl Redirector {
    pub fn new(allow_proxy: bool) -> Self {
        Self {
            whitelist: Vec::new(),
            allow_proxy,
        }
    }

    pub fn from_config(config: &RedirectConfig) -> Self {
        let mut redirector = Self::new(config.allow_proxy);
        redirector.add_whitelist(config.whitelist.iter().cloned());
        redirector
    }

    pub fn add_whitelist(&mut self, hosts: impl IntoIterator<Item = String>) {
        self.whitelist.extend(hosts);
    }

    pub fn add_whitelisted_host(&mut self, host: impl Into<String>) {
        self.whitelist.push(host.into());
    }

    pub fn whitelist(&self) -> &[String] {
        &self.whitelist
    }

    /// Validates `target` and returns a 302 `Location` for it.
    ///
    /// The target must be an absolute HTTP(S) URL. With `preserve_https` an
    /// HTTPS request may only redirect to HTTPS; with `stay_local` the target
    /// must point at the host serving this request; a non-empty whitelist
    /// must contain the target host.
    pub fn redirect_for(
        &self,
        target: &str,
        request: &RequestInfo,
        stay_local: bool,
        preserve_https: bool,
    ) -> Result<Location> {
        let url = parse_absolute(target)?;

        if preserve_https && request.is_https() && url.scheme() != "https" {
            return Err(SecurityError::InvalidRedirect(format!(
                "expected an HTTPS URL: {}",
                url
            )));
        }

        if stay_local && !self.is_local(&url, request) {
            crate::log_security!(warn, target_url = %url, "rejected non-local redirect");
            return Err(SecurityError::InvalidRedirect(format!(
                "not a local HTTP(S) URL: {}",
                url
            )));
        }

        if !self.whitelist.is_empty() && !self.is_whitelisted(&url) {
            return Err(SecurityError::InvalidRedirect(format!(
                "host is not whitelisted: {}",
                url
            )));
        }

        crate::log_security!(debug, location = %url, "redirect approved");
        Ok(Location::new(url.to_string()))
    }

    fn is_local(&self, url: &Url, request: &RequestInfo) -> bool {
        let mut url_host = url.host_str().unwrap_or_default().to_string();
        if let Some(port) = url.port() {
            url_host.push_str(&format!(":{}", port));
        }

        request.local_host(self.allow_proxy).eq_ignore_ascii_case(&url_host)
    }

    fn is_whitelisted(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or_default();
        self.whitelist.iter().any(|allowed| allowed.eq_ignore_ascii_case(host))
    }
}

fn parse_absolute(target: &str) -> Result<Url> {
    let url = Url::parse(target).map_err(|e| {
        SecurityError::InvalidRedirect(format!("not a valid absolute HTTP(S) URL: {} ({})", target, e))
    })?;

    match (url.scheme(), url.host_str()) {
        ("http" | "https", Some(host)) if !host.is_empty() => Ok(url),
        _ => Err(SecurityError::InvalidRedirect(format!(
            "not a valid absolute HTTP(S) URL: {}",
            target
        ))),
    }
}
