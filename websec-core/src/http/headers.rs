//! Security response headers rendered as `Name: value` lines.

use std::collections::BTreeMap;
use std::fmt;

use super::request::RequestInfo;
use crate::config::{CsrfHeaderConfig, HeadersConfig, HstsConfig};
use crate::csrf::CsrfToken;

/// What the host should do with a header for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderDirective {
    Emit(String),
    Redirect { location: String, status: u16 },
}

pub trait Header: Send + Sync {
    /// Stable key used for ordering and replacement inside a [`HeaderSet`]
    fn id(&self) -> &'static str;

    fn name(&self) -> &str;

    fn value(&self) -> String;

    fn line(&self) -> String {
        format!("{}: {}", self.name(), self.value())
    }

    fn directive(&self, _request: &RequestInfo) -> HeaderDirective {
        HeaderDirective::Emit(self.line())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrictTransportSecurity {
    pub config: HstsConfig,
}

impl StrictTransportSecurity {
    pub fn new(config: HstsConfig) -> Self {
        Self { config }
    }
}

impl Header for StrictTransportSecurity {
    fn id(&self) -> &'static str {
        "strict_transport_security"
    }

    fn name(&self) -> &str {
        "Strict-Transport-Security"
    }

    fn value(&self) -> String {
        let mut value = format!("max-age={}", self.config.max_age);
        if self.config.include_subdomains {
            value.push_str("; includeSubDomains");
        }
        value
    }

    /// HSTS is only meaningful over HTTPS; plain requests are bounced there.
    fn directive(&self, request: &RequestInfo) -> HeaderDirective {
        if request.is_https() {
            HeaderDirective::Emit(self.line())
        } else {
            HeaderDirective::Redirect {
                location: format!(
                    "https://{}{}",
                    request.host.as_deref().unwrap_or_default(),
                    request.request_uri
                ),
                status: 301,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsrfTokenHeader {
    pub header_name: String,
    pub token: String,
}

impl CsrfTokenHeader {
    pub fn new(config: &CsrfHeaderConfig, token: &CsrfToken) -> Self {
        Self {
            header_name: config.header_name.clone(),
            token: token.value.clone(),
        }
    }
}

impl Header for CsrfTokenHeader {
    fn id(&self) -> &'static str {
        "csrf_token"
    }

    fn name(&self) -> &str {
        &self.header_name
    }

    fn value(&self) -> String {
        self.token.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub url: String,
    pub status_code: u16,
}

impl Location {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status_code: 302,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }
}

impl Header for Location {
    fn id(&self) -> &'static str {
        "location"
    }

    fn name(&self) -> &str {
        "Location"
    }

    fn value(&self) -> String {
        self.url.clone()
    }

    fn directive(&self, _request: &RequestInfo) -> HeaderDirective {
        HeaderDirective::Redirect {
            location: self.url.clone(),
            status: self.status_code,
        }
    }
}

/// Headers keyed by id and always iterated in alphabetical id order.
#[derive(Default)]
pub struct HeaderSet {
    headers: BTreeMap<&'static str, Box<dyn Header>>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the configured headers. The CSRF header is only added when a
    /// token is supplied.
    pub fn from_config(config: &HeadersConfig, csrf_token: Option<&CsrfToken>) -> Self {
        let mut set = Self::new();

        if let Some(hsts) = &config.strict_transport_security {
            set.insert(StrictTransportSecurity::new(hsts.clone()));
        }

        if let (Some(header), Some(token)) = (&config.csrf_token, csrf_token) {
            set.insert(CsrfTokenHeader::new(header, token));
        }

        set
    }

    /// Adds a header, replacing any previous header with the same id.
    pub fn insert(&mut self, header: impl Header + 'static) -> &mut Self {
        self.headers.insert(header.id(), Box::new(header));
        self
    }

    pub fn get(&self, id: &str) -> Option<&dyn Header> {
        self.headers.get(id).map(|h| h.as_ref())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn lines(&self) -> Vec<String> {
        self.headers.values().map(|h| h.line()).collect()
    }

    pub fn directives(&self, request: &RequestInfo) -> Vec<HeaderDirective> {
        self.headers.values().map(|h| h.directive(request)).collect()
    }
}

impl fmt::Display for HeaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            write!(f, "{}\r\n", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csrf::Expiry;

    fn token(value: &str) -> CsrfToken {
        CsrfToken {
            name: "form".to_string(),
            token_name: "csrf-token:form".to_string(),
            value: value.to_string(),
            issued_at: 0,
            expires_at: Expiry::Never,
        }
    }

    #[test]
    fn test_hsts_value() {
        let hsts = StrictTransportSecurity::default();
        assert_eq!(hsts.line(), "Strict-Transport-Security: max-age=1209600");

        let hsts = StrictTransportSecurity::new(HstsConfig {
            max_age: 31_536_000,
            include_subdomains: true,
        });
        assert_eq!(hsts.value(), "max-age=31536000; includeSubDomains");
    }

    #[test]
    fn test_hsts_directive() {
        let hsts = StrictTransportSecurity::default();

        let secure = RequestInfo::new("example.com").with_https("on");
        assert_eq!(
            hsts.directive(&secure),
            HeaderDirective::Emit("Strict-Transport-Security: max-age=1209600".to_string())
        );

        let plain = RequestInfo::new("example.com").with_uri("/login?next=1");
        assert_eq!(
            hsts.directive(&plain),
            HeaderDirective::Redirect {
                location: "https://example.com/login?next=1".to_string(),
                status: 301,
            }
        );
    }

    #[test]
    fn test_location() {
        let location = Location::new("https://example.com/");
        assert_eq!(location.line(), "Location: https://example.com/");
        assert_eq!(location.status_code, 302);
        assert_eq!(
            location.with_status(303).directive(&RequestInfo::default()),
            HeaderDirective::Redirect {
                location: "https://example.com/".to_string(),
                status: 303,
            }
        );
    }

    #[test]
    fn test_header_set_is_alphabetical() {
        let mut set = HeaderSet::new();
        set.insert(StrictTransportSecurity::default());
        set.insert(Location::new("https://example.com/"));
        set.insert(CsrfTokenHeader::new(&CsrfHeaderConfig::default(), &token("abc")));

        assert_eq!(
            set.lines(),
            vec![
                "X-CSRF-Token: abc".to_string(),
                "Location: https://example.com/".to_string(),
                "Strict-Transport-Security: max-age=1209600".to_string(),
            ]
        );
        assert_eq!(
            set.to_string(),
            "X-CSRF-Token: abc\r\nLocation: https://example.com/\r\nStrict-Transport-Security: max-age=1209600\r\n"
        );
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let mut set = HeaderSet::new();
        set.insert(StrictTransportSecurity::default());
        set.insert(StrictTransportSecurity::new(HstsConfig {
            max_age: 60,
            include_subdomains: false,
        }));

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("strict_transport_security").unwrap().value(), "max-age=60");
    }

    #[test]
    fn test_from_config() {
        let config = HeadersConfig {
            strict_transport_security: Some(HstsConfig::default()),
            csrf_token: Some(CsrfHeaderConfig::default()),
        };

        assert_eq!(HeaderSet::from_config(&config, None).len(), 1);
        assert_eq!(HeaderSet::from_config(&config, Some(&token("t"))).len(), 2);
        assert!(HeaderSet::from_config(&HeadersConfig::default(), None).is_empty());
    }
}
