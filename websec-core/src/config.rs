//! Typed configuration, loadable from TOML.
//!
//! ```toml
//! [csrf]
//! token_name_prefix = "csrf-token"
//! name = "login-form"
//! timeout = 3600
//!
//! [headers.strict_transport_security]
//! max_age = 31536000
//! include_subdomains = true
//!
//! [redirect]
//! whitelist = ["example.com"]
//! allow_proxy = false
//!
//! [sanitizer]
//! allowed = "p,b,i,a[href]"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::http::sanitizer::FilterDefinition;
use crate::observability::LogFormat;
use crate::security::validation::{
    validate_header_name, validate_input, validate_optional_input, validate_token_prefix,
};

const MAX_NAME_LENGTH: usize = 128;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub csrf: CsrfConfig,
    pub headers: HeadersConfig,
    pub redirect: RedirectConfig,
    pub sanitizer: SanitizerConfig,
    pub logging: LoggingConfig,
}

impl ToolkitConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.csrf.validate()?;
        self.headers.validate()?;
        self.redirect.validate()?;
        self.sanitizer.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    pub token_name_prefix: String,
    pub name: String,
    /// Token lifetime in seconds; 0 means the token never expires
    pub timeout: u64,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_name_prefix: "csrf-token".to_string(),
            name: String::new(),
            timeout: 3600,
        }
    }
}

impl CsrfConfig {
    pub fn new(token_name_prefix: impl Into<String>, name: impl Into<String>, timeout: u64) -> Self {
        Self {
            token_name_prefix: token_name_prefix.into(),
            name: name.into(),
            timeout,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_token_prefix(&self.token_name_prefix, MAX_NAME_LENGTH)?;
        validate_optional_input(&self.name, MAX_NAME_LENGTH)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadersConfig {
    pub strict_transport_security: Option<HstsConfig>,
    pub csrf_token: Option<CsrfHeaderConfig>,
}

impl HeadersConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(csrf) = &self.csrf_token {
            validate_header_name(&csrf.header_name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HstsConfig {
    pub max_age: u64,
    pub include_subdomains: bool,
}

impl Default for HstsConfig {
    fn default() -> Self {
        Self {
            max_age: 1_209_600,
            include_subdomains: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfHeaderConfig {
    pub header_name: String,
}

impl Default for CsrfHeaderConfig {
    fn default() -> Self {
        Self {
            header_name: "X-CSRF-Token".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Hosts redirects may target; empty allows any host
    pub whitelist: Vec<String>,
    /// Trust `X-Forwarded-Host` when detecting the local host
    pub allow_proxy: bool,
    pub stay_local: bool,
    pub preserve_https: bool,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            whitelist: Vec::new(),
            allow_proxy: false,
            stay_local: true,
            preserve_https: true,
        }
    }
}

impl RedirectConfig {
    pub fn validate(&self) -> Result<()> {
        for host in &self.whitelist {
            validate_input(host, 253)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Allowed elements and attributes, e.g. `p,b,a[href]`; empty keeps the
    /// sanitizer's defaults
    pub allowed: String,
}

impl SanitizerConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.allowed.trim().is_empty() {
            FilterDefinition::parse(&self.allowed)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".to_string(),
        }
    }
}
