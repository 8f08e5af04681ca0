//! HTTP-facing helpers: security headers, request detection, redirects and
//! HTML sanitization.
//!
//! Nothing here writes to a connection; headers come back as lines and
//! directives for the host server to apply.

pub mod headers;
pub mod redirect;
pub mod request;
pub mod sanitizer;

pub use headers::{CsrfTokenHeader, Header, HeaderDirective, HeaderSet, Location, StrictTransportSecurity};
pub use redirect::Redirector;
pub use request::RequestInfo;
pub use sanitizer::{FilterDefinition, Sanitizer};
