pub mod config;
pub mod csrf;
pub mod error;
pub mod http;
pub mod observability;
pub mod random;
pub mod security;
pub mod storage;

pub use config::ToolkitConfig;
pub use csrf::{CsrfToken, TokenProvider};
pub use error::{Result, SecurityError};
pub use random::{EntropySource, ValueGenerator};
pub use storage::{MemorySessionStore, SessionStore};
