use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_INIT: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Installs the global subscriber once. `RUST_LOG` overrides `default_filter`.
pub fn setup_logging(format: LogFormat, default_filter: &str) {
    LOG_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        let registry = tracing_subscriber::registry().with(filter);

        // try_init: a host application may already own the global subscriber
        let result = match format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Text => registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };

        if let Err(e) = result {
            tracing::debug!(error = %e, "global subscriber already installed");
        }
    });
}

#[macro_export]
macro_rules! log_security {
    ($level:ident, $($arg:tt)*) => {
        tracing::$level!(
            target: "security",
            $($arg)*
        );
    };
}

#[macro_export]
macro_rules! log_token {
    ($level:ident, $token_name:expr, $($arg:tt)*) => {
        tracing::$level!(
            target: "security",
            token_name = $token_name,
            $($arg)*
        );
    };
}
