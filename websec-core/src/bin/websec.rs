use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use websec_core::config::ToolkitConfig;
use websec_core::csrf::TokenProvider;
use websec_core::http::{HeaderSet, Redirector, RequestInfo, Sanitizer};
use websec_core::observability::{setup_logging, SecurityMetrics};
use websec_core::random::{EntropySource, ValueGenerator};
use websec_core::storage::FileSessionStore;

#[derive(Parser)]
#[command(name = "websec", version, about = "Secure random values, CSRF tokens and security headers")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Allow best-effort randomness when no audited source is available
    #[arg(long, global = true)]
    weak: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Raw random bytes
    Bytes {
        #[arg(short, long, default_value_t = 32)]
        length: usize,
        #[arg(long, value_enum, default_value_t = Encoding::Base64)]
        encoding: Encoding,
    },
    /// Random boolean
    Bool,
    /// Uniform integer in [min, max]
    Int {
        #[arg(long, allow_hyphen_values = true)]
        min: i64,
        #[arg(long, allow_hyphen_values = true)]
        max: i64,
    },
    /// Float in [0, 1)
    Float,
    /// Random string; an empty alphabet gives URL-safe base64
    #[command(name = "string")]
    Text {
        #[arg(short, long)]
        length: usize,
        #[arg(short, long, default_value = "")]
        alphabet: String,
        /// Draw every character uniformly from the alphabet
        #[arg(long)]
        uniform: bool,
    },
    /// Issue a CSRF token into a session file
    Token {
        #[arg(long)]
        session: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        refresh: bool,
    },
    /// Check a submitted CSRF token against a session file
    Verify {
        #[arg(long)]
        session: PathBuf,
        #[arg(long)]
        token: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Render the configured security headers
    Headers {
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(long)]
        https: bool,
        /// Session file holding the CSRF token; one is issued if none is stored
        #[arg(long)]
        session: Option<PathBuf>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Strip HTML down to the configured allowed tags
    Sanitize {
        html: String,
        /// Allowed-tag filter such as `p,b,a[href]`; overrides the configuration
        #[arg(long)]
        allowed: Option<String>,
    },
    /// Validate a redirect target
    Redirect {
        target: String,
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(long)]
        https: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Encoding {
    Base64,
    Hex,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ToolkitConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ToolkitConfig::default(),
    };
    setup_logging(config.logging.format, &config.logging.filter);

    let metrics = SecurityMetrics::new();
    let generator = Arc::new(ValueGenerator::new(
        EntropySource::system().with_metrics(metrics.clone()),
    ));
    let strong = !cli.weak;

    let output = match cli.command {
        Command::Bytes { length, encoding } => {
            let bytes = generator.bytes(length, strong)?;
            let encoded = match encoding {
                Encoding::Base64 => URL_SAFE_NO_PAD.encode(&bytes),
                Encoding::Hex => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
            };
            json!(encoded)
        }
        Command::Bool => json!(generator.boolean(strong)?),
        Command::Int { min, max } => json!(generator.integer(min, max, strong)?),
        Command::Float => json!(generator.float(strong)?),
        Command::Text { length, alphabet, uniform } => {
            if uniform {
                json!(generator.uniform_string(length, &alphabet, strong)?)
            } else {
                json!(generator.string(length, &alphabet, strong)?)
            }
        }
        Command::Token { session, name, refresh } => {
            let mut provider = token_provider(&config, session, name, generator.clone())?;
            let token = provider.issue_token(refresh)?;
            json!({
                "name": token.name,
                "token_name": token.token_name,
                "value": token.value,
                "issued_at": token.issued_at,
                "expires_at": token.expires_at.as_timestamp(),
            })
        }
        Command::Verify { session, token, name } => {
            let provider = token_provider(&config, session, name, generator.clone())?;
            let valid = provider.validate(&token);
            if !cli.json {
                println!("{}", if valid { "valid" } else { "invalid" });
                if !valid {
                    std::process::exit(1);
                }
                return Ok(());
            }
            json!({ "name": provider.token_name(), "valid": valid })
        }
        Command::Headers { host, https, session, name } => {
            let request = request_info(host, https);
            let token = match session {
                Some(session) => {
                    let mut provider = token_provider(&config, session, name, generator.clone())?;
                    match provider.stored_token() {
                        Some(token) => Some(token),
                        None => Some(provider.issue_token(false)?),
                    }
                }
                None => None,
            };
            let headers = HeaderSet::from_config(&config.headers, token.as_ref());
            if headers.is_empty() {
                bail!("no headers configured");
            }
            let directives: Vec<String> = headers
                .directives(&request)
                .into_iter()
                .map(|d| format!("{:?}", d))
                .collect();
            json!({ "lines": headers.lines(), "directives": directives })
        }
        Command::Sanitize { html, allowed } => {
            let mut sanitizer_config = config.sanitizer.clone();
            if let Some(allowed) = allowed {
                sanitizer_config.allowed = allowed;
            }
            json!(Sanitizer::new(&sanitizer_config)?.sanitize(&html))
        }
        Command::Redirect { target, host, https } => {
            let request = request_info(host, https);
            let location = Redirector::from_config(&config.redirect).redirect_for(
                &target,
                &request,
                config.redirect.stay_local,
                config.redirect.preserve_https,
            )?;
            json!({ "location": location.url, "status": location.status_code })
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match output {
            serde_json::Value::String(s) => println!("{}", s),
            other => println!("{}", other),
        }
    }

    if metrics.best_effort_draws() > 0 {
        tracing::warn!(draws = metrics.best_effort_draws(), "output used best-effort randomness");
    }

    Ok(())
}

fn token_provider(
    config: &ToolkitConfig,
    session: PathBuf,
    name: Option<String>,
    generator: Arc<ValueGenerator>,
) -> Result<TokenProvider> {
    let mut csrf = config.csrf.clone();
    if let Some(name) = name {
        csrf.name = name;
    }

    let store = Arc::new(FileSessionStore::open(session)?);
    Ok(TokenProvider::new(csrf, store)?.with_generator(generator))
}

fn request_info(host: String, https: bool) -> RequestInfo {
    let request = RequestInfo::new(host);
    if https {
        request.with_https("on")
    } else {
        request
    }
}
