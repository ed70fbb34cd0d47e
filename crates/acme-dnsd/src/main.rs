// # acme-dnsd - DNS-01 hook
//
// This binary is a THIN integration layer: all challenge logic lives in
// acme-dns-core, all provider logic in the provider crates.
//
// acme-dnsd is responsible for:
// 1. Parsing the hook command line
// 2. Reading configuration from environment variables (or a JSON file)
// 3. Registering providers
// 4. Running one respond / cleanup batch and mapping the outcome to an exit code
//
// ## Configuration
//
// ### Responder
// - `ACME_DNS_ZONES`: Comma-separated zone names, in match priority order
// - `ACME_DNS_TTL`: TTL of the challenge records (default 120)
// - `ACME_DNS_PROPAGATION_TIMEOUT_SECS`: Upper bound for the propagation wait (default 300)
// - `ACME_DNS_POLL_INTERVAL_MS`: Delay between two lookups (default 200)
// - `ACME_DNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ### Cloudflare
// - `CLOUDFLARE_KEY`: Global API key, or a scoped API token when no email is set
// - `CLOUDFLARE_EMAIL`: Account email for the global API key
// - `CLOUDFLARE_API_BASE`: API base URL override
//
// With `--config <file.json>` the responder settings come from the file
// instead; the Cloudflare credentials still fall back to the environment.
//
// ## Example
//
// ```bash
// export ACME_DNS_ZONES=example.com,example.org
// export CLOUDFLARE_KEY=your_key
// export CLOUDFLARE_EMAIL=ops@example.com
//
// acme-dnsd respond a.example.com=tok1 www.example.org=tok2
// acme-dnsd cleanup a.example.com www.example.org
// ```

mod cli;

use acme_dns_core::traits::DNS01;
use acme_dns_core::{
    ChallengeResponder, DnsChallengeResponder, DomainChallenge, PropagationConfig,
    ProviderConfig, ProviderRegistry, ResponderConfig,
};
use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use std::env;
use std::path::Path;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the hook
///
/// - 0: Success
/// - 1: Configuration error (bad environment, unknown zone, missing credentials)
/// - 2: Runtime error (provider failure, propagation timeout, cancellation)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HookExitCode {
    /// Batch handled
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<HookExitCode> for ExitCode {
    fn from(code: HookExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Work requested on the command line
enum Hook {
    Respond(Vec<DomainChallenge>),
    Cleanup(Vec<DomainChallenge>),
}

/// Application configuration read from the environment
#[derive(Debug)]
struct Config {
    zones: Vec<String>,
    ttl: Option<u32>,
    propagation_timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    api_base: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            zones: lookup("ACME_DNS_ZONES")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            ttl: parse_var(&lookup, "ACME_DNS_TTL")?,
            propagation_timeout_secs: parse_var(&lookup, "ACME_DNS_PROPAGATION_TIMEOUT_SECS")?,
            poll_interval_ms: parse_var(&lookup, "ACME_DNS_POLL_INTERVAL_MS")?,
            api_base: lookup("CLOUDFLARE_API_BASE").filter(|s| !s.is_empty()),
            log_level: lookup("ACME_DNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the settings that the responder does not check itself
    fn validate(&self) -> Result<()> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ACME_DNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the responder configuration
    ///
    /// A JSON file replaces the environment settings entirely.
    fn responder_config(&self, file: Option<&Path>) -> Result<ResponderConfig> {
        if let Some(path) = file {
            return ResponderConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()));
        }

        if self.zones.is_empty() {
            anyhow::bail!(
                "ACME_DNS_ZONES must contain at least one zone. \
                Set it via: export ACME_DNS_ZONES=example.com"
            );
        }

        let defaults = PropagationConfig::default();
        let mut config = ResponderConfig::new(self.zones.iter().cloned())
            .with_provider(ProviderConfig::Cloudflare {
                key: None,
                email: None,
                api_base: self.api_base.clone(),
            })
            .with_propagation(PropagationConfig {
                poll_interval_ms: self.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
                timeout_secs: self.propagation_timeout_secs.unwrap_or(defaults.timeout_secs),
            });

        if let Some(ttl) = self.ttl {
            config = config.with_ttl(ttl);
        }

        Ok(config)
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Parse an optional numeric variable
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(name)
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse()
                .with_context(|| format!("{} must be a number. Got: {}", name, s))
        })
        .transpose()
}

fn main() -> ExitCode {
    let Cli { config: config_file, command } = Cli::parse();

    let hook = match command {
        Command::Supports { challenge_type } => {
            return if challenge_type == DNS01 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
        Command::Respond(args) => args.into_challenges().map(Hook::Respond),
        Command::Cleanup(args) => args.into_challenges().map(Hook::Cleanup),
    };

    let hook = match hook {
        Ok(hook) => hook,
        Err(e) => {
            eprintln!("Invalid challenge argument: {}", e);
            return HookExitCode::ConfigError.into();
        }
    };

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return HookExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return HookExitCode::ConfigError.into();
    }

    let responder_config = match config
        .responder_config(config_file.as_deref())
        .and_then(|c| c.validate().map(|_| c).map_err(Into::into))
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return HookExitCode::ConfigError.into();
        }
    };

    // Logs go to stderr; stdout belongs to the calling hook
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return HookExitCode::ConfigError.into();
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return HookExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_hook(responder_config, hook)).into()
}

/// Build the responder and run one batch
async fn run_hook(config: ResponderConfig, hook: Hook) -> HookExitCode {
    // Create provider registry
    let registry = ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    {
        debug!("Registering Cloudflare provider");
        acme_dns_cloudflare::register(&registry);
    }

    let built = DnsChallengeResponder::from_registry(&registry, config).await;
    let (responder, mut events) = match built {
        Ok(built) => built,
        Err(e) if e.is_config() => {
            error!("Configuration error: {}", e);
            return HookExitCode::ConfigError;
        }
        Err(e) => {
            error!("Failed to initialize responder: {}", e);
            return HookExitCode::RuntimeError;
        }
    };

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(?event, "responder event");
        }
    });

    let result = match hook {
        Hook::Respond(batch) => {
            info!("Responding to {} challenge(s)", batch.len());

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling propagation wait");
                    trigger.cancel();
                }
            });

            responder.respond_all_with_cancel(&batch, &cancel).await
        }
        Hook::Cleanup(batch) => {
            info!("Cleaning up {} challenge(s)", batch.len());
            responder.cleanup_all(&batch).await
        }
    };

    match result {
        Ok(()) => {
            info!("Done");
            HookExitCode::Success
        }
        Err(e) if e.is_config() => {
            error!("{}", e);
            HookExitCode::ConfigError
        }
        Err(e) => {
            error!("{}", e);
            HookExitCode::RuntimeError
        }
    }
}
