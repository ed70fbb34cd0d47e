//! Command-line interface for acme-dnsd.

use acme_dns_core::DomainChallenge;
use acme_dns_core::traits::{ACME_CHALLENGE_LABEL, Dns01Challenge};
use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Answer ACME DNS-01 challenges by publishing TXT records through a DNS provider"
)]
pub struct Cli {
    /// JSON responder configuration. Replaces the ACME_DNS_* environment settings.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available hook commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish challenge records and wait until they are visible.
    Respond(RespondArgs),

    /// Remove challenge records.
    Cleanup(CleanupArgs),

    /// Exit 0 if the challenge type is supported, 1 otherwise.
    Supports {
        /// Challenge type, e.g. dns-01.
        challenge_type: String,
    },
}

/// Arguments for the respond command.
#[derive(Args, Debug)]
pub struct RespondArgs {
    /// Challenges as <domain>=<content>.
    #[arg(required = true, value_name = "DOMAIN=CONTENT")]
    pub challenges: Vec<String>,

    /// Label prepended to each domain.
    #[arg(long, default_value = ACME_CHALLENGE_LABEL)]
    pub record_name: String,

    /// Treat each content as a key authorization and publish its digest.
    #[arg(long)]
    pub key_authorization: bool,
}

impl RespondArgs {
    /// Build the challenge batch
    pub fn into_challenges(self) -> Result<Vec<DomainChallenge>> {
        self.challenges
            .iter()
            .map(|arg| {
                let (domain, content) = parse_challenge(arg, true)?;
                let challenge = if self.key_authorization {
                    Dns01Challenge::from_key_authorization(&content)
                        .with_record_name(&self.record_name)
                } else {
                    Dns01Challenge::new(&self.record_name, content)
                };
                Ok(DomainChallenge::new(domain, challenge))
            })
            .collect()
    }
}

/// Arguments for the cleanup command.
#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Challenges as <domain>[=<content>].
    #[arg(required = true, value_name = "DOMAIN[=CONTENT]")]
    pub challenges: Vec<String>,

    /// Label prepended to each domain.
    #[arg(long, default_value = ACME_CHALLENGE_LABEL)]
    pub record_name: String,
}

impl CleanupArgs {
    /// Build the challenge batch
    pub fn into_challenges(self) -> Result<Vec<DomainChallenge>> {
        self.challenges
            .iter()
            .map(|arg| {
                let (domain, content) = parse_challenge(arg, false)?;
                Ok(DomainChallenge::new(
                    domain,
                    Dns01Challenge::new(&self.record_name, content),
                ))
            })
            .collect()
    }
}

/// Split a `<domain>=<content>` argument
///
/// Only the first `=` separates; content may be omitted when not required.
pub fn parse_challenge(arg: &str, require_content: bool) -> Result<(String, String)> {
    let (domain, content) = match arg.split_once('=') {
        Some((domain, content)) => (domain.trim(), content.trim()),
        None if !require_content => (arg.trim(), ""),
        None => bail!("expected <domain>=<content>, got '{}'", arg),
    };

    if domain.is_empty() {
        bail!("missing domain in '{}'", arg);
    }
    if require_content && content.is_empty() {
        bail!("missing content for {}", domain);
    }

    Ok((domain.to_string(), content.to_string()))
}
