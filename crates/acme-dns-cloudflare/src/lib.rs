// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare implementation of the DNS-01 responder's
// `DnsProvider` trait.
//
// ## Behaviour
//
// - One HTTP request per trait call; the single retry on a duplicate record
//   is owned by `DnsChallengeResponder`
// - HTTP timeout configured (30 seconds)
// - Specific handling for 401/403 (authentication) and 429 (rate limit)
// - Cloudflare error envelopes turned into typed `CreateOutcome` values:
//   codes 81057 / 81058 ("record already exists") become `Conflict`
// - Deleting a record that no longer exists is not an error
//
// ## Authentication
//
// - Global API key + account email: `X-Auth-Key` / `X-Auth-Email`
// - API token (key without email): `Authorization: Bearer <token>`
//
// Key and email fall back to `CLOUDFLARE_KEY` / `CLOUDFLARE_EMAIL` when the
// configuration does not set them. The key never appears in logs or `Debug`
// output.
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use acme_dns_core::config::ProviderConfig;
use acme_dns_core::traits::{
    ApiErrors, CreateOutcome, DnsProvider, DnsProviderFactory, DnsRecord, NewRecord, Zone,
};
use acme_dns_core::{Error, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Error codes Cloudflare uses for "a record with this name already exists"
pub const DUPLICATE_RECORD_CODES: [u32; 2] = [81057, 81058];

/// Error code for "record does not exist"
const RECORD_NOT_FOUND_CODE: u32 = 81044;

/// Environment fallback for the API key
pub const KEY_ENV: &str = "CLOUDFLARE_KEY";

/// Environment fallback for the account email
pub const EMAIL_ENV: &str = "CLOUDFLARE_EMAIL";

const PROVIDER: &str = "cloudflare";

/// How requests are authenticated
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Global API key plus account email
    GlobalKey { key: String, email: String },
    /// Scoped API token
    Token(String),
}

impl Credentials {
    /// Resolve credentials from configured values with an environment fallback
    ///
    /// A key without any email is treated as an API token. No key at all is a
    /// configuration error.
    pub fn resolve(
        key: Option<&str>,
        email: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let key = key
            .map(str::to_string)
            .or_else(|| env(KEY_ENV))
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "Cloudflare key is required (set it in the config or via {})",
                    KEY_ENV
                ))
            })?;

        let email = email
            .map(str::to_string)
            .or_else(|| env(EMAIL_ENV))
            .filter(|e| !e.is_empty());

        Ok(match email {
            Some(email) => Credentials::GlobalKey { key, email },
            None => Credentials::Token(key),
        })
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::GlobalKey { key, email } => request
                .header("X-Auth-Key", key)
                .header("X-Auth-Email", email),
            Credentials::Token(token) => request.bearer_auth(token),
        }
    }
}

// Custom Debug implementation that hides the key
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::GlobalKey { email, .. } => f
                .debug_struct("GlobalKey")
                .field("key", &"<REDACTED>")
                .field("email", email)
                .finish(),
            Credentials::Token(_) => f.debug_tuple("Token").field(&"<REDACTED>").finish(),
        }
    }
}

/// Cloudflare v4 response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: ApiErrors,
    result: Option<T>,
}

/// Cloudflare DNS provider
///
/// Stateless apart from the HTTP client: zones are cached by the responder,
/// not here.
pub struct CloudflareProvider {
    /// Request credentials
    /// ⚠️ NEVER log these
    credentials: Credentials,

    /// API base URL without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a provider talking to the public Cloudflare API
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_api_base(credentials, CLOUDFLARE_API_BASE)
    }

    /// Create a provider talking to a custom API base (tests, proxies)
    pub fn with_api_base(credentials: Credentials, api_base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        let api_base = api_base.into().trim_end_matches('/').to_string();

        Ok(Self {
            credentials,
            api_base,
            client,
        })
    }

    /// API base URL in use
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.api_base, path);
        self.credentials.apply(self.client.request(method, url))
    }

    async fn execute(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| Error::http(format!("{}: request failed: {}", context, e)))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<(StatusCode, Envelope<T>)> {
        let response = self.execute(request, context).await?;
        read_envelope(response, context).await
    }
}

/// Map a Cloudflare response to its envelope, short-circuiting auth and rate limits
async fn read_envelope<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<(StatusCode, Envelope<T>)> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::http(format!("{}: failed to read response: {}", context, e)))?;

    match status.as_u16() {
        401 | 403 => {
            return Err(Error::auth(format!(
                "{}: invalid Cloudflare credentials or insufficient permissions. Status: {}{}",
                context,
                status,
                error_suffix(&body)
            )));
        }
        429 => {
            return Err(Error::rate_limited(format!(
                "{}: Cloudflare rate limit exceeded. Status: {}",
                context, status
            )));
        }
        _ => {}
    }

    let envelope = serde_json::from_str::<Envelope<T>>(&body).map_err(|e| {
        Error::provider(
            PROVIDER,
            format!("{}: unexpected response (status {}): {}", context, status, e),
        )
    })?;

    Ok((status, envelope))
}

/// Best-effort extraction of envelope errors from an error body
fn error_suffix(body: &str) -> String {
    match serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        Ok(envelope) if !envelope.errors.is_empty() => format!(" ({})", envelope.errors),
        _ => String::new(),
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Look up a zone by exact name
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// ```
    async fn find_zone(&self, name: &str) -> Result<Option<Zone>> {
        tracing::debug!("Looking up Cloudflare zone: {}", name);

        let request = self.request(Method::GET, "/zones").query(&[("name", name)]);
        let (_, envelope) = self.send::<Vec<Zone>>(request, "zone lookup").await?;

        if !envelope.success {
            return Err(Error::provider(PROVIDER, envelope.errors.to_string()));
        }

        let zone = envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(name));

        if let Some(ref zone) = zone {
            tracing::debug!("Found zone ID: {}", zone.id);
        }
        Ok(zone)
    }

    /// Create a record
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// {"type": "TXT", "name": "...", "content": "...", "ttl": 120}
    /// ```
    async fn create_record(&self, zone: &Zone, record: &NewRecord) -> Result<CreateOutcome> {
        tracing::debug!(
            "Creating {} record {} in zone {}",
            record.record_type,
            record.name,
            zone.name
        );

        let request = self
            .request(Method::POST, &format!("/zones/{}/dns_records", zone.id))
            .json(record);
        let (status, envelope) = self.send::<DnsRecord>(request, "record creation").await?;

        if envelope.success {
            return envelope.result.map(CreateOutcome::Created).ok_or_else(|| {
                Error::provider(PROVIDER, "Invalid response format: missing created record")
            });
        }

        if envelope.errors.has_code(&DUPLICATE_RECORD_CODES) {
            tracing::debug!("Record {} already exists (status {})", record.name, status);
            Ok(CreateOutcome::Conflict(envelope.errors))
        } else {
            tracing::warn!("Cloudflare rejected record {} (status {})", record.name, status);
            Ok(CreateOutcome::Rejected(envelope.errors))
        }
    }

    /// Find a record by name
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=_acme-challenge.example.com
    /// ```
    async fn find_record(&self, zone: &Zone, name: &str) -> Result<Option<DnsRecord>> {
        let request = self
            .request(Method::GET, &format!("/zones/{}/dns_records", zone.id))
            .query(&[("name", name)]);
        let (_, envelope) = self.send::<Vec<DnsRecord>>(request, "record lookup").await?;

        if !envelope.success {
            return Err(Error::provider(PROVIDER, envelope.errors.to_string()));
        }

        Ok(envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(name)))
    }

    /// Delete a record
    ///
    /// ```http
    /// DELETE /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn delete_record(&self, zone: &Zone, record_id: &str) -> Result<()> {
        tracing::debug!("Deleting record {} in zone {}", record_id, zone.name);

        let request = self.request(
            Method::DELETE,
            &format!("/zones/{}/dns_records/{}", zone.id, record_id),
        );
        let response = self.execute(request, "record deletion").await?;

        // The body of a 404 is not always an API envelope.
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Record {} already deleted", record_id);
            return Ok(());
        }

        let (_, envelope) = read_envelope::<serde_json::Value>(response, "record deletion").await?;

        if envelope.success {
            return Ok(());
        }

        if envelope.errors.has_code(&[RECORD_NOT_FOUND_CODE]) {
            tracing::debug!("Record {} already deleted", record_id);
            return Ok(());
        }

        Err(Error::provider(PROVIDER, envelope.errors.to_string()))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare {
                key,
                email,
                api_base,
            } => {
                let credentials = Credentials::resolve(key.as_deref(), email.as_deref(), |var| {
                    std::env::var(var).ok()
                })?;

                if matches!(credentials, Credentials::Token(_)) {
                    tracing::info!("No Cloudflare email configured, using the key as an API token");
                }

                let base = api_base.as_deref().unwrap_or(CLOUDFLARE_API_BASE);
                Ok(Box::new(CloudflareProvider::with_api_base(credentials, base)?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use acme_dns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// acme_dns_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &acme_dns_core::ProviderRegistry) {
    registry.register_provider(PROVIDER, Box::new(CloudflareFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_resolve_prefers_config() {
        let env = |var: &str| match var {
            KEY_ENV => Some("env-key".to_string()),
            EMAIL_ENV => Some("env@example.com".to_string()),
            _ => None,
        };

        let creds = Credentials::resolve(Some("cfg-key"), Some("cfg@example.com"), env).unwrap();
        assert_eq!(
            creds,
            Credentials::GlobalKey {
                key: "cfg-key".to_string(),
                email: "cfg@example.com".to_string()
            }
        );

        let creds = Credentials::resolve(None, None, env).unwrap();
        assert_eq!(
            creds,
            Credentials::GlobalKey {
                key: "env-key".to_string(),
                email: "env@example.com".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_key_without_email_is_token() {
        let creds = Credentials::resolve(Some("tok"), None, no_env).unwrap();
        assert_eq!(creds, Credentials::Token("tok".to_string()));
    }

    #[test]
    fn test_resolve_missing_key() {
        let err = Credentials::resolve(None, Some("ops@example.com"), no_env).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains(KEY_ENV));

        assert!(Credentials::resolve(Some(""), None, no_env).is_err());
    }

    #[test]
    fn test_factory_rejects_foreign_config() {
        let config = ProviderConfig::Custom {
            factory: "other".to_string(),
            config: serde_json::json!({}),
        };

        assert!(CloudflareFactory.create(&config).is_err());
    }

    #[test]
    fn test_factory_with_explicit_key() {
        let config = ProviderConfig::Cloudflare {
            key: Some("test_key".to_string()),
            email: Some("ops@example.com".to_string()),
            api_base: Some("http://127.0.0.1:9/".to_string()),
        };

        let provider = CloudflareFactory.create(&config).unwrap();
        assert_eq!(provider.provider_name(), "cloudflare");
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let provider =
            CloudflareProvider::with_api_base(Credentials::Token("t".to_string()), "http://x/v4/")
                .unwrap();
        assert_eq!(provider.api_base(), "http://x/v4");
    }

    #[test]
    fn test_key_not_exposed_in_debug() {
        let provider = CloudflareProvider::new(Credentials::GlobalKey {
            key: "secret_key_12345".to_string(),
            email: "ops@example.com".to_string(),
        })
        .unwrap();

        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("CloudflareProvider"));
        assert!(debug_str.contains("ops@example.com"));

        let token = format!("{:?}", Credentials::Token("secret_token".to_string()));
        assert!(!token.contains("secret_token"));
    }

    #[test]
    fn test_error_suffix() {
        let body = serde_json::json!({
            "success": false,
            "errors": [{"code": 10000, "message": "Authentication error"}],
            "result": null
        })
        .to_string();
        assert_eq!(error_suffix(&body), " (10000: Authentication error)");
        assert_eq!(error_suffix("<html>"), "");
    }
}
