//! # npm Registry Resolver
//!
//! Three layers over the same lookup:
//!
//! - [`PackageResolver::resolve`]: one validated lookup, no retry
//! - [`resolve_with_retry`]: bounded attempts with a per-attempt timeout and
//!   exponential backoff, reporting a [`PackageInfo`] instead of an error
//! - [`resolve_batch`]: sequential lookups with a pause between them,
//!   splitting the names into resolved ranges and failure reasons
//!
//! Nothing here aborts a pipeline. Failures are values.

use crate::config::RegistryConfig;
use crate::error::{ConfigError, ResolveError};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

/// npm caps package names at this length
const MAX_NAME_LEN: usize = 214;

fn package_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:@[a-z0-9~][a-z0-9._~-]*/)?[a-z0-9~][a-z0-9._~-]*$")
            .expect("valid package name regex")
    })
}

/// Check `name` against the npm naming grammar.
pub fn validate_package_name(name: &str) -> Result<(), ResolveError> {
    if name.len() > MAX_NAME_LEN || !package_name_re().is_match(name) {
        return Err(ResolveError::InvalidPackageName(name.to_string()));
    }
    Ok(())
}

/// The latest published version of a package and its descriptive metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPackage {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub repository: Option<String>,
    pub license: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub dist_tags: BTreeMap<String, String>,
}

impl ResolvedPackage {
    /// Caret range for a manifest entry
    pub fn caret_range(&self) -> String {
        format!("^{}", self.version)
    }
}

/// Looks up packages in a registry.
///
/// Implementations validate the name first and never retry.
#[async_trait]
pub trait PackageResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<ResolvedPackage, ResolveError>;
}

/// Registry document, only the fields we read
#[derive(Debug, Deserialize)]
struct RegistryDocument {
    name: Option<String>,
    #[serde(rename = "dist-tags", default)]
    dist_tags: BTreeMap<String, String>,
    description: Option<String>,
    homepage: Option<String>,
    repository: Option<Value>,
    license: Option<Value>,
    author: Option<Value>,
}

impl RegistryDocument {
    fn into_package(self, requested: &str) -> Result<ResolvedPackage, ResolveError> {
        let version = self
            .dist_tags
            .get("latest")
            .cloned()
            .ok_or_else(|| ResolveError::NoVersion(requested.to_string()))?;

        Ok(ResolvedPackage {
            name: self.name.unwrap_or_else(|| requested.to_string()),
            version,
            description: self.description,
            homepage: self.homepage,
            repository: self.repository.as_ref().and_then(|v| string_or_field(v, "url")),
            license: self.license.as_ref().and_then(|v| string_or_field(v, "type")),
            author: self.author.as_ref().and_then(|v| string_or_field(v, "name")),
            dist_tags: self.dist_tags,
        })
    }
}

/// Registry metadata fields come as either `"text"` or `{ key: "text" }`.
fn string_or_field(value: &Value, key: &str) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get(key).and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// HTTP client for an npm-compatible registry
#[derive(Clone)]
pub struct NpmRegistry {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl NpmRegistry {
    /// Every request carries the per-attempt timeout from `config`.
    pub fn new(config: &RegistryConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.attempt_timeout())
            .build()
            .map_err(|e| ConfigError::Invalid(format!("registry HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.effective_base_url().to_string(),
            user_agent: config.user_agent.clone(),
        })
    }

    /// Document URL; scoped names keep their `@` and escape the slash.
    fn document_url(&self, name: &str) -> String {
        let encoded = urlencoding::encode(name).replace("%40", "@");
        format!("{}/{}", self.base_url, encoded)
    }
}

#[async_trait]
impl PackageResolver for NpmRegistry {
    async fn resolve(&self, name: &str) -> Result<ResolvedPackage, ResolveError> {
        validate_package_name(name)?;

        let response = self
            .http
            .get(self.document_url(name))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ResolveError::Registry(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ResolveError::PackageNotFound {
                name: name.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(ResolveError::Registry(format!("HTTP {} for {}", status, name)));
        }

        let doc: RegistryDocument = response
            .json()
            .await
            .map_err(|e| ResolveError::Registry(format!("malformed document for {}: {}", name, e)))?;
        doc.into_package(name)
    }
}

/// Outcome class of a retried lookup
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    Found,
    #[serde(rename = "notfound")]
    NotFound,
    Error,
}

pub const NOT_FOUND_VERSION: &str = "NOT_FOUND";
pub const NO_VERSION: &str = "NO_VERSION";
pub const ERROR_VERSION: &str = "ERROR";

/// Per-package result of the existence check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    /// Latest version, or one of the `NOT_FOUND` / `NO_VERSION` / `ERROR` sentinels
    pub version: String,
    pub status: PackageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PackageInfo {
    fn failed(name: &str, status: PackageStatus, version: &str, error: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            status,
            description: None,
            error: Some(error.into()),
        }
    }
}

/// Attempts, timeouts and backoff for [`resolve_with_retry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RegistryConfig::default())
    }
}

impl From<&RegistryConfig> for RetryPolicy {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            attempt_timeout: config.attempt_timeout(),
            base_delay: config.retry_base_delay(),
        }
    }
}

impl RetryPolicy {
    /// Delay after the zero-based `attempt` failed: base * 2^attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Resolve `name`, retrying transient failures.
///
/// Not-found and invalid names are final on the first answer. Timeouts and
/// other registry errors are retried until `policy.max_attempts` is spent.
/// Progress lines are appended to `logs`.
pub async fn resolve_with_retry(
    resolver: &dyn PackageResolver,
    name: &str,
    policy: RetryPolicy,
    logs: &mut Vec<String>,
) -> PackageInfo {
    for attempt in 0..policy.max_attempts {
        tracing::debug!(package = %name, attempt = attempt + 1, "Registry lookup");
        logs.push(format!(
            "Checking {} (attempt {}/{})",
            name,
            attempt + 1,
            policy.max_attempts
        ));

        let failure = match tokio::time::timeout(policy.attempt_timeout, resolver.resolve(name)).await {
            Ok(Ok(pkg)) => {
                logs.push(format!("✓ {}@{}", pkg.name, pkg.version));
                return PackageInfo {
                    name: name.to_string(),
                    version: pkg.version,
                    status: PackageStatus::Found,
                    description: pkg.description,
                    error: None,
                };
            }
            Ok(Err(err @ ResolveError::PackageNotFound { .. })) => {
                logs.push(format!("✗ {} not found", name));
                return PackageInfo::failed(name, PackageStatus::NotFound, NOT_FOUND_VERSION, err.to_string());
            }
            Ok(Err(err @ ResolveError::InvalidPackageName(_))) => {
                logs.push(format!("✗ {} is not a valid package name", name));
                return PackageInfo::failed(name, PackageStatus::Error, ERROR_VERSION, err.to_string());
            }
            Ok(Err(err @ ResolveError::NoVersion(_))) => {
                logs.push(format!("✗ {} has no published version", name));
                return PackageInfo::failed(name, PackageStatus::Error, NO_VERSION, err.to_string());
            }
            Ok(Err(err @ ResolveError::Registry(_))) => err.to_string(),
            Err(_) => format!(
                "timed out after {}ms",
                policy.attempt_timeout.as_millis()
            ),
        };

        tracing::warn!(package = %name, attempt = attempt + 1, error = %failure, "Registry attempt failed");
        logs.push(format!("Attempt {} for {} failed: {}", attempt + 1, name, failure));

        if attempt + 1 < policy.max_attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    logs.push(format!(
        "✗ {} unreachable after {} attempts",
        name, policy.max_attempts
    ));
    PackageInfo::failed(
        name,
        PackageStatus::Error,
        ERROR_VERSION,
        format!("failed after {} attempts", policy.max_attempts),
    )
}

/// Resolved ranges and failure reasons of a batch
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchResolution {
    /// name -> `^version`
    pub resolved: BTreeMap<String, String>,
    /// name -> error text
    pub failed: BTreeMap<String, String>,
}

impl BatchResolution {
    /// Record one lookup result and return the log line describing it.
    pub fn record(&mut self, name: &str, result: Result<ResolvedPackage, ResolveError>) -> String {
        match result {
            Ok(pkg) => {
                let line = format!("✓ {} -> {}", name, pkg.caret_range());
                self.resolved.insert(name.to_string(), pkg.caret_range());
                line
            }
            Err(err) => {
                let line = format!("✗ {} ({})", name, err.reason());
                self.failed.insert(name.to_string(), err.to_string());
                line
            }
        }
    }
}

/// Resolve `names` one after another, pausing between lookups.
///
/// There is no pause after the last name. Progress lines go to `logs`.
pub async fn resolve_batch(
    resolver: &dyn PackageResolver,
    names: &[String],
    pause: Duration,
    logs: &mut Vec<String>,
) -> BatchResolution {
    let mut batch = BatchResolution::default();
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(pause).await;
        }
        let result = resolver.resolve(name).await;
        logs.push(batch.record(name, result));
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{package as pkg, ScriptedResolver};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_package_name_grammar() {
        for ok in ["react", "@types/node", "lodash.debounce", "left-pad", "~tilde", "a1"] {
            assert!(validate_package_name(ok).is_ok(), "{ok} should be valid");
        }
        for bad in ["UPPER CASE", "React", "-leading", ".dot", "@scope/", "a b", "", "@/x"] {
            assert_eq!(
                validate_package_name(bad),
                Err(ResolveError::InvalidPackageName(bad.to_string())),
                "{bad} should be invalid"
            );
        }
        assert!(validate_package_name(&"a".repeat(215)).is_err());
    }

    #[test]
    fn test_metadata_accepts_string_and_object_forms() {
        let doc: RegistryDocument = serde_json::from_value(serde_json::json!({
            "name": "zod",
            "dist-tags": {"latest": "3.23.8", "next": "4.0.0-beta"},
            "description": "TypeScript-first schema validation",
            "repository": {"type": "git", "url": "git+https://github.com/colinhacks/zod.git"},
            "license": "MIT",
            "author": {"name": "Colin McDonnell"}
        }))
        .unwrap();
        let pkg = doc.into_package("zod").unwrap();
        assert_eq!(pkg.version, "3.23.8");
        assert_eq!(pkg.caret_range(), "^3.23.8");
        assert_eq!(pkg.repository.as_deref(), Some("git+https://github.com/colinhacks/zod.git"));
        assert_eq!(pkg.license.as_deref(), Some("MIT"));
        assert_eq!(pkg.author.as_deref(), Some("Colin McDonnell"));
        assert_eq!(pkg.dist_tags.len(), 2);
    }

    #[test]
    fn test_document_without_latest_is_no_version() {
        let doc: RegistryDocument =
            serde_json::from_value(serde_json::json!({"name": "ghost"})).unwrap();
        assert_eq!(
            doc.into_package("ghost"),
            Err(ResolveError::NoVersion("ghost".into()))
        );
    }

    #[test]
    fn test_scoped_names_escape_slash() {
        let registry = NpmRegistry::new(&RegistryConfig::default()).unwrap();
        assert_eq!(
            registry.document_url("@types/node"),
            "https://registry.npmjs.org/@types%2Fnode"
        );
    }

    #[tokio::test]
    async fn test_registry_resolves_latest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/zod"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "zod",
                "dist-tags": {"latest": "3.23.8"},
                "description": "schemas"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = NpmRegistry::new(&RegistryConfig::default().with_base_url(server.uri())).unwrap();
        let pkg = registry.resolve("zod").await.unwrap();
        assert_eq!(pkg.name, "zod");
        assert_eq!(pkg.version, "3.23.8");
        assert_eq!(pkg.description.as_deref(), Some("schemas"));
    }

    #[tokio::test]
    async fn test_registry_404_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/left-padd"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let registry = NpmRegistry::new(&RegistryConfig::default().with_base_url(server.uri())).unwrap();
        assert_eq!(
            registry.resolve("left-padd").await,
            Err(ResolveError::PackageNotFound {
                name: "left-padd".into(),
                status: 404
            })
        );
    }

    #[tokio::test]
    async fn test_registry_5xx_and_bad_payload_are_registry_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let registry = NpmRegistry::new(&RegistryConfig::default().with_base_url(server.uri())).unwrap();
        assert!(matches!(registry.resolve("flaky").await, Err(ResolveError::Registry(_))));
        assert!(matches!(registry.resolve("garbled").await, Err(ResolveError::Registry(_))));
    }

    #[tokio::test]
    async fn test_client_enforces_attempt_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"dist-tags": {"latest": "1.0.0"}}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = RegistryConfig {
            attempt_timeout_ms: 100,
            ..RegistryConfig::default().with_base_url(server.uri())
        };
        let registry = NpmRegistry::new(&config).unwrap();

        let start = std::time::Instant::now();
        assert!(matches!(registry.resolve("slow").await, Err(ResolveError::Registry(_))));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_invalid_name_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let registry = NpmRegistry::new(&RegistryConfig::default().with_base_url(server.uri())).unwrap();
        assert_eq!(
            registry.resolve("UPPER CASE").await,
            Err(ResolveError::InvalidPackageName("UPPER CASE".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_three_attempts_with_backoff() {
        let resolver = ScriptedResolver::new();
        let mut logs = Vec::new();

        let info = resolve_with_retry(&resolver, "flaky", RetryPolicy::default(), &mut logs).await;

        assert_eq!(info.status, PackageStatus::Error);
        assert_eq!(info.version, ERROR_VERSION);
        assert_eq!(resolver.call_count(), 3);

        let times = resolver.call_times.lock().unwrap().clone();
        assert_eq!(times[1] - times[0], Duration::from_secs(1));
        assert_eq!(times[2] - times[1], Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_times_out_each_attempt() {
        let mut resolver = ScriptedResolver::new().answer("slow", Ok(pkg("slow", "1.0.0")));
        resolver.hang = Some(Duration::from_secs(60));
        let mut logs = Vec::new();

        let start = tokio::time::Instant::now();
        let info = resolve_with_retry(&resolver, "slow", RetryPolicy::default(), &mut logs).await;

        assert_eq!(info.status, PackageStatus::Error);
        assert_eq!(resolver.call_count(), 3);
        // 3 x 8s timeouts plus 1s + 2s backoff
        assert_eq!(start.elapsed(), Duration::from_secs(27));
        assert!(logs.iter().any(|l| l.contains("timed out")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_stops_on_final_answers() {
        let resolver = ScriptedResolver::new()
            .answer("zod", Ok(pkg("zod", "3.23.8")))
            .answer(
                "left-padd",
                Err(ResolveError::PackageNotFound {
                    name: "left-padd".into(),
                    status: 404,
                }),
            )
            .answer("ghost", Err(ResolveError::NoVersion("ghost".into())));
        let mut logs = Vec::new();

        let found = resolve_with_retry(&resolver, "zod", RetryPolicy::default(), &mut logs).await;
        assert_eq!(found.status, PackageStatus::Found);
        assert_eq!(found.version, "3.23.8");

        let missing = resolve_with_retry(&resolver, "left-padd", RetryPolicy::default(), &mut logs).await;
        assert_eq!(missing.status, PackageStatus::NotFound);
        assert_eq!(missing.version, NOT_FOUND_VERSION);

        let ghost = resolve_with_retry(&resolver, "ghost", RetryPolicy::default(), &mut logs).await;
        assert_eq!(ghost.status, PackageStatus::Error);
        assert_eq!(ghost.version, NO_VERSION);

        assert_eq!(resolver.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_is_sequential_with_pauses() {
        let resolver = ScriptedResolver::new()
            .answer("react", Ok(pkg("react", "18.3.1")))
            .answer("zod", Ok(pkg("zod", "3.23.8")))
            .answer(
                "left-padd",
                Err(ResolveError::PackageNotFound {
                    name: "left-padd".into(),
                    status: 404,
                }),
            );
        let names: Vec<String> = ["react", "left-padd", "zod"].iter().map(|s| s.to_string()).collect();
        let mut logs = Vec::new();

        let start = tokio::time::Instant::now();
        let batch = resolve_batch(&resolver, &names, Duration::from_millis(500), &mut logs).await;

        assert_eq!(start.elapsed(), Duration::from_millis(1000));
        assert_eq!(batch.resolved.get("react").map(String::as_str), Some("^18.3.1"));
        assert_eq!(batch.resolved.get("zod").map(String::as_str), Some("^3.23.8"));
        assert!(batch.failed["left-padd"].contains("PACKAGE_NOT_FOUND"));
        assert_eq!(logs.len(), 3);

        let times = resolver.call_times.lock().unwrap().clone();
        assert_eq!(times[1] - times[0], Duration::from_millis(500));
    }
}
