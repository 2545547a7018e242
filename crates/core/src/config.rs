use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reader::ReaderConfig;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    profiled_env_opt(profile, key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// Comma-separated list; blanks dropped.
fn profiled_env_list(profile: &str, key: &str) -> Vec<String> {
    profiled_env_opt(profile, key)
        .map(|v| split_list(&v))
        .unwrap_or_default()
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub rules: RulesConfig,
    pub reader: ReaderConfig,
    pub model: ModelConfig,
    pub dictionary: DictionaryConfig,
    pub publisher: PublisherConfig,
    pub queue: QueueConfig,
    pub aws: AwsConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `VALIDUS_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("VALIDUS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            rules: RulesConfig::from_env_profiled(p),
            reader: reader_from_env_profiled(p),
            model: ModelConfig::from_env_profiled(p),
            dictionary: DictionaryConfig::from_env_profiled(p),
            publisher: PublisherConfig::from_env_profiled(p),
            queue: QueueConfig::from_env_profiled(p),
            aws: AwsConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  rules:       dirs={:?}, ignored={:?}", self.rules.dirs, self.rules.ignored_entity_types);
        tracing::info!("  model:       source={:?}, cache_max={}, ttl={}s", self.model.source, self.model.cache_max_entries, self.model.cache_ttl_secs);
        tracing::info!("  dictionary:  url={}", self.dictionary.base_url.as_deref().unwrap_or("(disabled)"));
        tracing::info!("  publisher:   enabled={}, retries={}", self.publisher.enabled, self.publisher.retries);
        tracing::info!("  queue:       url={}, outputs={}", self.queue.queue_url.as_deref().unwrap_or("(none)"), self.queue.output_queue_urls.len());
        tracing::info!("  aws:         region={}", self.aws.region);
    }

    /// Return a redacted view safe for logs and health output (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "rules": {
                "dirs": self.rules.dirs,
                "ignored_entity_types": self.rules.ignored_entity_types,
                "default_event_type": self.rules.default_event_type,
            },
            "model": {
                "source": self.model.source,
                "file": self.model.file,
                "base_url": self.model.base_url,
                "cache_max_entries": self.model.cache_max_entries,
                "cache_ttl_secs": self.model.cache_ttl_secs,
            },
            "dictionary": {
                "base_url": self.dictionary.base_url,
                "configured": self.dictionary.is_configured(),
                "authenticated": self.dictionary.username.is_some(),
            },
            "publisher": {
                "enabled": self.publisher.enabled,
                "retries": self.publisher.retries,
                "retry_delay_ms": self.publisher.retry_delay_ms,
            },
            "queue": {
                "queue_url": self.queue.queue_url,
                "output_queue_urls": self.queue.output_queue_urls,
                "batch_size": self.queue.batch_size,
                "poll_interval_ms": self.queue.poll_interval_ms,
            },
            "aws": {
                "region": self.aws.region,
                "configured": self.aws.is_configured(),
            },
        })
    }
}

// ── Rules ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Roots scanned for rule documents. Missing roots are tolerated.
    pub dirs: Vec<PathBuf>,
    /// Entity types accepted without any rules.
    pub ignored_entity_types: Vec<String>,
    /// Event type used when the payload carries none.
    pub default_event_type: Option<String>,
}

impl RulesConfig {
    fn from_env_profiled(p: &str) -> Self {
        let mut dirs: Vec<PathBuf> = profiled_env_list(p, "RULES_DIRS")
            .into_iter()
            .map(PathBuf::from)
            .collect();
        if dirs.is_empty() {
            dirs.push(PathBuf::from("config/rules"));
        }
        Self {
            dirs,
            ignored_entity_types: profiled_env_list(p, "IGNORED_ENTITY_TYPES"),
            default_event_type: profiled_env_opt(p, "DEFAULT_EVENT_TYPE"),
        }
    }
}

fn reader_from_env_profiled(p: &str) -> ReaderConfig {
    let defaults = ReaderConfig::default();
    ReaderConfig {
        event_type_pointer: profiled_env_or(p, "EVENT_TYPE_POINTER", &defaults.event_type_pointer),
        entity_type_pointer: profiled_env_or(p, "ENTITY_TYPE_POINTER", &defaults.entity_type_pointer),
        entity_link_pointer: profiled_env_or(p, "ENTITY_LINK_POINTER", &defaults.entity_link_pointer),
        entity_pointer: profiled_env_or(p, "ENTITY_POINTER", &defaults.entity_pointer),
    }
}

// ── Model resolution ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub source: ModelSource,
    /// Model document read by the local resolver.
    pub file: PathBuf,
    /// Base URL queried by the remote resolver.
    pub base_url: Option<String>,
    /// Element path (relative to a `model`) holding its id; defaults to the id attribute name.
    pub id_path: Option<String>,
    pub cache_max_entries: u32,
    pub cache_ttl_secs: u64,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

impl ModelConfig {
    fn from_env_profiled(p: &str) -> Self {
        let source = match profiled_env_or(p, "MODEL_SOURCE", "local").to_lowercase().as_str() {
            "remote" => ModelSource::Remote,
            _ => ModelSource::Local,
        };
        Self {
            source,
            file: PathBuf::from(profiled_env_or(p, "MODEL_FILE", "config/models.xml")),
            base_url: profiled_env_opt(p, "MODEL_BASE_URL"),
            id_path: profiled_env_opt(p, "MODEL_ID_PATH"),
            cache_max_entries: profiled_env_u32(p, "MODEL_CACHE_MAX_ENTRIES", 1000),
            cache_ttl_secs: profiled_env_u64(p, "MODEL_CACHE_TTL_SECS", 3600),
            connect_timeout_ms: profiled_env_u64(p, "HTTP_CONNECT_TIMEOUT_MS", 5000),
            read_timeout_ms: profiled_env_u64(p, "HTTP_READ_TIMEOUT_MS", 30000),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

// ── Rule dictionary ───────────────────────────────────────────

/// Connection settings for the remote rule-dictionary service.
#[derive(Clone, Serialize, Deserialize)]
pub struct DictionaryConfig {
    /// Base URL; `None` disables dictionary checks.
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

impl std::fmt::Debug for DictionaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("read_timeout_ms", &self.read_timeout_ms)
            .finish()
    }
}

impl DictionaryConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            base_url: profiled_env_opt(p, "RULE_DICTIONARY_URL"),
            username: profiled_env_opt(p, "RULE_DICTIONARY_USERNAME"),
            password: profiled_env_opt(p, "RULE_DICTIONARY_PASSWORD"),
            connect_timeout_ms: profiled_env_u64(p, "HTTP_CONNECT_TIMEOUT_MS", 5000),
            read_timeout_ms: profiled_env_u64(p, "HTTP_READ_TIMEOUT_MS", 30000),
        }
    }

    /// Config pointing at a single base URL with default timeouts.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            username: None,
            password: None,
            connect_timeout_ms: 5000,
            read_timeout_ms: 30000,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }
}

// ── Publisher ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    pub enabled: bool,
    /// Extra attempts after the first failed send, per channel.
    pub retries: u32,
    /// Pause between attempts; zero retries immediately.
    pub retry_delay_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retries: 3,
            retry_delay_ms: 0,
        }
    }
}

impl PublisherConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            enabled: profiled_env_bool(p, "PUBLISH_ENABLED", true),
            retries: profiled_env_u32(p, "PUBLISH_RETRIES", 3),
            retry_delay_ms: profiled_env_u64(p, "PUBLISH_RETRY_DELAY_MS", 0),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

// ── Queue ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Inbound event queue.
    pub queue_url: Option<String>,
    pub dlq_url: Option<String>,
    pub visibility_timeout_secs: u32,
    /// Outbound result queues, one channel each.
    pub output_queue_urls: Vec<String>,
    pub batch_size: u32,
    pub poll_interval_ms: u64,
}

impl QueueConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            queue_url: profiled_env_opt(p, "QUEUE_URL"),
            dlq_url: profiled_env_opt(p, "QUEUE_DLQ_URL"),
            visibility_timeout_secs: profiled_env_u32(p, "QUEUE_VISIBILITY_TIMEOUT_SECS", 30),
            output_queue_urls: profiled_env_list(p, "OUTPUT_QUEUE_URLS"),
            batch_size: profiled_env_u32(p, "QUEUE_BATCH_SIZE", 10),
            poll_interval_ms: profiled_env_u64(p, "POLL_INTERVAL_MS", 1000),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// ── AWS ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            region: profiled_env_or(p, "AWS_REGION", "us-east-1"),
            access_key_id: profiled_env_opt(p, "AWS_ACCESS_KEY_ID"),
            secret_access_key: profiled_env_opt(p, "AWS_SECRET_ACCESS_KEY"),
            session_token: profiled_env_opt(p, "AWS_SESSION_TOKEN"),
            endpoint_url: profiled_env_opt(p, "AWS_ENDPOINT_URL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list(" a, ,b,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn profiled_lookup_prefers_prefixed_key() {
        env::set_var("VALIDUS_CFG_TEST_QUEUE_BATCH_SIZE", "7");
        assert_eq!(profiled_env_u32("VALIDUS_CFG_TEST", "QUEUE_BATCH_SIZE", 10), 7);
        assert_eq!(profiled_env_u32("VALIDUS_CFG_OTHER", "QUEUE_BATCH_SIZE_UNSET", 10), 10);
        env::remove_var("VALIDUS_CFG_TEST_QUEUE_BATCH_SIZE");
    }

    #[test]
    fn redacted_summary_hides_secrets() {
        let mut config = Config::for_profile("VALIDUS_REDACT_TEST");
        config.dictionary.password = Some("hunter2".into());
        config.aws.secret_access_key = Some("aws-secret".into());

        let summary = config.redacted_summary().to_string();
        assert!(!summary.contains("hunter2"));
        assert!(!summary.contains("aws-secret"));
        assert!(!format!("{:?}", config.dictionary).contains("hunter2"));
    }

    #[test]
    fn publisher_defaults() {
        let config = PublisherConfig::default();
        assert!(config.enabled);
        assert_eq!(config.retries, 3);
        assert_eq!(config.retry_delay(), Duration::ZERO);
    }
}
