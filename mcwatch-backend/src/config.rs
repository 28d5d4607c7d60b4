use std::env::var;
use std::time::Duration;

use dotenvy::dotenv;
use mcwatch_db::{DEFAULT_PORT, PrunePolicy, ServerIdentity};

use crate::validation::parse_server;

const SECONDS_PER_DAY: i64 = 86_400;

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Servers to track
    /// Env: MCWATCH_SERVERS, comma-separated `host[:port]` (default: "localhost:25565")
    pub servers: Vec<ServerIdentity>,

    /// Interval between poll cycles for each server
    /// Env: POLL_INTERVAL_SECS (default: 60)
    pub poll_interval: Duration,

    /// Bound on one status query round trip
    /// Env: QUERY_TIMEOUT_SECS (default: 5)
    pub query_timeout: Duration,

    /// Database file path
    /// Env: DATABASE_PATH (default: "mcwatch.db")
    pub database_path: String,

    /// HTTP port
    /// Env: PORT (default: 3000)
    pub port: u16,

    /// Request timeout
    /// Env: REQUEST_TIMEOUT_SECS (default: 30)
    pub request_timeout: Duration,

    /// Optional pruning of the presence table
    /// Env: PRESENCE_MAX_AGE_DAYS, PRESENCE_MAX_ENTRIES (default: unset, keep everything)
    pub prune: PrunePolicy,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv(); //for debugging mostly
        let defaults = Self::default();

        let servers = var("MCWATCH_SERVERS")
            .ok()
            .map(|list| parse_server_list(&list))
            .filter(|servers| !servers.is_empty())
            .unwrap_or(defaults.servers);

        Self {
            servers,
            poll_interval: Duration::from_secs(env_or_default::<u64>("POLL_INTERVAL_SECS", 60).max(1)),
            query_timeout: Duration::from_secs(env_or_default::<u64>("QUERY_TIMEOUT_SECS", 5).max(1)),
            database_path: env_or_default_string("DATABASE_PATH", "mcwatch.db"),
            port: env_or_default("PORT", 3000),
            request_timeout: Duration::from_secs(env_or_default("REQUEST_TIMEOUT_SECS", 30)),
            prune: prune_policy_from_env(),
        }
    }

    /// Create configuration with all default values
    pub fn default() -> Self {
        Self {
            servers: vec![ServerIdentity::new("localhost", DEFAULT_PORT)],
            poll_interval: Duration::from_secs(60),
            query_timeout: Duration::from_secs(5),
            database_path: "mcwatch.db".to_string(),
            port: 3000,
            request_timeout: Duration::from_secs(30),
            prune: PrunePolicy::default(),
        }
    }
}

/// Parse a comma-separated server list, skipping (and logging) bad entries
/// and duplicates.
pub fn parse_server_list(list: &str) -> Vec<ServerIdentity> {
    let mut servers: Vec<ServerIdentity> = Vec::new();
    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match parse_server(entry) {
            Ok(identity) if servers.contains(&identity) => {
                tracing::warn!(%identity, "ignoring duplicate server entry");
            }
            Ok(identity) => servers.push(identity),
            Err(err) => tracing::warn!(entry, %err, "ignoring invalid server entry"),
        }
    }
    servers
}

/// Read the optional pruning limits. Anything but a positive integer is
/// logged and ignored, which leaves that limit off.
fn prune_policy_from_env() -> PrunePolicy {
    PrunePolicy {
        max_age: var("PRESENCE_MAX_AGE_DAYS")
            .ok()
            .and_then(|raw| positive_limit::<u64>("PRESENCE_MAX_AGE_DAYS", &raw))
            .and_then(|days| {
                let seconds = i64::try_from(days)
                    .ok()
                    .and_then(|days| days.checked_mul(SECONDS_PER_DAY));
                if seconds.is_none() {
                    tracing::warn!(days, "ignoring PRESENCE_MAX_AGE_DAYS, value too large");
                }
                seconds
            }),
        max_entries: var("PRESENCE_MAX_ENTRIES")
            .ok()
            .and_then(|raw| positive_limit::<usize>("PRESENCE_MAX_ENTRIES", &raw)),
    }
}

fn positive_limit<T>(key: &str, raw: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            tracing::warn!(key, value = raw, "ignoring invalid pruning limit");
            None
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_optional(key).unwrap_or(default)
}

/// Parse environment variable if set and valid
fn env_optional<T: std::str::FromStr>(key: &str) -> Option<T> {
    var(key).ok().and_then(|val| val.parse().ok())
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.servers, vec![ServerIdentity::new("localhost", 25565)]);
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.query_timeout, Duration::from_secs(5));
        assert_eq!(config.database_path, "mcwatch.db");
        assert_eq!(config.port, 3000);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.prune.is_unbounded());
    }

    #[test]
    fn test_parse_server_list() {
        let servers = parse_server_list("mc.example.com, https://play.example.org:25570/ ,,");
        assert_eq!(
            servers,
            vec![
                ServerIdentity::new("mc.example.com", 25565),
                ServerIdentity::new("play.example.org", 25570),
            ]
        );
    }

    #[test]
    fn test_prune_policy_from_env() {
        fn with_env(age: &str, entries: &str) -> PrunePolicy {
            unsafe { std::env::set_var("PRESENCE_MAX_AGE_DAYS", age) };
            unsafe { std::env::set_var("PRESENCE_MAX_ENTRIES", entries) };
            prune_policy_from_env()
        }

        let policy = with_env("7", "500");
        assert_eq!(policy.max_age, Some(7 * 86_400));
        assert_eq!(policy.max_entries, Some(500));

        // negative would put the cutoff in the future and drop everyone
        let policy = with_env("-1", "-5");
        assert!(policy.is_unbounded());

        let policy = with_env("0", "0");
        assert!(policy.is_unbounded());

        // overflows i64 seconds
        let policy = with_env("200000000000000", "many");
        assert!(policy.is_unbounded());

        unsafe { std::env::remove_var("PRESENCE_MAX_AGE_DAYS") };
        unsafe { std::env::remove_var("PRESENCE_MAX_ENTRIES") };
        assert!(prune_policy_from_env().is_unbounded());
    }

    #[test]
    fn test_parse_server_list_skips_invalid_and_duplicates() {
        let servers = parse_server_list("bad host,mc.example.com,mc.example.com:25565,x:notaport");
        assert_eq!(servers, vec![ServerIdentity::new("mc.example.com", 25565)]);
    }
}
