//! Server and archiver configuration

use crate::error::{ArchiveError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of callers allowed to wait behind the in-flight command
pub const DEFAULT_MAX_QUEUED_COMMANDS: usize = 16;

/// NNTP server configuration
///
/// Contains all the information needed to connect to an NNTP server.
///
/// # Example
///
/// ```
/// use nntp_archiver::ServerConfig;
///
/// // Plain connection on port 119
/// let config = ServerConfig::plain("news.example.com");
///
/// // Or TLS on port 563
/// let config = ServerConfig::tls("news.example.com");
/// assert_eq!(config.port, 563);
/// ```
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server hostname (e.g., "news.example.com")
    pub host: String,

    /// Server port (typically 119 for plain, 563 for TLS)
    pub port: u16,

    /// Use TLS/SSL encryption
    #[serde(default)]
    pub tls: bool,

    /// Allow insecure TLS connections (self-signed certificates, expired certificates)
    ///
    /// **Security Warning:** Setting this to `true` disables certificate validation,
    /// making your connection vulnerable to man-in-the-middle attacks.
    #[serde(default)]
    pub allow_insecure_tls: bool,

    /// Callers allowed to queue behind the in-flight command before `Busy` is returned
    ///
    /// `0` restores strict reject-when-busy behaviour.
    #[serde(default = "default_max_queued")]
    pub max_queued_commands: usize,

    /// Override for the response deadline, in seconds
    ///
    /// When `None`, single-line commands wait 60s and multi-line commands 180s.
    #[serde(default)]
    pub response_timeout_secs: Option<u64>,
}

fn default_max_queued() -> usize {
    DEFAULT_MAX_QUEUED_COMMANDS
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
            allow_insecure_tls: false,
            max_queued_commands: DEFAULT_MAX_QUEUED_COMMANDS,
            response_timeout_secs: None,
        }
    }

    /// Create a configuration for a plain connection on the standard port (119)
    pub fn plain(host: impl Into<String>) -> Self {
        Self::new(host, 119, false)
    }

    /// Create a configuration for a TLS connection on the standard secure port (563)
    pub fn tls(host: impl Into<String>) -> Self {
        Self::new(host, 563, true)
    }

    /// Create a TLS configuration that accepts self-signed certificates
    ///
    /// **Security Warning:** This configuration disables certificate validation.
    pub fn tls_insecure(host: impl Into<String>) -> Self {
        let mut config = Self::tls(host);
        config.allow_insecure_tls = true;
        config
    }

    /// Builder-style override of the response deadline
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    /// Builder-style override of the wait queue bound
    pub fn with_max_queued_commands(mut self, max_queued: usize) -> Self {
        self.max_queued_commands = max_queued;
        self
    }
}

/// Configuration of the archiving run loop
#[derive(Debug, Clone)]
pub struct ArchiverConfig {
    /// NNTP server to archive from
    pub server: ServerConfig,
    /// Directory holding staged fragments of split articles
    pub staging_dir: PathBuf,
    /// Only groups whose name starts with this prefix are archived
    pub group_prefix: Option<String>,
    /// Groups skipped even when they match the prefix
    pub excluded_groups: Vec<String>,
    /// Sleep after a pass that archived at least one article
    pub busy_delay: Duration,
    /// Sleep after a pass that archived nothing
    pub idle_delay: Duration,
    /// Sleep after a failed pass before retrying
    pub retry_delay: Duration,
}

impl ArchiverConfig {
    /// Default configuration for a server: every group, `./partials` staging
    pub fn new(server: ServerConfig) -> Self {
        Self {
            server,
            staging_dir: PathBuf::from("./partials"),
            group_prefix: None,
            excluded_groups: Vec::new(),
            busy_delay: Duration::from_secs(5 * 60),
            idle_delay: Duration::from_secs(10 * 60),
            retry_delay: Duration::from_secs(10 * 60),
        }
    }

    /// Build the configuration from environment variables
    ///
    /// - `NNTP_SERVER` (required), `NNTP_PORT`, `NNTP_TLS` (`1`/`true`)
    /// - `ARCHIVE_STAGING_DIR`, `ARCHIVE_GROUP_PREFIX`
    /// - `ARCHIVE_EXCLUDE_GROUPS` (comma separated)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("NNTP_SERVER")
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| ArchiveError::Config("NNTP_SERVER is not set".to_string()))?;

        let tls = lookup("NNTP_TLS")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let mut server = if tls {
            ServerConfig::tls(host.trim())
        } else {
            ServerConfig::plain(host.trim())
        };

        if let Some(port) = lookup("NNTP_PORT") {
            server.port = port
                .trim()
                .parse()
                .map_err(|_| ArchiveError::Config(format!("Invalid NNTP_PORT: {}", port)))?;
        }

        let mut config = Self::new(server);

        if let Some(dir) = lookup("ARCHIVE_STAGING_DIR") {
            config.staging_dir = PathBuf::from(dir);
        }
        config.group_prefix = lookup("ARCHIVE_GROUP_PREFIX").filter(|p| !p.is_empty());
        if let Some(excluded) = lookup("ARCHIVE_EXCLUDE_GROUPS") {
            config.excluded_groups = excluded
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }

    /// Whether a group from the server's list should be archived
    pub fn accepts_group(&self, name: &str) -> bool {
        if let Some(prefix) = &self.group_prefix
            && !name.starts_with(prefix.as_str())
        {
            return false;
        }
        !self.excluded_groups.iter().any(|g| g == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_plain_helper() {
        let config = ServerConfig::plain("news.example.com");
        assert_eq!(config.port, 119);
        assert!(!config.tls);
        assert!(!config.allow_insecure_tls);
        assert_eq!(config.max_queued_commands, DEFAULT_MAX_QUEUED_COMMANDS);
    }

    #[test]
    fn test_tls_insecure_helper() {
        let config = ServerConfig::tls_insecure("localhost");
        assert_eq!(config.port, 563);
        assert!(config.tls);
        assert!(config.allow_insecure_tls);
    }

    #[test]
    fn test_response_timeout_override() {
        let config = ServerConfig::plain("h").with_response_timeout(Duration::from_secs(5));
        assert_eq!(config.response_timeout_secs, Some(5));
    }

    #[test]
    fn test_from_lookup_requires_server() {
        assert!(matches!(
            ArchiverConfig::from_lookup(lookup(&[])),
            Err(ArchiveError::Config(_))
        ));
    }

    #[test]
    fn test_from_lookup_full() {
        let config = ArchiverConfig::from_lookup(lookup(&[
            ("NNTP_SERVER", "news.example.com"),
            ("NNTP_PORT", "1119"),
            ("ARCHIVE_STAGING_DIR", "/tmp/partials"),
            ("ARCHIVE_GROUP_PREFIX", "omnitel."),
            ("ARCHIVE_EXCLUDE_GROUPS", "omnitel.binaries, omnitel.test"),
        ]))
        .unwrap();

        assert_eq!(config.server.host, "news.example.com");
        assert_eq!(config.server.port, 1119);
        assert!(!config.server.tls);
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/partials"));
        assert_eq!(config.excluded_groups, vec!["omnitel.binaries", "omnitel.test"]);

        assert!(config.accepts_group("omnitel.books"));
        assert!(!config.accepts_group("omnitel.binaries"));
        assert!(!config.accepts_group("comp.lang.rust"));
    }

    #[test]
    fn test_invalid_port() {
        let result = ArchiverConfig::from_lookup(lookup(&[
            ("NNTP_SERVER", "news.example.com"),
            ("NNTP_PORT", "abc"),
        ]));
        assert!(matches!(result, Err(ArchiveError::Config(_))));
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"host": "news.example.com", "port": 119}"#).unwrap();
        assert!(!config.tls);
        assert_eq!(config.max_queued_commands, DEFAULT_MAX_QUEUED_COMMANDS);
        assert_eq!(config.response_timeout_secs, None);
    }

    #[test]
    fn test_accepts_everything_without_filters() {
        let config = ArchiverConfig::new(ServerConfig::plain("h"));
        assert!(config.accepts_group("alt.anything"));
    }
}
