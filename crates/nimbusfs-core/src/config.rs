//! Tree-level configuration.
//!
//! There is no process-wide default-options singleton: an [`FsConfig`] value
//! is handed to [`RemoteFs::new`](crate::RemoteFs::new) and threaded through
//! name resolution from there. Callers that want different behavior build a
//! second tree with a second config.

use serde::{Deserialize, Serialize};

/// Host token substituted for an empty-host authority (`scheme://user@/path`).
pub const DEFAULT_HOST: &str = "localhost";

/// Configuration for one remote file tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Substituted when an address carries an authority terminator but no
    /// host (`...@/...`). Backends with an optional authority stay
    /// addressable because downstream components can assume a host exists.
    pub default_host: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        FsConfig {
            default_host: DEFAULT_HOST.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_serde() {
        let config = FsConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: FsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.default_host, DEFAULT_HOST);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: FsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.default_host, DEFAULT_HOST);
    }
}
