//! Authorization server configuration.
//!
//! [`ServerOptions`] carries every setting except the persistence adapter,
//! which is supplied to [`OAuth2Server::builder`](crate::OAuth2Server::builder)
//! separately. Options can be built in code or loaded from a TOML file with
//! environment overrides.
//!
//! # Example (TOML)
//!
//! ```toml
//! grants = ["authorization_code", "refresh_token"]
//! access_token_lifetime = 3600
//! refresh_token_lifetime = 1209600
//! auth_code_lifetime = 30
//! passthrough_errors = false
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::types::GrantType;

/// Default access token lifetime: one hour.
pub const DEFAULT_ACCESS_TOKEN_LIFETIME: u64 = 3600;

/// Default refresh token lifetime: fourteen days.
pub const DEFAULT_REFRESH_TOKEN_LIFETIME: u64 = 1_209_600;

/// Default authorization code lifetime.
pub const DEFAULT_AUTH_CODE_LIFETIME: u64 = 30;

/// Default client identifier pattern (matched case-insensitively, anchored).
pub const DEFAULT_CLIENT_ID_PATTERN: &str = "[a-z0-9_-]{3,40}";

/// Server-wide options.
///
/// Lifetimes are in seconds. An access or refresh token lifetime of `0`
/// issues tokens that never expire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Grant types this server accepts. Empty means none.
    pub grants: Vec<String>,

    /// Route diagnostic messages to `tracing` instead of discarding them.
    pub debug: bool,

    /// Hand adapter failures to the host's error handling instead of
    /// rendering an OAuth `server_error` body.
    pub passthrough_errors: bool,

    /// Keep running the inner service after a response has been produced.
    pub continue_after_response: bool,

    /// Access token lifetime.
    pub access_token_lifetime: u64,

    /// Refresh token lifetime.
    pub refresh_token_lifetime: u64,

    /// Authorization code lifetime. Must be greater than zero.
    pub auth_code_lifetime: u64,

    /// Pattern client identifiers must match in full.
    pub client_id_pattern: String,

    /// Report token expiry as an absolute instant (`expires_at`) instead of
    /// a lifetime in seconds (`expires_in`).
    pub expires_date_mode: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            grants: Vec::new(),
            debug: false,
            passthrough_errors: false,
            continue_after_response: false,
            access_token_lifetime: DEFAULT_ACCESS_TOKEN_LIFETIME,
            refresh_token_lifetime: DEFAULT_REFRESH_TOKEN_LIFETIME,
            auth_code_lifetime: DEFAULT_AUTH_CODE_LIFETIME,
            client_id_pattern: DEFAULT_CLIENT_ID_PATTERN.to_string(),
            expires_date_mode: false,
        }
    }
}

impl ServerOptions {
    /// Creates options accepting the given grant types, everything else
    /// defaulted.
    #[must_use]
    pub fn with_grants<I, S>(grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            grants: grants.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Loads options from an optional TOML file plus `KEYWARD__*`
    /// environment overrides (e.g. `KEYWARD__ACCESS_TOKEN_LIFETIME=600`,
    /// `KEYWARD__GRANTS=password,refresh_token`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be read or parsed and
    /// any error [`validate`](Self::validate) reports.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        use config::{Config, Environment, File};

        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("KEYWARD")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("grants"),
        );

        let options: ServerOptions = builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        options.validate()?;
        Ok(options)
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `client_id_pattern` does not compile
    /// - a grant is neither a standard grant type nor an absolute URI
    /// - `auth_code_lifetime` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compile_client_id_pattern()?;

        for grant in &self.grants {
            if let Err(e) = grant.parse::<GrantType>() {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid grant type: '{}' ({})",
                    grant, e
                )));
            }
        }

        if self.auth_code_lifetime == 0 {
            return Err(ConfigError::InvalidValue(
                "auth_code_lifetime must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub(crate) fn compile_client_id_pattern(&self) -> Result<Regex, ConfigError> {
        RegexBuilder::new(&format!("^(?:{})$", self.client_id_pattern))
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                ConfigError::InvalidValue(format!(
                    "client_id_pattern '{}' is not a valid pattern: {}",
                    self.client_id_pattern, e
                ))
            })
    }
}

/// Configuration errors, all fatal at construction time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No persistence adapter was supplied.
    #[error("Missing required configuration: model")]
    MissingModel,

    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A configuration source could not be read or parsed.
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

/// Receiver for diagnostic messages emitted by the flows.
#[derive(Clone)]
pub struct DebugSink(Arc<dyn Fn(&str) + Send + Sync>);

impl DebugSink {
    /// Wraps a callable.
    pub fn new(sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self(Arc::new(sink))
    }

    /// A sink that discards every message.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// A sink forwarding to `tracing` at debug level.
    #[must_use]
    pub fn tracing() -> Self {
        Self::new(|message| tracing::debug!(target: "keyward_auth::debug", "{}", message))
    }

    /// Emits one message.
    pub fn emit(&self, message: &str) {
        (self.0)(message);
    }
}

impl Default for DebugSink {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for DebugSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DebugSink")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    #[test]
    fn test_default_options() {
        let options = ServerOptions::default();
        assert!(options.grants.is_empty());
        assert!(!options.debug);
        assert!(!options.passthrough_errors);
        assert!(!options.continue_after_response);
        assert_eq!(options.access_token_lifetime, 3600);
        assert_eq!(options.refresh_token_lifetime, 1_209_600);
        assert_eq!(options.auth_code_lifetime, 30);
        assert_eq!(options.client_id_pattern, "[a-z0-9_-]{3,40}");
        assert!(!options.expires_date_mode);
    }

    #[test]
    fn test_default_options_validate() {
        assert!(ServerOptions::default().validate().is_ok());
    }

    #[test]
    fn test_with_grants() {
        let options = ServerOptions::with_grants(["password", "refresh_token"]);
        assert_eq!(options.grants, vec!["password", "refresh_token"]);
        assert_eq!(options.access_token_lifetime, 3600);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_extension_grant_validates() {
        let options = ServerOptions::with_grants(["urn:ietf:params:oauth:grant-type:jwt-bearer"]);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_unknown_grant_fails_validation() {
        let options = ServerOptions::with_grants(["implicit"]);
        let err = options.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert!(err.to_string().contains("grant type"));
    }

    #[test]
    fn test_bad_client_id_pattern_fails_validation() {
        let options = ServerOptions {
            client_id_pattern: "[a-z".to_string(),
            ..ServerOptions::default()
        };
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("client_id_pattern"));
    }

    #[test]
    fn test_zero_auth_code_lifetime_fails_validation() {
        let options = ServerOptions {
            auth_code_lifetime: 0,
            ..ServerOptions::default()
        };
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("auth_code_lifetime"));
    }

    #[test]
    fn test_zero_token_lifetimes_are_valid() {
        let options = ServerOptions {
            access_token_lifetime: 0,
            refresh_token_lifetime: 0,
            ..ServerOptions::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "grants = [\"authorization_code\", \"refresh_token\"]\naccess_token_lifetime = 600\ncontinue_after_response = true"
        )
        .unwrap();

        let options = ServerOptions::load(Some(file.path())).unwrap();
        assert_eq!(options.grants, vec!["authorization_code", "refresh_token"]);
        assert_eq!(options.access_token_lifetime, 600);
        assert!(options.continue_after_response);
        assert_eq!(options.auth_code_lifetime, 30);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "auth_code_lifetime = 0").unwrap();

        let err = ServerOptions::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ServerOptions::load(Some(Path::new("/nonexistent/keyward.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_debug_sink_emits() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink = DebugSink::new(move |m| captured.lock().unwrap().push(m.to_string()));

        sink.emit("hello");
        DebugSink::noop().emit("dropped");

        assert_eq!(*seen.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::MissingModel.to_string(),
            "Missing required configuration: model"
        );
        assert_eq!(
            ConfigError::InvalidValue("x".to_string()).to_string(),
            "Invalid configuration value: x"
        );
    }
}
