//! Structural checks run before any adapter call.

use regex::{Regex, RegexBuilder};

use crate::config::{ConfigError, ServerOptions};

/// Checks client identifiers against the configured pattern.
///
/// The pattern is compiled once, anchored at both ends and matched
/// case-insensitively.
#[derive(Debug, Clone)]
pub struct ClientIdValidator {
    pattern: Regex,
}

impl ClientIdValidator {
    /// Compiles the validator from the server options.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the pattern does not compile.
    pub fn new(options: &ServerOptions) -> Result<Self, ConfigError> {
        Ok(Self {
            pattern: options.compile_client_id_pattern()?,
        })
    }

    /// Returns `true` if `candidate` matches the pattern in full.
    #[must_use]
    pub fn validate(&self, candidate: &str) -> bool {
        self.pattern.is_match(candidate)
    }
}

/// Exact-match whitelist of the grant types a server accepts.
#[derive(Debug, Clone)]
pub struct GrantTypeWhitelist {
    // None when no grants are configured.
    pattern: Option<Regex>,
}

impl GrantTypeWhitelist {
    /// Builds the whitelist from the configured grant names.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the derived pattern cannot be
    /// compiled.
    pub fn new(grants: &[String]) -> Result<Self, ConfigError> {
        if grants.is_empty() {
            return Ok(Self { pattern: None });
        }

        let alternation = grants
            .iter()
            .map(|grant| regex::escape(grant))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = RegexBuilder::new(&format!("^(?:{})$", alternation))
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("grant whitelist: {}", e)))?;

        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Returns `true` if `candidate` equals one configured grant,
    /// ignoring case.
    #[must_use]
    pub fn is_allowed(&self, candidate: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(candidate))
    }
}
