//! Shared, validated server configuration.

use std::sync::Arc;

use arc_swap::ArcSwap;
use time::{Duration, OffsetDateTime};

use crate::clock::Clock;
use crate::config::{ConfigError, DebugSink, ServerOptions};
use crate::model::Model;
use crate::validation::{ClientIdValidator, GrantTypeWhitelist};

/// Everything the flows read while handling a request.
///
/// Built once by [`OAuth2Server::builder`](crate::OAuth2Server::builder) and
/// shared behind an `Arc`. Only the debug sink can change afterwards.
pub struct ConfigurationContext {
    model: Arc<dyn Model>,
    options: ServerOptions,
    client_ids: ClientIdValidator,
    grant_types: GrantTypeWhitelist,
    clock: Arc<dyn Clock>,
    debug: ArcSwap<DebugSink>,
}

impl ConfigurationContext {
    /// Validates the options and compiles the validators.
    ///
    /// # Errors
    ///
    /// Returns any error [`ServerOptions::validate`] reports.
    pub fn new(
        model: Arc<dyn Model>,
        options: ServerOptions,
        clock: Arc<dyn Clock>,
        debug: DebugSink,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        let client_ids = ClientIdValidator::new(&options)?;
        let grant_types = GrantTypeWhitelist::new(&options.grants)?;

        Ok(Self {
            model,
            options,
            client_ids,
            grant_types,
            clock,
            debug: ArcSwap::from_pointee(debug),
        })
    }

    /// The persistence adapter.
    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    /// The options the context was built from.
    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Client identifier validator.
    pub fn client_ids(&self) -> &ClientIdValidator {
        &self.client_ids
    }

    /// Grant type whitelist.
    pub fn grant_types(&self) -> &GrantTypeWhitelist {
        &self.grant_types
    }

    /// Current time according to the configured clock.
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Access token lifetime; `None` means tokens never expire.
    pub fn access_token_ttl(&self) -> Option<Duration> {
        non_zero_seconds(self.options.access_token_lifetime)
    }

    /// Refresh token lifetime; `None` means tokens never expire.
    pub fn refresh_token_ttl(&self) -> Option<Duration> {
        non_zero_seconds(self.options.refresh_token_lifetime)
    }

    /// Authorization code lifetime (always positive after validation).
    pub fn auth_code_ttl(&self) -> Duration {
        seconds(self.options.auth_code_lifetime)
    }

    /// Sends a diagnostic message to the current debug sink.
    pub fn debug(&self, message: &str) {
        self.debug.load().emit(message);
    }

    /// Replaces the debug sink. Handlers created earlier see the new sink.
    pub fn set_debug_sink(&self, sink: DebugSink) {
        self.debug.store(Arc::new(sink));
    }
}

impl std::fmt::Debug for ConfigurationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationContext")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn non_zero_seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| seconds(secs))
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}
