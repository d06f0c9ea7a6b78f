//! Catalog API session lifecycle
//!
//! `establish()` validates configuration, logs in and verifies the handle,
//! retrying only network-classified failures with exponential backoff.
//! Reads are refused until a session has been established; the client never
//! re-authenticates on its own.

use std::time::Duration;

use crate::config::{CatalogConfig, RequestConfig};
use crate::error::{ErrorKind, SessionError};
use crate::secure::SecureString;
use crate::source::{repository_path, resource_path, Record, RecordSource, RepositoryId, ResourceId};
use crate::transport::{join_endpoint, parse_base_url, Method, Transport, UreqTransport};

/// Blocking delay between establish attempts
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Address, credentials and the current session handle
#[derive(Debug)]
pub struct SessionState {
    address: String,
    username: String,
    password: SecureString,
    session: Option<SecureString>,
    validated: bool,
}

impl SessionState {
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecureString>,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password: password.into(),
            session: None,
            validated: false,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn check_configuration(&self) -> Result<(), SessionError> {
        let mut missing = Vec::new();
        if self.address.trim().is_empty() {
            missing.push("address");
        }
        if self.username.trim().is_empty() {
            missing.push("username");
        }
        if self.password.is_blank() {
            missing.push("password");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SessionError::configuration(format!(
                "{} cannot be empty",
                missing.join(", ")
            )))
        }
    }

    fn clear(&mut self) {
        self.session = None;
        self.validated = false;
    }
}

/// One authenticated session against the catalog API
pub struct SessionClient<T = UreqTransport, S = ThreadSleeper> {
    state: SessionState,
    config: RequestConfig,
    transport: T,
    sleeper: S,
}

impl SessionClient {
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecureString>,
    ) -> Self {
        Self::with_config(address, username, password, RequestConfig::default())
    }

    pub fn with_config(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecureString>,
        config: RequestConfig,
    ) -> Self {
        let transport = UreqTransport::new(&config);
        Self::with_parts(
            SessionState::new(address, username, password),
            config,
            transport,
            ThreadSleeper,
        )
    }

    pub fn from_config(config: &CatalogConfig, password: impl Into<SecureString>) -> Self {
        Self::with_config(
            config.base_url.clone(),
            config.username.clone(),
            password,
            config.request.clone(),
        )
    }
}

impl<T: Transport, S: Sleeper> SessionClient<T, S> {
    pub fn with_parts(state: SessionState, config: RequestConfig, transport: T, sleeper: S) -> Self {
        Self {
            state,
            config,
            transport,
            sleeper,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_validated(&self) -> bool {
        self.state.validated
    }

    /// Establish and verify a session.
    ///
    /// Only network failures are retried, up to `max_attempts` in total with
    /// `backoff_base * 2^attempt` between attempts. A failed verification call
    /// counts as a network failure and consumes one attempt.
    ///
    /// # Errors
    /// - `Configuration` for blank or malformed settings, before any network call
    /// - `Authentication` when credentials are rejected or a 4xx is returned
    /// - `Network` once every attempt has failed with a transport error
    /// - `Server` for 5xx or unclassified failures
    pub fn establish(&mut self) -> Result<(), SessionError> {
        self.state.clear();
        self.state.check_configuration()?;

        let max_attempts = self.config.attempts();
        let mut attempt = 0;
        loop {
            let err = match self.connect_once() {
                Ok(session) => {
                    self.state.session = Some(session);
                    self.state.validated = true;
                    tracing::info!(
                        address = %self.state.address.trim(),
                        attempts = attempt + 1,
                        "catalog session established"
                    );
                    return Ok(());
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                tracing::warn!(error = %err, "catalog session could not be established");
                return Err(err);
            }

            attempt += 1;
            if attempt >= max_attempts {
                tracing::warn!(attempts = max_attempts, error = %err, "giving up on catalog session");
                return Err(SessionError::new(
                    ErrorKind::Network,
                    format!("failed after {max_attempts} attempts"),
                    Some(Box::new(err)),
                ));
            }

            let delay = self.config.backoff_delay(attempt - 1);
            tracing::warn!(
                attempt,
                delay_secs = delay.as_secs(),
                error = %err,
                "transient failure establishing catalog session, retrying"
            );
            self.sleeper.sleep(delay);
        }
    }

    fn connect_once(&self) -> Result<SecureString, SessionError> {
        let base_url = parse_base_url(&self.state.address)?;
        let session = self.transport.login(
            &base_url,
            self.state.username.trim(),
            self.state.password.as_str(),
        )?;

        if let Err(err) = self.transport.verify(&base_url, session.as_str()) {
            return Err(SessionError::new(
                ErrorKind::Network,
                "session verification failed",
                Some(Box::new(err)),
            ));
        }
        Ok(session)
    }

    fn active_session(&self) -> Result<&SecureString, SessionError> {
        match (&self.state.session, self.state.validated) {
            (Some(session), true) => Ok(session),
            _ => Err(SessionError::authentication(
                "no validated session; call establish first",
            )),
        }
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        join_endpoint(self.state.address.trim(), endpoint)
    }

    /// GET an API path such as `/repositories/2`
    ///
    /// # Errors
    /// `Authentication` without a network call when no session is validated;
    /// otherwise the classified transport failure, or `Decode` for a
    /// malformed body.
    pub fn read(&self, endpoint: &str) -> Result<Record, SessionError> {
        let session = self.active_session()?;
        let url = self.endpoint_url(endpoint);
        self.transport
            .get(&url, session.as_str())
            .map_err(SessionError::from)
    }

    /// Verb-dispatching read. Verbs other than GET are accepted and ignored.
    ///
    /// # Errors
    /// Same as [`SessionClient::read`].
    pub fn request(&self, method: Method, endpoint: &str) -> Result<Option<Record>, SessionError> {
        self.active_session()?;
        match method {
            Method::Get => self.read(endpoint).map(Some),
            Method::Post | Method::Put | Method::Delete => {
                tracing::warn!(%method, endpoint, "unsupported verb ignored");
                Ok(None)
            }
        }
    }

    /// PUT a record. Returns `true` only for HTTP 200; failures are logged,
    /// never raised.
    pub fn update(&self, endpoint: &str, body: &Record) -> bool {
        let session = match self.active_session() {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(endpoint, error = %err, "update skipped");
                return false;
            }
        };

        let url = self.endpoint_url(endpoint);
        match self.transport.put(&url, session.as_str(), body) {
            Ok(200) => true,
            Ok(status) => {
                tracing::warn!(endpoint, status, "update rejected by catalog");
                false
            }
            Err(err) => {
                tracing::warn!(endpoint, error = %err, "update failed");
                false
            }
        }
    }

    /// # Errors
    /// Same as [`SessionClient::read`].
    pub fn repository(&self, repository: RepositoryId) -> Result<Record, SessionError> {
        self.read(&repository_path(repository))
    }

    /// # Errors
    /// Same as [`SessionClient::read`].
    pub fn resource(
        &self,
        repository: RepositoryId,
        resource: ResourceId,
    ) -> Result<Record, SessionError> {
        self.read(&resource_path(repository, resource))
    }

    pub fn update_resource(
        &self,
        repository: RepositoryId,
        resource: ResourceId,
        record: &Record,
    ) -> bool {
        self.update(&resource_path(repository, resource), record)
    }
}

impl<T: Transport, S: Sleeper> RecordSource for SessionClient<T, S> {
    fn fetch_record(
        &self,
        repository: RepositoryId,
        resource: ResourceId,
    ) -> Result<Record, SessionError> {
        self.resource(repository, resource)
    }
}
