//! HTTP seam for the catalog session
//!
//! [`Transport`] is the only place raw HTTP happens. Implementations report
//! failures as [`TransportError`]; classification into the taxonomy happens
//! in the session client.

use std::fmt;
use std::io;

use serde::Deserialize;
use url::Url;

use crate::config::RequestConfig;
use crate::error::TransportError;
use crate::secure::SecureString;
use crate::source::Record;

/// Header carrying the session handle on authenticated calls
pub const SESSION_HEADER: &str = "X-ArchivesSpace-Session";

/// HTTP verbs a caller may ask for. Only `Get` is served by `request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

pub trait Transport {
    /// Authenticate and return the opaque session handle
    fn login(
        &self,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<SecureString, TransportError>;

    /// Cheap read used to prove a fresh handle works
    fn verify(&self, base_url: &str, session: &str) -> Result<(), TransportError>;

    fn get(&self, url: &str, session: &str) -> Result<Record, TransportError>;

    /// Returns the response status; non-2xx statuses are not errors here
    fn put(&self, url: &str, session: &str, body: &Record) -> Result<u16, TransportError>;
}

/// Validate a caller-supplied address and return it without a trailing slash
///
/// # Errors
/// Returns [`TransportError::InvalidAddress`] when the address does not parse
/// or does not use http(s).
pub fn parse_base_url(address: &str) -> Result<String, TransportError> {
    let trimmed = address.trim();
    let url = Url::parse(trimmed).map_err(|err| TransportError::InvalidAddress {
        reason: format!("cannot parse `{trimmed}`"),
        source: Some(Box::new(err)),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(TransportError::InvalidAddress {
            reason: format!("unsupported scheme `{}`", url.scheme()),
            source: None,
        });
    }
    if url.host_str().unwrap_or_default().is_empty() {
        return Err(TransportError::InvalidAddress {
            reason: "address has no host".to_string(),
            source: None,
        });
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Join a base URL and an API path such as `/repositories/2`
#[must_use]
pub fn join_endpoint(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    session: String,
}

/// Blocking transport backed by a shared `ureq` agent
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    #[must_use]
    pub fn new(config: &RequestConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout()).build();
        Self { agent }
    }

    fn login_url(base_url: &str, username: &str) -> Result<Url, TransportError> {
        let mut url = Url::parse(base_url).map_err(|err| TransportError::InvalidAddress {
            reason: format!("cannot parse `{base_url}`"),
            source: Some(Box::new(err)),
        })?;
        url.path_segments_mut()
            .map_err(|()| TransportError::InvalidAddress {
                reason: format!("`{base_url}` cannot be used as a base address"),
                source: None,
            })?
            .pop_if_empty()
            .extend(["users", username, "login"]);
        Ok(url)
    }
}

impl Transport for UreqTransport {
    fn login(
        &self,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<SecureString, TransportError> {
        let url = Self::login_url(base_url, username)?;
        tracing::debug!(url = %url, "POST login");

        let response = match self
            .agent
            .post(url.as_str())
            .set("Accept", "application/json")
            .send_form(&[("password", password)])
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) if (400..500).contains(&status) => {
                return Err(TransportError::CredentialsRejected {
                    status: Some(status),
                });
            }
            Err(err) => return Err(map_ureq_error(err)),
        };

        let body: LoginResponse = response.into_json().map_err(TransportError::Decode)?;
        Ok(SecureString::new(body.session))
    }

    fn verify(&self, base_url: &str, session: &str) -> Result<(), TransportError> {
        let url = join_endpoint(base_url, "/");
        tracing::debug!(url = %url, "GET verify");
        self.agent
            .get(&url)
            .set(SESSION_HEADER, session)
            .set("Accept", "application/json")
            .call()
            .map_err(map_ureq_error)?;
        Ok(())
    }

    fn get(&self, url: &str, session: &str) -> Result<Record, TransportError> {
        tracing::debug!(url = %url, "GET");
        let response = self
            .agent
            .get(url)
            .set(SESSION_HEADER, session)
            .set("Accept", "application/json")
            .call()
            .map_err(map_ureq_error)?;
        response.into_json().map_err(TransportError::Decode)
    }

    fn put(&self, url: &str, session: &str, body: &Record) -> Result<u16, TransportError> {
        tracing::debug!(url = %url, fields = body.len(), "PUT");
        match self
            .agent
            .put(url)
            .set(SESSION_HEADER, session)
            .set("Accept", "application/json")
            .send_json(body)
        {
            Ok(response) => Ok(response.status()),
            Err(ureq::Error::Status(status, _)) => Ok(status),
            Err(err) => Err(map_ureq_error(err)),
        }
    }
}

/// Sort a `ureq` failure into the raw transport categories
fn map_ureq_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Status(status, response) => {
            // Never log the body; it may carry record content
            tracing::debug!(
                status,
                url = response.get_url(),
                "catalog API returned an error response"
            );
            TransportError::Status {
                status: Some(status),
            }
        }
        ureq::Error::Transport(transport) => match transport.kind() {
            ureq::ErrorKind::InvalidUrl
            | ureq::ErrorKind::UnknownScheme
            | ureq::ErrorKind::InsecureRequestHttpsOnly
            | ureq::ErrorKind::InvalidProxyUrl => TransportError::InvalidAddress {
                reason: transport.to_string(),
                source: Some(Box::new(transport)),
            },
            ureq::ErrorKind::Dns
            | ureq::ErrorKind::ConnectionFailed
            | ureq::ErrorKind::ProxyConnect => TransportError::Connect(Box::new(transport)),
            ureq::ErrorKind::Io if is_timeout(&transport) => {
                TransportError::Timeout(Box::new(transport))
            }
            ureq::ErrorKind::Io
            | ureq::ErrorKind::BadStatus
            | ureq::ErrorKind::BadHeader
            | ureq::ErrorKind::TooManyRedirects => TransportError::Request(Box::new(transport)),
            _ => TransportError::Other(Box::new(transport)),
        },
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    std::error::Error::source(transport)
        .and_then(|source| source.downcast_ref::<io::Error>())
        .is_some_and(|err| {
            matches!(
                err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            )
        })
}
