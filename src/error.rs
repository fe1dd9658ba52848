//! Broker-level error types shared across flows, the registry, and transports.

// self
use crate::{_prelude::*, auth::IdentifierError, http::Endpoint, registry::RegistryError};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
///
/// None of the variants carry secret material, so they are safe to log.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem (no usable credentials, bad endpoint, unreadable registry).
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Upstream endpoint rejected the request or answered with an unusable body.
	#[error(transparent)]
	TokenRequest(#[from] TokenRequestError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Identity login callback failed.
	#[error(transparent)]
	Login(#[from] LoginError),

	/// Caller supplied an argument that can never succeed.
	#[error("Invalid `{argument}`: {reason}.")]
	InvalidArgument {
		/// Name of the offending argument.
		argument: &'static str,
		/// Why the value was rejected.
		reason: &'static str,
	},
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Neither the registry nor the fallback configuration supplied a client identifier.
	#[error("No analytics client identifier is available for the current session.")]
	NoClientCredentials,
	/// A client identifier was resolved but its secret is missing.
	#[error("Client secret is missing for analytics client `{client_id}`.")]
	MissingClientSecret {
		/// Client identifier whose secret is missing.
		client_id: String,
	},
	/// Login was requested but no identity provider is configured.
	#[error("Identity login is not configured.")]
	LoginNotConfigured,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Request payload could not be encoded.
	#[error("Request payload could not be encoded.")]
	RequestEncoding(#[source] serde_json::Error),
	/// A configured endpoint cannot be turned into a valid URL.
	#[error("The {endpoint} endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: Endpoint,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Environment variables could not be parsed into a configuration.
	#[error("Environment configuration is invalid.")]
	Environment(#[source] ::config::ConfigError),
	/// The credential registry could not be loaded.
	#[error(transparent)]
	Registry(#[from] RegistryError),
	/// An identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] IdentifierError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<::config::ConfigError> for ConfigError {
	fn from(e: ::config::ConfigError) -> Self {
		Self::Environment(e)
	}
}

/// Failures reported by the token, embed-auth, or login endpoints.
#[derive(Debug, ThisError)]
pub enum TokenRequestError {
	/// Endpoint answered with a non-success HTTP status.
	#[error("The {endpoint} endpoint rejected the request{}.", status_suffix(.status))]
	Rejected {
		/// Endpoint that rejected the request.
		endpoint: Endpoint,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// OAuth `error` code, when the body carried one.
		oauth_error: Option<String>,
	},
	/// Endpoint responded with a body that could not be parsed.
	#[error("The {endpoint} endpoint returned a malformed response.")]
	MalformedResponse {
		/// Endpoint that produced the response.
		endpoint: Endpoint,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Endpoint responded in a way the broker cannot classify.
	#[error("The {endpoint} endpoint returned an unexpected response: {message}.")]
	Unexpected {
		/// Endpoint that produced the response.
		endpoint: Endpoint,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Summary of the failure.
		message: String,
	},
}
impl TokenRequestError {
	/// HTTP status attached to the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. }
			| Self::MalformedResponse { status, .. }
			| Self::Unexpected { status, .. } => *status,
		}
	}

	/// Endpoint that produced the failure.
	pub fn endpoint(&self) -> Endpoint {
		match self {
			Self::Rejected { endpoint, .. }
			| Self::MalformedResponse { endpoint, .. }
			| Self::Unexpected { endpoint, .. } => *endpoint,
		}
	}
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint being called.
		endpoint: Endpoint,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request did not complete within the configured timeout.
	#[error("Request to the {endpoint} endpoint timed out.")]
	Timeout {
		/// Endpoint being called.
		endpoint: Endpoint,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling a remote endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(endpoint: Endpoint, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}

/// Identity login failures raised while completing the authorization-code callback.
#[derive(Debug, ThisError)]
pub enum LoginError {
	/// Returned `state` does not match the one issued with the authorize URL.
	#[error("Login state mismatch.")]
	StateMismatch,
	/// Token endpoint response carried no `id_token`.
	#[error("Identity provider did not return an ID token.")]
	MissingIdToken,
	/// ID token is not a three-segment compact JWT.
	#[error("ID token is malformed.")]
	MalformedIdToken,
	/// ID token payload is not valid base64url.
	#[error("ID token payload is not valid base64url.")]
	IdTokenEncoding(#[source] base64::DecodeError),
	/// ID token claims could not be parsed.
	#[error("ID token claims could not be parsed.")]
	IdTokenClaims(#[source] serde_path_to_error::Error<serde_json::Error>),
}

fn status_suffix(status: &Option<u16>) -> String {
	status.map(|code| format!(" with HTTP {code}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rejected_display_includes_status_only_when_known() {
		let with_status = TokenRequestError::Rejected {
			endpoint: Endpoint::ServiceToken,
			status: Some(401),
			oauth_error: Some("invalid_client".into()),
		};
		let without_status =
			TokenRequestError::Rejected { endpoint: Endpoint::EmbedAuth, status: None, oauth_error: None };

		assert_eq!(
			with_status.to_string(),
			"The service_token endpoint rejected the request with HTTP 401."
		);
		assert_eq!(without_status.to_string(), "The embed_auth endpoint rejected the request.");
		assert_eq!(with_status.status(), Some(401));
		assert_eq!(without_status.endpoint(), Endpoint::EmbedAuth);
	}

	#[test]
	fn config_errors_never_render_secrets() {
		let err: Error =
			ConfigError::MissingClientSecret { client_id: "client-a".into() }.into();

		assert_eq!(err.to_string(), "Client secret is missing for analytics client `client-a`.");
	}
}
