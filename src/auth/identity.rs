//! Signed-in user identity attached to a web session.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, error::LoginError};

/// Identity fields read from the session after a successful login.
///
/// Unknown claims are ignored when deserializing, so the struct can be built straight from
/// ID-token claims or from whatever a web layer stored in its session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
	/// `preferred_username` claim; takes precedence over `email` for registry lookups.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub preferred_username: Option<String>,
	/// `email` claim.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}
impl SessionUser {
	/// Builds a user identified only by email.
	pub fn with_email(email: impl Into<String>) -> Self {
		Self { email: Some(email.into()), ..Default::default() }
	}

	/// Email used for registry lookups: a non-empty `preferred_username`, else a non-empty
	/// `email`.
	pub fn login_email(&self) -> Option<&str> {
		self.preferred_username
			.as_deref()
			.filter(|value| !value.is_empty())
			.or_else(|| self.email.as_deref().filter(|value| !value.is_empty()))
	}

	/// Decodes the claims segment of a compact JWT ID token.
	///
	/// The signature is not checked: the token must come straight from the identity provider's
	/// token endpoint over TLS.
	pub fn from_id_token(id_token: &str) -> Result<Self, LoginError> {
		let mut segments = id_token.split('.');
		let (Some(_header), Some(payload), Some(_signature), None) =
			(segments.next(), segments.next(), segments.next(), segments.next())
		else {
			return Err(LoginError::MalformedIdToken);
		};
		let bytes = URL_SAFE_NO_PAD
			.decode(payload.trim_end_matches('='))
			.map_err(LoginError::IdTokenEncoding)?;
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut deserializer).map_err(LoginError::IdTokenClaims)
	}
}
