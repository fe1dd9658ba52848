// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, config::IdentityConfig, error::LoginError};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Supported PKCE challenge methods surfaced via [`LoginSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Pending login returned by [`EmbedBroker::start_login`].
///
/// A web layer parks the whole value in the visitor's session (it serializes, PKCE verifier
/// included) and hands it back to [`EmbedBroker::complete_login`] on the callback.
///
/// [`EmbedBroker::start_login`]: crate::flows::EmbedBroker::start_login
/// [`EmbedBroker::complete_login`]: crate::flows::EmbedBroker::complete_login
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginSession {
	/// Opaque state value that must round-trip via the redirect handler.
	pub state: String,
	/// Redirect URI supplied when constructing the authorize URL.
	pub redirect_uri: Url,
	/// Fully-formed authorize URL that callers should send the visitor to.
	pub authorize_url: Url,
	pkce: PkcePair,
}
impl LoginSession {
	/// PKCE code challenge derived from the secret verifier.
	pub fn code_challenge(&self) -> &str {
		&self.pkce.challenge
	}

	/// PKCE challenge method (currently always `S256`).
	pub fn code_challenge_method(&self) -> PkceCodeChallengeMethod {
		self.pkce.method
	}

	/// Validates the returned `state` parameter after the authorization redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<(), LoginError> {
		if returned_state == self.state { Ok(()) } else { Err(LoginError::StateMismatch) }
	}

	pub(super) fn pkce_verifier(&self) -> &str {
		&self.pkce.verifier
	}
}
impl Debug for LoginSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginSession")
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.field("code_challenge", &self.pkce.challenge)
			.field("code_challenge_method", &self.pkce.method)
			.finish()
	}
}

#[derive(Clone, Serialize, Deserialize)]
struct PkcePair {
	verifier: String,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}

pub(super) fn build_session(identity: &IdentityConfig, authorize_endpoint: Url) -> LoginSession {
	let state = random_string(STATE_LEN);
	let pkce = PkcePair::generate();
	let redirect_uri = identity.redirect_uri.clone();
	let authorize_url = build_authorize_url(authorize_endpoint, identity, &state, &pkce);

	LoginSession { state, redirect_uri, authorize_url, pkce }
}

fn build_authorize_url(
	mut url: Url,
	identity: &IdentityConfig,
	state: &str,
	pkce: &PkcePair,
) -> Url {
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", &identity.client_id);
	pairs.append_pair("redirect_uri", identity.redirect_uri.as_str());

	let scope = identity.scope.split_whitespace().collect::<Vec<_>>().join(" ");

	if !scope.is_empty() {
		pairs.append_pair("scope", &scope);
	}

	pairs.append_pair("state", state);
	pairs.append_pair("code_challenge", &pkce.challenge);
	pairs.append_pair("code_challenge_method", pkce.method.as_str());

	drop(pairs);

	url
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
