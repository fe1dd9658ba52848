//! End-user login against the configured identity provider (authorization code + PKCE).
//!
//! The broker only builds the authorize URL and performs the code exchange; storing the
//! [`LoginSession`] and the resulting [`SessionUser`] between requests is up to the web layer.

mod session;

pub use session::*;

// self
use crate::{
	_prelude::*,
	auth::SessionUser,
	config::IdentityConfig,
	error::{ConfigError, LoginError},
	flows::EmbedBroker,
	http::TokenHttpClient,
	oauth::{LoginFacade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl<C, M> EmbedBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Starts a login: generates state plus a PKCE pair and builds the authorize URL.
	pub fn start_login(&self) -> Result<LoginSession> {
		let identity = self.identity()?;

		Ok(session::build_session(identity, identity.authorize_url()?))
	}

	/// Completes a login from the callback's `state` and `code` parameters.
	///
	/// The returned user is read from the ID token's claims.
	pub async fn complete_login(
		&self,
		session: LoginSession,
		returned_state: &str,
		code: &str,
	) -> Result<SessionUser> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "complete_login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let identity = self.identity()?;

				session.validate_state(returned_state)?;

				if code.is_empty() {
					return Err(Error::InvalidArgument { argument: "code", reason: "must not be empty" });
				}

				let facade: LoginFacade<C, M> = LoginFacade::new(
					identity.token_url()?,
					&identity.client_id,
					identity.client_secret.as_ref(),
					self.http_client.clone(),
					self.transport_mapper.clone(),
				);
				let id_token = facade
					.exchange_code(
						code,
						session.pkce_verifier(),
						&session.redirect_uri,
						&identity.scope,
					)
					.await?
					.ok_or(LoginError::MissingIdToken)?;

				Ok(SessionUser::from_id_token(&id_token)?)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn identity(&self) -> Result<&IdentityConfig, ConfigError> {
		self.config.identity.as_ref().ok_or(ConfigError::LoginNotConfigured)
	}
}
