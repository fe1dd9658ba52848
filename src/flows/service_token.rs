//! Client-credentials service tokens, served from the per-client cache.

// self
use crate::{
	_prelude::*,
	auth::{ServiceToken, SessionUser},
	error::ConfigError,
	flows::{EmbedBroker, ResolvedCredentials},
	http::TokenHttpClient,
	oauth::{ServiceTokenFacade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl<C, M> EmbedBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a service token for `credentials`, reusing a cached one while it is fresh.
	///
	/// Concurrent misses for the same client identifier share a single token request. Failures
	/// are never retried and leave the cache as it was.
	pub async fn service_token(&self, credentials: &ResolvedCredentials) -> Result<ServiceToken> {
		const KIND: FlowKind = FlowKind::ServiceToken;

		let span = FlowSpan::new(KIND, "service_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(
				self.token_cache.get_or_fetch(&credentials.client_id, || {
					self.request_service_token(credentials)
				}),
			)
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Resolves credentials for `user` and returns their service token.
	pub async fn service_token_for(&self, user: Option<&SessionUser>) -> Result<ServiceToken> {
		let credentials = self.resolve_credentials(user)?;

		self.service_token(&credentials).await
	}

	async fn request_service_token(&self, credentials: &ResolvedCredentials) -> Result<ServiceToken> {
		let client_secret = credentials.client_secret.as_ref().ok_or_else(|| {
			ConfigError::MissingClientSecret { client_id: credentials.client_id.to_string() }
		})?;
		let facade: ServiceTokenFacade<C, M> = ServiceTokenFacade::new(
			self.config.token_url()?,
			&credentials.client_id,
			client_secret,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		);

		facade.exchange_client_credentials(&self.config.scopes()).await
	}
}
