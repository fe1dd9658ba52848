//! Embed configuration handed to the page renderer.

// self
use crate::{
	_prelude::*,
	auth::{EmbedId, Secret, SessionUser},
	flows::EmbedBroker,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// One permitted embed and the token that unlocks it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedGrant {
	/// Embed identifier.
	pub id: EmbedId,
	/// Embed token, or `None` when the platform returned no `authentication` value.
	pub token: Option<Secret>,
}

/// Everything a page needs to render a user's embedded dashboards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedConfiguration {
	/// Host serving the embedded dashboards.
	pub embed_host: Url,
	/// Grants in registry order.
	pub grants: Vec<EmbedGrant>,
}

impl<C, M> EmbedBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds the embed configuration for `user`.
	///
	/// Returns `Ok(None)` without any network traffic when the user may view nothing. Otherwise
	/// one service token is obtained and exchanged for one embed token per permitted embed, in
	/// order. The first failure aborts the whole configuration.
	pub async fn embed_configuration(
		&self,
		user: Option<&SessionUser>,
	) -> Result<Option<EmbedConfiguration>> {
		const KIND: FlowKind = FlowKind::EmbedConfiguration;

		let span = FlowSpan::new(KIND, "embed_configuration");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let embed_ids = self.permitted_embeds(user);

				if embed_ids.is_empty() {
					return Ok(None);
				}

				let credentials = self.resolve_credentials(user)?;
				let service_token = self.service_token(&credentials).await?;
				let mut grants = Vec::with_capacity(embed_ids.len());

				for id in embed_ids {
					let token = self.embed_token(&service_token, &id).await?;

					grants.push(EmbedGrant { id, token });
				}

				Ok(Some(EmbedConfiguration { embed_host: self.config.embed_host.clone(), grants }))
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
