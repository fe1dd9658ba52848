//! Embed-auth exchange: one short-lived embed token per embed identifier.
//!
//! Embed tokens are never cached; every call reaches the analytics platform.

// crates.io
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::{Secret, ServiceToken},
	error::ConfigError,
	flows::EmbedBroker,
	http::{Endpoint, TokenHttpClient},
	oauth::{self, JSON, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Permission granted to the viewer on an embedded dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EmbedPermission {
	/// View the dashboard.
	Read,
	/// Apply interactive filters.
	Filter,
	/// Export data.
	Export,
}

/// Permissions requested for every embed token.
pub const EMBED_PERMISSIONS: [EmbedPermission; 3] =
	[EmbedPermission::Read, EmbedPermission::Filter, EmbedPermission::Export];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedAuthRequest<'a> {
	session_length: u64,
	authorizations: [EmbedAuthorization<'a>; 1],
}

#[derive(Debug, Serialize)]
struct EmbedAuthorization<'a> {
	token: &'a str,
	permissions: [EmbedPermission; 3],
	filters: [(); 0],
}

#[derive(Debug, Deserialize)]
struct EmbedAuthResponse {
	#[serde(default)]
	authentication: Option<String>,
}

impl<C, M> EmbedBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges `service_token` for an embed token scoped to `embed_id`, using the configured
	/// session length.
	///
	/// Returns `Ok(None)` when the platform answers without an `authentication` value.
	pub async fn embed_token(
		&self,
		service_token: &ServiceToken,
		embed_id: &str,
	) -> Result<Option<Secret>> {
		self.embed_token_for_session(service_token, embed_id, self.config.session_minutes).await
	}

	/// Same as [`EmbedBroker::embed_token`] with an explicit session length in minutes.
	pub async fn embed_token_for_session(
		&self,
		service_token: &ServiceToken,
		embed_id: &str,
		session_minutes: u32,
	) -> Result<Option<Secret>> {
		const KIND: FlowKind = FlowKind::EmbedToken;

		let span = FlowSpan::new(KIND, "embed_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(self.request_embed_token(service_token, embed_id, session_minutes))
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn request_embed_token(
		&self,
		service_token: &ServiceToken,
		embed_id: &str,
		session_minutes: u32,
	) -> Result<Option<Secret>> {
		const ENDPOINT: Endpoint = Endpoint::EmbedAuth;

		if embed_id.is_empty() {
			return Err(Error::InvalidArgument { argument: "embed_id", reason: "must not be empty" });
		}

		let body = EmbedAuthRequest {
			session_length: u64::from(session_minutes) * 60,
			authorizations: [EmbedAuthorization {
				token: embed_id,
				permissions: EMBED_PERMISSIONS,
				filters: [],
			}],
		};
		let body = serde_json::to_vec(&body).map_err(ConfigError::RequestEncoding)?;
		let request = Request::builder()
			.method(Method::POST)
			.uri(self.config.embed_auth_url()?.as_str())
			.header(AUTHORIZATION, format!("Bearer {}", service_token.access_token.expose()))
			.header(ACCEPT, JSON)
			.header(CONTENT_TYPE, JSON)
			.body(body)
			.map_err(ConfigError::from)?;
		let response = oauth::dispatch(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			ENDPOINT,
			request,
		)
		.await?;

		if !response.status().is_success() {
			return Err(oauth::rejection(ENDPOINT, &response));
		}

		let parsed: EmbedAuthResponse = oauth::parse_json(ENDPOINT, &response)?;

		Ok(parsed.authentication.filter(|token| !token.is_empty()).map(Secret::from))
	}
}
