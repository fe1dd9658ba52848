//! Immutable process configuration sourced from `EMBED_BROKER_*` environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `EMBED_BROKER_API_HOST` | required |
//! | `EMBED_BROKER_EMBED_HOST` | required |
//! | `EMBED_BROKER_CLIENT_ID`, `EMBED_BROKER_CLIENT_SECRET` | unset |
//! | `EMBED_BROKER_CARD_TARGET` | `cards` |
//! | `EMBED_BROKER_SCOPE` | `data user dashboard` |
//! | `EMBED_BROKER_SESSION_MINUTES` | `60` |
//! | `EMBED_BROKER_REQUEST_TIMEOUT_SECS` | `10` |
//! | `EMBED_BROKER_DEFAULT_EMBED_IDS` (comma separated) | empty |
//! | `EMBED_BROKER_GRANT_DEFAULT_EMBEDS` | `false` |
//! | `EMBED_BROKER_REGISTRY_PATH` | unset |
//! | `EMBED_BROKER_IDENTITY__AUTHORITY`, `__CLIENT_ID`, `__CLIENT_SECRET`, `__REDIRECT_URI`, `__SCOPE`, `__AUTHORIZE_PATH`, `__TOKEN_PATH` | unset |

// crates.io
use ::config::{Config, Environment};
use serde::{Deserializer, de::Error as DeError};
// self
use crate::{
	_prelude::*,
	auth::{self, ClientId, EmbedId, Secret},
	error::ConfigError,
	http::Endpoint,
};

const ENV_PREFIX: &str = "EMBED_BROKER";

/// Broker configuration, built once at startup and shared behind an [`Arc`].
#[derive(Clone, Debug, Deserialize)]
pub struct BrokerConfig {
	/// Analytics API base URL; hosts `/oauth/token` and the embed-auth endpoint.
	pub api_host: Url,
	/// Embed host handed to the page renderer alongside embed tokens.
	pub embed_host: Url,
	/// Fallback client identifier used when the registry has no override for a user.
	#[serde(default, deserialize_with = "auth::blank_as_none")]
	pub client_id: Option<ClientId>,
	/// Secret paired with the fallback client identifier.
	#[serde(default, deserialize_with = "auth::blank_as_none")]
	pub client_secret: Option<Secret>,
	/// Path segment of the embed-auth endpoint (`cards` or `stories`).
	#[serde(default = "default_card_target")]
	pub card_target: String,
	/// Space-delimited scope requested with the client-credentials grant.
	#[serde(default = "default_scope")]
	pub scope: String,
	/// Embed session length declared to the analytics platform, in minutes.
	#[serde(default = "default_session_minutes")]
	pub session_minutes: u32,
	/// Per-request timeout for every outbound call, in seconds.
	#[serde(default = "default_request_timeout_secs")]
	pub request_timeout_secs: u64,
	/// Embeds granted to signed-in users without a registry record, when enabled.
	#[serde(default, deserialize_with = "embed_id_list")]
	pub default_embed_ids: Vec<EmbedId>,
	/// Grants `default_embed_ids` to unlisted signed-in users instead of denying them.
	#[serde(default)]
	pub grant_default_embeds: bool,
	/// Credential registry JSON file; unset means an empty registry.
	#[serde(default)]
	pub registry_path: Option<PathBuf>,
	/// Identity provider used for end-user login.
	#[serde(default)]
	pub identity: Option<IdentityConfig>,
}
impl BrokerConfig {
	/// Creates a configuration with defaults for everything but the two hosts.
	pub fn new(api_host: Url, embed_host: Url) -> Self {
		Self {
			api_host,
			embed_host,
			client_id: None,
			client_secret: None,
			card_target: default_card_target(),
			scope: default_scope(),
			session_minutes: default_session_minutes(),
			request_timeout_secs: default_request_timeout_secs(),
			default_embed_ids: Vec::new(),
			grant_default_embeds: false,
			registry_path: None,
			identity: None,
		}
	}

	/// Loads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_environment(Self::environment())
	}

	/// Loads the configuration from an explicit variable map instead of the process environment.
	pub fn from_env_map(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
		Self::from_environment(Self::environment().source(Some(vars.into_iter().collect())))
	}

	fn environment() -> Environment {
		Environment::with_prefix(ENV_PREFIX)
			.prefix_separator("_")
			.separator("__")
	}

	fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
		Ok(Config::builder().add_source(environment).build()?.try_deserialize()?)
	}

	/// Sets the fallback client credentials.
	pub fn with_fallback_credentials(
		mut self,
		client_id: ClientId,
		client_secret: impl Into<Secret>,
	) -> Self {
		self.client_id = Some(client_id);
		self.client_secret = Some(client_secret.into());

		self
	}

	/// Overrides the embed-auth path segment.
	pub fn with_card_target(mut self, card_target: impl Into<String>) -> Self {
		self.card_target = card_target.into();

		self
	}

	/// Overrides the client-credentials scope.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}

	/// Overrides the default embed session length.
	pub fn with_session_minutes(mut self, minutes: u32) -> Self {
		self.session_minutes = minutes;

		self
	}

	/// Grants `ids` to signed-in users that have no registry record.
	pub fn with_default_embeds(mut self, ids: impl IntoIterator<Item = EmbedId>) -> Self {
		self.default_embed_ids = ids.into_iter().collect();
		self.grant_default_embeds = true;

		self
	}

	/// Attaches an identity provider for end-user login.
	pub fn with_identity(mut self, identity: IdentityConfig) -> Self {
		self.identity = Some(identity);

		self
	}

	/// `{api_host}/oauth/token`.
	pub fn token_url(&self) -> Result<Url, ConfigError> {
		join_endpoint(&self.api_host, "oauth/token", Endpoint::ServiceToken)
	}

	/// `{api_host}/v1/{card_target}/embed/auth`.
	pub fn embed_auth_url(&self) -> Result<Url, ConfigError> {
		let path = format!("v1/{}/embed/auth", self.card_target.trim_matches('/'));

		join_endpoint(&self.api_host, &path, Endpoint::EmbedAuth)
	}

	/// Scopes requested with the client-credentials grant.
	pub fn scopes(&self) -> Vec<&str> {
		self.scope.split_whitespace().collect()
	}

	/// Per-request timeout for the HTTP transport.
	pub fn request_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.request_timeout_secs)
	}
}

/// Identity provider settings for the authorization-code login.
#[derive(Clone, Debug, Deserialize)]
pub struct IdentityConfig {
	/// Authority base URL, e.g. `https://login.microsoftonline.com/<tenant>`.
	pub authority: Url,
	/// Application (client) identifier registered with the identity provider.
	pub client_id: String,
	/// Confidential client secret, sent with HTTP Basic during the code exchange.
	#[serde(default, deserialize_with = "auth::blank_as_none")]
	pub client_secret: Option<Secret>,
	/// Redirect URI registered for the login callback.
	pub redirect_uri: Url,
	/// Space-delimited scopes requested at login.
	#[serde(default = "default_login_scope")]
	pub scope: String,
	/// Authorization endpoint path relative to `authority`.
	#[serde(default = "default_authorize_path")]
	pub authorize_path: String,
	/// Token endpoint path relative to `authority`.
	#[serde(default = "default_login_token_path")]
	pub token_path: String,
}
impl IdentityConfig {
	/// Creates identity settings with the default scope and endpoint paths.
	pub fn new(authority: Url, client_id: impl Into<String>, redirect_uri: Url) -> Self {
		Self {
			authority,
			client_id: client_id.into(),
			client_secret: None,
			redirect_uri,
			scope: default_login_scope(),
			authorize_path: default_authorize_path(),
			token_path: default_login_token_path(),
		}
	}

	/// Sets the confidential client secret.
	pub fn with_client_secret(mut self, secret: impl Into<Secret>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// `{authority}/{authorize_path}`.
	pub fn authorize_url(&self) -> Result<Url, ConfigError> {
		join_endpoint(&self.authority, &self.authorize_path, Endpoint::LoginAuthorize)
	}

	/// `{authority}/{token_path}`.
	pub fn token_url(&self) -> Result<Url, ConfigError> {
		join_endpoint(&self.authority, &self.token_path, Endpoint::LoginToken)
	}
}

fn join_endpoint(base: &Url, path: &str, endpoint: Endpoint) -> Result<Url, ConfigError> {
	let raw = format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'));

	Url::parse(&raw).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
}

/// Accepts a comma separated string (environment) or a sequence of embed ids.
///
/// Environment values stay strings end to end so credentials such as `007` are never coerced
/// into numbers.
fn embed_id_list<'de, D>(deserializer: D) -> Result<Vec<EmbedId>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum RawList {
		Joined(String),
		Items(Vec<EmbedId>),
	}

	match RawList::deserialize(deserializer)? {
		RawList::Joined(raw) => raw
			.split(',')
			.map(str::trim)
			.filter(|item| !item.is_empty())
			.map(EmbedId::new)
			.collect::<Result<_, _>>()
			.map_err(DeError::custom),
		RawList::Items(ids) => Ok(ids),
	}
}

fn default_card_target() -> String {
	"cards".into()
}

fn default_scope() -> String {
	"data user dashboard".into()
}

fn default_session_minutes() -> u32 {
	60
}

fn default_request_timeout_secs() -> u64 {
	10
}

fn default_login_scope() -> String {
	"openid profile email".into()
}

fn default_authorize_path() -> String {
	"oauth2/v2.0/authorize".into()
}

fn default_login_token_path() -> String {
	"oauth2/v2.0/token".into()
}
