//! Broker operations: credential resolution, service tokens, embed tokens, and login.

pub mod credentials;
pub mod embed_config;
pub mod embed_token;
pub mod login;

mod service_token;

pub use credentials::*;
pub use embed_config::*;
pub use embed_token::*;
pub use login::*;

// self
use crate::{
	_prelude::*,
	cache::ServiceTokenCache,
	config::BrokerConfig,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	registry::CredentialRegistry,
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestEmbedBroker = EmbedBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Brokers analytics service tokens and embed tokens on behalf of signed-in users.
///
/// The broker owns the HTTP transport, the immutable configuration, the credential registry, and
/// a handle to the service-token cache. Cloning is cheap and every clone shares the same cache,
/// so one broker (or its clones) should serve the whole process.
#[derive(Clone)]
pub struct EmbedBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Process configuration.
	pub config: Arc<BrokerConfig>,
	/// Email-to-credentials registry.
	pub registry: Arc<CredentialRegistry>,
	/// Service-token cache keyed by client identifier.
	pub token_cache: Arc<ServiceTokenCache>,
}
impl<C, M> EmbedBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport + mapper pair and cache.
	pub fn with_http_client(
		config: impl Into<Arc<BrokerConfig>>,
		registry: impl Into<Arc<CredentialRegistry>>,
		token_cache: Arc<ServiceTokenCache>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			config: config.into(),
			registry: registry.into(),
			token_cache,
		}
	}
}
#[cfg(feature = "reqwest")]
impl EmbedBroker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a broker with its own reqwest transport and an empty token cache.
	///
	/// The transport disables redirects and applies [`BrokerConfig::request_timeout`] to every
	/// request.
	pub fn new(config: BrokerConfig, registry: CredentialRegistry) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(config.request_timeout())?;

		Ok(Self::with_http_client(
			config,
			registry,
			Arc::new(ServiceTokenCache::new()),
			http_client,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}

	/// Loads [`BrokerConfig::from_env`], reads the registry at `registry_path` (empty when
	/// unset), and builds the default transport.
	pub fn from_env() -> Result<Self> {
		let config = BrokerConfig::from_env()?;
		let registry = match &config.registry_path {
			Some(path) => CredentialRegistry::load(path).map_err(ConfigError::from)?,
			None => CredentialRegistry::default(),
		};

		Self::new(config, registry)
	}
}
impl<C, M> Debug for EmbedBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EmbedBroker")
			.field("api_host", &self.config.api_host.as_str())
			.field("embed_host", &self.config.embed_host.as_str())
			.field("fallback_client_id", &self.config.client_id)
			.field("registry_entries", &self.registry.len())
			.field("cached_tokens", &self.token_cache.len())
			.field("login_configured", &self.config.identity.is_some())
			.finish()
	}
}
