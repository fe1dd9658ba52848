//! Per-session credential resolution and embed permissions.
//!
//! The first registry record matching the user's login email supplies the client credentials;
//! every matching record contributes an embed id. Users without a record fall back to the
//! configured client and, only when [`BrokerConfig::grant_default_embeds`] is set, to the
//! configured default embeds.
//!
//! [`BrokerConfig::grant_default_embeds`]: crate::config::BrokerConfig::grant_default_embeds

// self
use crate::{
	_prelude::*,
	auth::{ClientId, EmbedId, Secret, SessionUser},
	error::ConfigError,
	flows::EmbedBroker,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
};

/// Where resolved credentials came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
	/// The user's first registry record.
	Registry,
	/// The process-wide fallback client.
	Fallback,
}

/// Client credentials selected for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCredentials {
	/// Client identifier; also the service-token cache key.
	pub client_id: ClientId,
	/// Secret paired with `client_id`; a missing secret fails the token request.
	pub client_secret: Option<Secret>,
	/// Origin of the credentials.
	pub source: CredentialSource,
}

impl<C, M> EmbedBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Chooses the client credentials that apply to `user`.
	///
	/// A registry record with a client identifier wins; otherwise the configured fallback
	/// client is used. Fails with [`ConfigError::NoClientCredentials`] when neither exists.
	pub fn resolve_credentials(&self, user: Option<&SessionUser>) -> Result<ResolvedCredentials> {
		let registered = user
			.and_then(SessionUser::login_email)
			.and_then(|email| self.registry.first_match(email))
			.and_then(|entry| entry.client_id.as_ref().map(|client_id| (client_id, entry)));

		if let Some((client_id, entry)) = registered {
			return Ok(ResolvedCredentials {
				client_id: client_id.clone(),
				client_secret: entry.client_secret.clone(),
				source: CredentialSource::Registry,
			});
		}

		match &self.config.client_id {
			Some(client_id) => Ok(ResolvedCredentials {
				client_id: client_id.clone(),
				client_secret: self.config.client_secret.clone(),
				source: CredentialSource::Fallback,
			}),
			None => Err(ConfigError::NoClientCredentials.into()),
		}
	}

	/// Embed identifiers `user` may view, in registry order.
	///
	/// Anonymous users and users without a login email get nothing.
	pub fn permitted_embeds(&self, user: Option<&SessionUser>) -> Vec<EmbedId> {
		let Some(email) = user.and_then(SessionUser::login_email) else {
			return Vec::new();
		};
		let ids = self.registry.embed_ids_for(email);

		if ids.is_empty() && self.config.grant_default_embeds {
			return self.config.default_embed_ids.clone();
		}

		ids
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		registry::{CredentialRegistry, RegistryEntry},
	};

	fn client(id: &str) -> ClientId {
		ClientId::new(id).expect("Client fixture should be valid.")
	}

	fn embed(id: &str) -> EmbedId {
		EmbedId::new(id).expect("Embed fixture should be valid.")
	}

	fn registry() -> CredentialRegistry {
		CredentialRegistry::from_entries([
			RegistryEntry::new("a@b.com", embed("E1")).with_credentials(client("client-a"), "secret-a"),
			RegistryEntry::new("A@B.com", embed("E2")),
			RegistryEntry::new("nocreds@b.com", embed("E3")),
		])
	}

	#[test]
	fn registry_credentials_win_over_fallback() {
		let config = test_config("https://api.example.com")
			.with_fallback_credentials(client("fallback"), "fallback-secret");
		let (broker, _) = build_reqwest_test_broker(config, registry());
		let user = SessionUser::with_email("A@b.COM");
		let resolved = broker.resolve_credentials(Some(&user)).expect("Credentials should resolve.");

		assert_eq!(resolved.client_id, client("client-a"));
		assert_eq!(resolved.client_secret.as_ref().map(Secret::expose), Some("secret-a"));
		assert_eq!(resolved.source, CredentialSource::Registry);
	}

	#[test]
	fn records_without_client_fall_back() {
		let config = test_config("https://api.example.com")
			.with_fallback_credentials(client("fallback"), "fallback-secret");
		let (broker, _) = build_reqwest_test_broker(config, registry());

		for user in [None, Some(SessionUser::with_email("nocreds@b.com")), Some(SessionUser::default())]
		{
			let resolved =
				broker.resolve_credentials(user.as_ref()).expect("Fallback should resolve.");

			assert_eq!(resolved.client_id, client("fallback"));
			assert_eq!(resolved.source, CredentialSource::Fallback);
		}
	}

	#[test]
	fn missing_credentials_are_configuration_errors() {
		let (broker, _) = build_reqwest_test_broker(test_config("https://api.example.com"), registry());
		let user = SessionUser::with_email("nocreds@b.com");
		let err = broker
			.resolve_credentials(Some(&user))
			.expect_err("Resolution without any client must fail.");

		assert!(matches!(err, Error::Config(ConfigError::NoClientCredentials)));
	}

	#[test]
	fn permitted_embeds_follow_registry_order() {
		let (broker, _) = build_reqwest_test_broker(test_config("https://api.example.com"), registry());
		let user = SessionUser::with_email("a@B.com");

		assert_eq!(broker.permitted_embeds(Some(&user)), [embed("E1"), embed("E2")]);
		assert!(broker.permitted_embeds(None).is_empty());
		assert!(broker.permitted_embeds(Some(&SessionUser::default())).is_empty());
		assert!(broker.permitted_embeds(Some(&SessionUser::with_email("x@y.com"))).is_empty());
	}

	#[test]
	fn default_embeds_require_opt_in() {
		let config = test_config("https://api.example.com").with_default_embeds([embed("D1")]);
		let (broker, _) = build_reqwest_test_broker(config, registry());
		let stranger = SessionUser::with_email("x@y.com");

		assert_eq!(broker.permitted_embeds(Some(&stranger)), [embed("D1")]);
		assert!(broker.permitted_embeds(None).is_empty());

		let mut config = test_config("https://api.example.com").with_default_embeds([embed("D1")]);

		config.grant_default_embeds = false;

		let (broker, _) = build_reqwest_test_broker(config, registry());

		assert!(broker.permitted_embeds(Some(&stranger)).is_empty());
	}
}
