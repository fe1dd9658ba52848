//! Demonstrates building a signed-in user's embed configuration against a mocked analytics API.
//!
//! The registry grants two embeds to one user; the broker fetches a single service token with the
//! fallback client and exchanges it for one embed token per embed.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use embed_broker::{
	auth::{ClientId, SessionUser},
	cache::ServiceTokenCache,
	config::BrokerConfig,
	flows::EmbedBroker,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	registry::CredentialRegistry,
};

const REGISTRY: &str = r#"[
	{ "email": "analyst@example.com", "embed_id": "sales-overview" },
	{ "email": "analyst@example.com", "embed_id": "pipeline" }
]"#;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-service\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let embed_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/cards/embed/auth");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"authentication\":\"demo-embed\"}");
		})
		.await;
	let config =
		BrokerConfig::new(Url::parse(&server.base_url())?, Url::parse("https://embed.example.com")?)
			.with_fallback_credentials(ClientId::new("demo-client")?, "demo-secret");
	let registry = CredentialRegistry::from_json_slice(REGISTRY.as_bytes())?;
	let cache = Arc::new(ServiceTokenCache::new());
	let broker = <EmbedBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>>::with_http_client(
		config,
		registry,
		cache.clone(),
		ReqwestHttpClient::with_timeout(std::time::Duration::from_secs(5))?,
		Arc::new(ReqwestTransportErrorMapper),
	);
	let user = SessionUser::with_email("Analyst@Example.com");

	for _ in 0..2 {
		let configuration = broker.embed_configuration(Some(&user)).await?;

		println!("Embed configuration: {}.", serde_json::to_string_pretty(&configuration)?);
	}

	println!("Cached service tokens: {}.", cache.len());

	token_mock.assert_calls_async(1).await;
	embed_mock.assert_calls_async(4).await;

	Ok(())
}
