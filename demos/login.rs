//! Demonstrates the identity login round trip: build the authorize URL, then exchange the
//! callback's code for the signed-in user.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use embed_broker::{
	config::{BrokerConfig, IdentityConfig},
	flows::ReqwestEmbedBroker,
	registry::CredentialRegistry,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let claims = URL_SAFE_NO_PAD.encode(r#"{"preferred_username":"analyst@example.com","name":"Analyst"}"#);
	let body = format!(
		"{{\"access_token\":\"idp-access\",\"token_type\":\"bearer\",\"expires_in\":3600,\"id_token\":\"eyJhbGciOiJub25lIn0.{claims}.sig\"}}"
	);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/tenant/oauth2/v2.0/token");
			then.status(200).header("content-type", "application/json").body(body.as_str());
		})
		.await;
	let identity = IdentityConfig::new(
		Url::parse(&server.url("/tenant"))?,
		"demo-login-client",
		Url::parse("https://app.example.com/auth/callback")?,
	)
	.with_client_secret("demo-login-secret");
	let config =
		BrokerConfig::new(Url::parse(&server.base_url())?, Url::parse("https://embed.example.com")?)
			.with_identity(identity);
	let broker = ReqwestEmbedBroker::new(config, CredentialRegistry::default())?;
	let session = broker.start_login()?;

	println!("Send the visitor to: {}.", session.authorize_url);

	// The identity provider redirects back with the same state and a one-time code.
	let state = session.state.clone();
	let user = broker.complete_login(session, &state, "demo-code").await?;

	println!("Signed in as {:?}.", user.login_email());

	token_mock.assert_async().await;

	Ok(())
}
