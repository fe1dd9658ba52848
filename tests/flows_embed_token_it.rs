#![cfg(all(feature = "reqwest", feature = "test"))]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use embed_broker::{
	_preludet::*,
	auth::{ClientId, ServiceToken},
	error::TokenRequestError,
	http::Endpoint,
	registry::CredentialRegistry,
};

fn service_token() -> ServiceToken {
	ServiceToken::new(
		ClientId::new("client-a").expect("Client identifier fixture should be valid."),
		"service-token",
		OffsetDateTime::now_utc(),
		Duration::minutes(5),
	)
}

#[tokio::test]
async fn embed_token_posts_authorization_request() {
	let server = MockServer::start_async().await;
	let (broker, _cache) =
		build_reqwest_test_broker(test_config(&server.base_url()), CredentialRegistry::default());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1/cards/embed/auth")
				.header("authorization", "Bearer service-token")
				.header("content-type", "application/json")
				.json_body(json!({
					"sessionLength": 3600,
					"authorizations": [{
						"token": "E1",
						"permissions": ["READ", "FILTER", "EXPORT"],
						"filters": []
					}]
				}));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"authentication\":\"embed-token-1\"}");
		})
		.await;
	let token = broker
		.embed_token(&service_token(), "E1")
		.await
		.expect("Embed token request should succeed.")
		.expect("Embed token should be present.");

	assert_eq!(token.expose(), "embed-token-1");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn embed_token_is_never_cached() {
	let server = MockServer::start_async().await;
	let config = test_config(&server.base_url()).with_card_target("stories");
	let (broker, _cache) = build_reqwest_test_broker(config, CredentialRegistry::default());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/stories/embed/auth");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"authentication\":\"embed-token\"}");
		})
		.await;
	let service_token = service_token();

	for _ in 0..2 {
		broker
			.embed_token(&service_token, "E1")
			.await
			.expect("Embed token request should succeed.");
	}

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn embed_token_session_length_can_be_overridden() {
	let server = MockServer::start_async().await;
	let (broker, _cache) =
		build_reqwest_test_broker(test_config(&server.base_url()), CredentialRegistry::default());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/cards/embed/auth").body_includes("\"sessionLength\":900");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"authentication\":\"short-session\"}");
		})
		.await;
	let token = broker
		.embed_token_for_session(&service_token(), "E1", 15)
		.await
		.expect("Embed token request should succeed.");

	assert_eq!(token.as_ref().map(|token| token.expose()), Some("short-session"));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn empty_embed_id_is_rejected_before_network() {
	let server = MockServer::start_async().await;
	let (broker, _cache) =
		build_reqwest_test_broker(test_config(&server.base_url()), CredentialRegistry::default());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/cards/embed/auth");
			then.status(200).body("{\"authentication\":\"unused\"}");
		})
		.await;
	let err = broker
		.embed_token(&service_token(), "")
		.await
		.expect_err("Empty embed identifiers must be rejected.");

	assert!(matches!(err, Error::InvalidArgument { argument: "embed_id", .. }));

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn missing_or_empty_authentication_yields_none() {
	let server = MockServer::start_async().await;
	let (broker, _cache) =
		build_reqwest_test_broker(test_config(&server.base_url()), CredentialRegistry::default());
	let absent = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/cards/embed/auth").body_includes("\"token\":\"E1\"");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	let empty = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/cards/embed/auth").body_includes("\"token\":\"E2\"");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"authentication\":\"\"}");
		})
		.await;
	let service_token = service_token();

	assert!(
		broker
			.embed_token(&service_token, "E1")
			.await
			.expect("Absent authentication is not an error.")
			.is_none()
	);
	assert!(
		broker
			.embed_token(&service_token, "E2")
			.await
			.expect("Empty authentication is not an error.")
			.is_none()
	);

	absent.assert_calls_async(1).await;
	empty.assert_calls_async(1).await;
}

#[tokio::test]
async fn embed_rejection_and_malformed_bodies_are_token_request_errors() {
	let server = MockServer::start_async().await;
	let (broker, _cache) =
		build_reqwest_test_broker(test_config(&server.base_url()), CredentialRegistry::default());
	let forbidden = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/cards/embed/auth").body_includes("\"token\":\"E1\"");
			then.status(403).body("{\"message\":\"forbidden\"}");
		})
		.await;
	let malformed = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/cards/embed/auth").body_includes("\"token\":\"E2\"");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"authentication\":42}");
		})
		.await;
	let service_token = service_token();
	let rejected = broker
		.embed_token(&service_token, "E1")
		.await
		.expect_err("HTTP 403 should surface as a token request error.");

	assert!(matches!(
		rejected,
		Error::TokenRequest(TokenRequestError::Rejected {
			endpoint: Endpoint::EmbedAuth,
			status: Some(403),
			..
		})
	));

	let malformed_err = broker
		.embed_token(&service_token, "E2")
		.await
		.expect_err("Malformed bodies should surface as a token request error.");

	match malformed_err {
		Error::TokenRequest(TokenRequestError::MalformedResponse { source, .. }) => {
			assert_eq!(source.path().to_string(), "authentication");
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	forbidden.assert_calls_async(1).await;
	malformed.assert_calls_async(1).await;
}
