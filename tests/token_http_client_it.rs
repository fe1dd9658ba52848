// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
};
// crates.io
use parking_lot::Mutex;
// self
use embed_broker::{
	auth::{ClientId, EmbedId, SessionUser},
	cache::ServiceTokenCache,
	config::BrokerConfig,
	error::{ConfigError, Error, TokenRequestError, TransportError},
	flows::EmbedBroker,
	http::{Endpoint, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	oauth::{
		TransportErrorMapper,
		oauth2::{
			AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
			http::{Response, StatusCode},
		},
	},
	registry::{CredentialRegistry, RegistryEntry},
	url::Url,
};

#[derive(Debug)]
enum FakeTransportError {
	Reset,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Reset => write!(f, "Connection reset."),
		}
	}
}
impl StdError for FakeTransportError {}

/// Canned transport: answers by path suffix and records every requested path.
#[derive(Clone, Default)]
struct FakeHttpClient {
	routes: Arc<Vec<(&'static str, u16, &'static str)>>,
	requests: Arc<Mutex<Vec<String>>>,
	reset_with_status: Option<u16>,
}
impl FakeHttpClient {
	fn routes(routes: Vec<(&'static str, u16, &'static str)>) -> Self {
		Self { routes: Arc::new(routes), ..Default::default() }
	}

	fn resetting(status: u16) -> Self {
		Self { reset_with_status: Some(status), ..Default::default() }
	}

	fn requested_paths(&self) -> Vec<String> {
		self.requests.lock().clone()
	}
}
impl TokenHttpClient for FakeHttpClient {
	type Handle = FakeHttpHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHttpHandle { client: self.clone(), slot }
	}
}

struct FakeHttpHandle {
	client: FakeHttpClient,
	slot: ResponseMetadataSlot,
}
impl<'a> AsyncHttpClient<'a> for FakeHttpHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			assert!(
				self.slot.take().is_none(),
				"ResponseMetadataSlot must be clear before dispatching a request."
			);

			let path = request.uri().path().to_owned();

			self.client.requests.lock().push(path.clone());

			if let Some(status) = self.client.reset_with_status {
				self.slot.store(ResponseMetadata { status: Some(status) });

				return Err(HttpClientError::Reqwest(Box::new(FakeTransportError::Reset)));
			}

			let (status, body) = self
				.client
				.routes
				.iter()
				.find(|(suffix, _, _)| path.ends_with(suffix))
				.map(|(_, status, body)| (*status, *body))
				.unwrap_or((404, "{}"));

			self.slot.store(ResponseMetadata { status: Some(status) });

			Ok(Response::builder()
				.status(StatusCode::from_u16(status).expect("Fake status should be valid."))
				.header("content-type", "application/json")
				.body(body.as_bytes().to_vec())
				.expect("Fake response should build."))
		})
	}
}

#[derive(Clone, Default)]
struct RecordingTransportErrorMapper {
	metadata: Arc<Mutex<Vec<(Endpoint, Option<ResponseMetadata>)>>>,
}
impl RecordingTransportErrorMapper {
	fn recorded(&self) -> Vec<(Endpoint, Option<ResponseMetadata>)> {
		self.metadata.lock().clone()
	}
}
impl TransportErrorMapper<FakeTransportError> for RecordingTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<FakeTransportError>,
	) -> Error {
		self.metadata.lock().push((endpoint, meta.cloned()));

		match err {
			HttpClientError::Reqwest(inner) => TransportError::network(endpoint, *inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			other => TokenRequestError::Unexpected {
				endpoint,
				status: meta.and_then(|value| value.status),
				message: format!("{other:?}"),
			}
			.into(),
		}
	}
}

type FakeBroker = EmbedBroker<FakeHttpClient, RecordingTransportErrorMapper>;

fn build_broker(http_client: FakeHttpClient, mapper: RecordingTransportErrorMapper) -> FakeBroker {
	let config = BrokerConfig::new(
		Url::parse("https://analytics.example.com").expect("API host should parse."),
		Url::parse("https://embed.example.com").expect("Embed host should parse."),
	);
	let registry = CredentialRegistry::from_entries([
		RegistryEntry::new("u@x.com", EmbedId::new("E1").expect("Embed fixture should be valid."))
			.with_credentials(
				ClientId::new("client-a").expect("Client fixture should be valid."),
				"secret-a",
			),
		RegistryEntry::new("u@x.com", EmbedId::new("E2").expect("Embed fixture should be valid.")),
	]);

	EmbedBroker::with_http_client(
		config,
		registry,
		Arc::new(ServiceTokenCache::new()),
		Arc::new(http_client),
		Arc::new(mapper),
	)
}

#[tokio::test]
async fn custom_transport_serves_every_broker_call() {
	let http_client = FakeHttpClient::routes(vec![
		(
			"/oauth/token",
			200,
			r#"{"access_token":"fake-service","token_type":"bearer","expires_in":600}"#,
		),
		("/embed/auth", 200, r#"{"authentication":"fake-embed"}"#),
	]);
	let broker = build_broker(http_client.clone(), RecordingTransportErrorMapper::default());
	let configuration = broker
		.embed_configuration(Some(&SessionUser::with_email("u@x.com")))
		.await
		.expect("Fake transport should serve the configuration.")
		.expect("Registered user should receive a configuration.");

	assert_eq!(configuration.grants.len(), 2);
	assert!(
		configuration
			.grants
			.iter()
			.all(|grant| grant.token.as_ref().map(|token| token.expose()) == Some("fake-embed"))
	);
	assert_eq!(
		http_client.requested_paths(),
		["/oauth/token", "/v1/cards/embed/auth", "/v1/cards/embed/auth"]
	);
}

#[tokio::test]
async fn custom_mapper_receives_endpoint_and_metadata() {
	let mapper = RecordingTransportErrorMapper::default();
	let broker = build_broker(FakeHttpClient::resetting(502), mapper.clone());
	let err = broker
		.service_token_for(Some(&SessionUser::with_email("u@x.com")))
		.await
		.expect_err("Resetting transport should fail the token request.");

	assert!(matches!(
		err,
		Error::Transport(TransportError::Network { endpoint: Endpoint::ServiceToken, .. })
	));

	let recorded = mapper.recorded();

	assert_eq!(recorded.len(), 1, "Mapper must record a single request.");
	assert_eq!(recorded[0].0, Endpoint::ServiceToken);
	assert_eq!(recorded[0].1.as_ref().and_then(|meta| meta.status), Some(502));
	assert!(broker.token_cache.is_empty());
}
