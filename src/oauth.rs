//! Token-endpoint exchanges: the client-credentials grant, the `oauth2` login code exchange, and
//! the request helpers shared with the embed-auth call.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use oauth2::{
	AsyncHttpClient, AuthorizationCode, Client, ClientId as OAuthClientId, ClientSecret,
	EndpointNotSet, EndpointSet, ExtraTokenFields, HttpClientError, HttpRequest, HttpResponse,
	PkceCodeVerifier, RedirectUrl, RequestTokenError, StandardRevocableToken,
	StandardTokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, Secret, ServiceToken},
	error::{ConfigError, TokenRequestError},
	http::{Endpoint, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
};
#[cfg(feature = "reqwest")] use crate::error::TransportError;

pub(crate) const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// `expires_in` assumed when the token endpoint omits it.
pub const DEFAULT_EXPIRES_IN: Duration = Duration::seconds(300);

type LoginTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;
type LoginClient = Client<
	BasicErrorResponse,
	LoginTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// Maps HTTP transport failures into broker [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted while calling `endpoint` into a broker error.
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(endpoint, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TokenRequestError::Unexpected {
				endpoint,
				status: meta_status(meta),
				message: format!("HTTP client error: {message}"),
			}
			.into(),
			_ => TokenRequestError::Unexpected {
				endpoint,
				status: meta_status(meta),
				message: "unknown HTTP client error".into(),
			}
			.into(),
		}
	}
}

/// Extra token-response fields read during the login code exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenFields {
	/// Compact OpenID Connect ID token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
}
impl ExtraTokenFields for IdTokenFields {}

/// Body of a successful client-credentials response; only `access_token` is required.
#[derive(Debug, Deserialize)]
struct ServiceTokenBody {
	access_token: String,
	#[serde(default)]
	expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
	error: String,
}

/// Client-credentials exchange bound to one analytics client.
///
/// The request is built by hand so the Basic credentials carry the raw `client_id:secret` pair
/// and the response only needs `access_token`.
pub(crate) struct ServiceTokenFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	token_url: Url,
	client_id: ClientId,
	authorization: Secret,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> ServiceTokenFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(
		token_url: Url,
		client_id: &ClientId,
		client_secret: &Secret,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Self {
		Self {
			token_url,
			client_id: client_id.clone(),
			authorization: basic_authorization(client_id, client_secret),
			http_client,
			error_mapper,
		}
	}

	/// Runs `grant_type=client_credentials` with the provided scopes.
	pub(crate) async fn exchange_client_credentials(&self, scopes: &[&str]) -> Result<ServiceToken> {
		const ENDPOINT: Endpoint = Endpoint::ServiceToken;

		let mut form = form_urlencoded::Serializer::new(String::new());

		form.append_pair("grant_type", "client_credentials");

		if !scopes.is_empty() {
			form.append_pair("scope", &scopes.join(" "));
		}

		let request = Request::builder()
			.method(Method::POST)
			.uri(self.token_url.as_str())
			.header(AUTHORIZATION, self.authorization.expose())
			.header(ACCEPT, JSON)
			.header(CONTENT_TYPE, FORM)
			.body(form.finish().into_bytes())
			.map_err(ConfigError::from)?;
		let response =
			dispatch(self.http_client.as_ref(), self.error_mapper.as_ref(), ENDPOINT, request)
				.await?;

		if !response.status().is_success() {
			return Err(rejection(ENDPOINT, &response));
		}

		let body: ServiceTokenBody = parse_json(ENDPOINT, &response)?;
		let issued_at = OffsetDateTime::now_utc();
		let expires_in = match body.expires_in {
			Some(seconds) => i64::try_from(seconds)
				.map(Duration::seconds)
				.map_err(|_| expires_in_out_of_range())?,
			None => DEFAULT_EXPIRES_IN,
		};

		if issued_at.checked_add(expires_in).is_none() {
			return Err(expires_in_out_of_range());
		}

		Ok(ServiceToken::new(self.client_id.clone(), body.access_token, issued_at, expires_in))
	}
}

/// Authorization-code facade for the identity provider's token endpoint.
pub(crate) struct LoginFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: LoginClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> LoginFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Configures the client; a secret, when present, is sent with HTTP Basic.
	pub(crate) fn new(
		token_url: Url,
		client_id: &str,
		client_secret: Option<&Secret>,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Self {
		let mut oauth_client: LoginClient = Client::new(OAuthClientId::new(client_id.to_owned()))
			.set_token_uri(TokenUrl::from_url(token_url));

		if let Some(secret) = client_secret {
			oauth_client =
				oauth_client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
		}

		Self { oauth_client, http_client, error_mapper }
	}

	/// Exchanges an authorization code plus PKCE verifier and returns the raw ID token, if any.
	pub(crate) async fn exchange_code(
		&self,
		code: &str,
		pkce_verifier: &str,
		redirect_uri: &Url,
		scope: &str,
	) -> Result<Option<String>> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let mut request = self
			.oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_owned()))
			.set_redirect_uri(Cow::Owned(RedirectUrl::from_url(redirect_uri.clone())));

		if !scope.trim().is_empty() {
			request = request.add_extra_param("scope", scope.to_owned());
		}

		let response = request.request_async(&instrumented).await.map_err(|err| {
			map_request_error(Endpoint::LoginToken, meta.take(), err, self.error_mapper.as_ref())
		})?;

		Ok(response.extra_fields().id_token.clone().filter(|token| !token.is_empty()))
	}
}

/// Sends `request` through a metadata-tracking handle, mapping transport failures.
pub(crate) async fn dispatch<C, M>(
	http_client: &C,
	mapper: &M,
	endpoint: Endpoint,
	request: HttpRequest,
) -> Result<HttpResponse>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let meta = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(meta.clone());

	handle
		.call(request)
		.await
		.map_err(|err| mapper.map_transport_error(endpoint, meta.take().as_ref(), err))
}

/// Builds a [`TokenRequestError::Rejected`] for a non-2xx response, keeping the OAuth `error`
/// code when the body carries one.
pub(crate) fn rejection(endpoint: Endpoint, response: &HttpResponse) -> Error {
	let oauth_error =
		serde_json::from_slice::<OAuthErrorBody>(response.body()).ok().map(|body| body.error);

	TokenRequestError::Rejected { endpoint, status: Some(response.status().as_u16()), oauth_error }
		.into()
}

/// Parses a JSON success body, reporting the failing path on error.
pub(crate) fn parse_json<T>(endpoint: Endpoint, response: &HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		TokenRequestError::MalformedResponse {
			endpoint,
			status: Some(response.status().as_u16()),
			source,
		}
		.into()
	})
}

fn basic_authorization(client_id: &ClientId, client_secret: &Secret) -> Secret {
	let pair = format!("{client_id}:{}", client_secret.expose());

	Secret::new(format!("Basic {}", STANDARD.encode(pair)))
}

fn rejected_or(
	endpoint: Endpoint,
	meta: Option<&ResponseMetadata>,
	fallback: impl FnOnce() -> Error,
) -> Error {
	match meta {
		Some(meta) if meta.is_failure() =>
			TokenRequestError::Rejected { endpoint, status: meta.status, oauth_error: None }.into(),
		_ => fallback(),
	}
}

fn map_request_error<E, M>(
	endpoint: Endpoint,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => TokenRequestError::Rejected {
			endpoint,
			status: meta_status(meta_ref),
			oauth_error: Some(response.error().as_ref().to_owned()),
		}
		.into(),
		RequestTokenError::Request(error) => mapper.map_transport_error(endpoint, meta_ref, error),
		RequestTokenError::Parse(source, _body) => rejected_or(endpoint, meta_ref, || {
			TokenRequestError::MalformedResponse { endpoint, status: meta_status(meta_ref), source }
				.into()
		}),
		RequestTokenError::Other(message) => rejected_or(endpoint, meta_ref, || {
			TokenRequestError::Unexpected { endpoint, status: meta_status(meta_ref), message }.into()
		}),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(endpoint: Endpoint, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransportError::Timeout { endpoint }.into();
	}

	TransportError::network(endpoint, err).into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn expires_in_out_of_range() -> Error {
	TokenRequestError::Unexpected {
		endpoint: Endpoint::ServiceToken,
		status: None,
		message: "`expires_in` is out of range".into(),
	}
	.into()
}
