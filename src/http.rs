//! Transport primitives shared by the token, embed-auth, and login calls.
//!
//! The module exposes [`TokenHttpClient`] alongside [`ResponseMetadata`] and
//! [`ResponseMetadataSlot`] so downstream crates can plug in custom HTTP clients while the
//! broker keeps classifying failures by HTTP status. Implementations call
//! [`ResponseMetadataSlot::take`] before dispatching a request and
//! [`ResponseMetadataSlot::store`] once an HTTP status is known.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Remote endpoints the broker talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
	/// Analytics `POST /oauth/token` (client credentials).
	ServiceToken,
	/// Analytics `POST /v1/{card_target}/embed/auth`.
	EmbedAuth,
	/// Identity provider authorization endpoint.
	LoginAuthorize,
	/// Identity provider token endpoint (authorization-code exchange).
	LoginToken,
}
impl Endpoint {
	/// Returns a stable label suitable for errors, span fields, or metric labels.
	pub const fn as_str(self) -> &'static str {
		match self {
			Endpoint::ServiceToken => "service_token",
			Endpoint::EmbedAuth => "embed_auth",
			Endpoint::LoginAuthorize => "login_authorize",
			Endpoint::LoginToken => "login_token",
		}
	}
}
impl Display for Endpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Abstraction over HTTP transports used for every outbound broker call.
///
/// The trait is the broker's only dependency on an HTTP stack. The broker asks for a
/// short-lived [`AsyncHttpClient`] handle per request, each carrying a clone of a
/// [`ResponseMetadataSlot`]. Implementations must be `Send + Sync + 'static` so one transport
/// can be shared by every request, and the futures returned by their handles must be `Send`.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting the HTTP request.
	/// - Once an HTTP response (successful or erroneous) arrives, save its status with
	///   [`ResponseMetadataSlot::store`].
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
}
impl ResponseMetadata {
	/// Returns `true` when a status was recorded and it is outside the 2xx range.
	pub fn is_failure(&self) -> bool {
		self.status.is_some_and(|code| !(200..300).contains(&code))
	}
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Default transport: one shared [`ReqwestClient`] with redirects disabled.
///
/// Token and embed endpoints answer directly, so any client passed to
/// [`ReqwestHttpClient::with_client`] should disable redirects as well.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client with redirects disabled and a fixed per-request timeout.
	pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.timeout(timeout)
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ReqwestHandle { client: self.0.clone(), slot }
	}
}

/// Per-request handle handed out by [`ReqwestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
#[cfg(feature = "reqwest")]
impl ReqwestHandle {
	async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpClientError<ReqwestError>> {
		self.slot.take();

		let request = reqwest::Request::try_from(request).map_err(Box::new)?;
		let response = self.client.execute(request).await.map_err(Box::new)?;
		let status = response.status();

		self.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

		let headers = response.headers().clone();
		let body = response.bytes().await.map_err(Box::new)?;
		let mut converted = HttpResponse::new(body.to_vec());

		*converted.status_mut() = status;
		*converted.headers_mut() = headers;

		Ok(converted)
	}
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(self.send(request))
	}
}
