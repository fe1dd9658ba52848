//! Credential-scoped analytics embed broker: resolve per-user client credentials, reuse cached
//! service tokens per client identifier, and exchange them for short-lived dashboard embed tokens.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod registry;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		cache::ServiceTokenCache,
		config::BrokerConfig,
		flows::EmbedBroker,
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		registry::CredentialRegistry,
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = EmbedBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.timeout(std::time::Duration::from_secs(5))
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a config pointing both the analytics API and the embed host at `base_url`.
	pub fn test_config(base_url: &str) -> BrokerConfig {
		let api_host = Url::parse(base_url).expect("Mock server base URL should parse.");
		let embed_host =
			Url::parse("https://embed.example.com").expect("Embed host fixture should parse.");

		BrokerConfig::new(api_host, embed_host)
	}

	/// Constructs an [`EmbedBroker`] backed by a fresh token cache and the reqwest transport used
	/// across integration tests.
	pub fn build_reqwest_test_broker(
		config: BrokerConfig,
		registry: CredentialRegistry,
	) -> (ReqwestTestBroker, Arc<ServiceTokenCache>) {
		let cache = Arc::new(ServiceTokenCache::default());
		let broker = EmbedBroker::with_http_client(
			config,
			registry,
			cache.clone(),
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		);

		(broker, cache)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::{Path, PathBuf},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
