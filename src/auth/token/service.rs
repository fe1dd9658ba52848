//! Service access token issued by the analytics platform's client-credentials grant.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, Secret},
};

/// Client-credentials bearer token bound to exactly one client identifier.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceToken {
	/// Client identifier the token was issued to; also its cache key.
	pub client_id: ClientId,
	/// Bearer token; callers must avoid logging it.
	pub access_token: Secret,
	/// Instant the token endpoint answered.
	pub issued_at: OffsetDateTime,
	/// Absolute expiry derived from `issued_at + expires_in`.
	pub expires_at: OffsetDateTime,
}
impl ServiceToken {
	/// Builds a token that expires `expires_in` after `issued_at`.
	pub fn new(
		client_id: ClientId,
		access_token: impl Into<Secret>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Self {
		Self {
			client_id,
			access_token: access_token.into(),
			issued_at,
			expires_at: issued_at + expires_in,
		}
	}

	/// Returns `true` while the expiry lies strictly beyond `instant + margin`.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		self.expires_at > instant + margin
	}
}
impl Debug for ServiceToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceToken")
			.field("client_id", &self.client_id)
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
