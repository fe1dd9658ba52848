//! Process-local service-token cache keyed by client identifier, with per-key singleflight.
//!
//! Keying by [`ClientId`] rather than by user lets every user that shares a client reuse one
//! token while users with distinct credentials stay isolated. The token map is guarded by a
//! plain mutex that is never held across an `.await`; concurrent misses for the same client
//! queue on that client's singleflight guard and re-check the map once they acquire it, so a
//! single token request serves all of them.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ServiceToken},
	obs::{self, CacheOutcome},
};

/// Safety margin: a cached token is never served once its expiry is this close.
pub const EXPIRY_MARGIN: Duration = Duration::seconds(5);

/// Explicit, injectable service-token cache.
#[derive(Debug, Default)]
pub struct ServiceTokenCache {
	entries: Mutex<HashMap<ClientId, ServiceToken>>,
	flights: Mutex<HashMap<ClientId, Arc<AsyncMutex<()>>>>,
}
impl ServiceTokenCache {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the cached token for `client_id` if it is still fresh at `now`.
	pub fn fresh(&self, client_id: &ClientId, now: OffsetDateTime) -> Option<ServiceToken> {
		self.entries
			.lock()
			.get(client_id)
			.filter(|token| token.is_fresh_at(now, EXPIRY_MARGIN))
			.cloned()
	}

	/// Returns the cached token for `client_id` regardless of freshness.
	pub fn get(&self, client_id: &ClientId) -> Option<ServiceToken> {
		self.entries.lock().get(client_id).cloned()
	}

	/// Stores `token` under its own client identifier, replacing any previous entry.
	pub fn insert(&self, token: ServiceToken) {
		self.entries.lock().insert(token.client_id.clone(), token);
	}

	/// Removes and returns the entry for `client_id`.
	pub fn evict(&self, client_id: &ClientId) -> Option<ServiceToken> {
		self.entries.lock().remove(client_id)
	}

	/// Number of cached entries, fresh or not.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns `true` if nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	/// Returns a fresh cached token or runs `fetch` to obtain and store a new one.
	///
	/// `fetch` runs at most once per concurrent wave of misses for `client_id`, without any
	/// cache lock held. A failed fetch leaves the existing entry, stale or absent, untouched.
	pub async fn get_or_fetch<F, Fut>(&self, client_id: &ClientId, fetch: F) -> Result<ServiceToken>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<ServiceToken>>,
	{
		if let Some(token) = self.fresh(client_id, OffsetDateTime::now_utc()) {
			obs::record_cache_outcome(client_id, CacheOutcome::Hit);

			return Ok(token);
		}

		let guard = self.flight_guard(client_id);
		let _singleflight = guard.lock().await;

		if let Some(token) = self.fresh(client_id, OffsetDateTime::now_utc()) {
			obs::record_cache_outcome(client_id, CacheOutcome::Coalesced);

			return Ok(token);
		}

		obs::record_cache_outcome(client_id, CacheOutcome::Miss);

		let mut token = fetch().await?;

		token.client_id = client_id.clone();

		self.insert(token.clone());

		Ok(token)
	}

	fn flight_guard(&self, client_id: &ClientId) -> Arc<AsyncMutex<()>> {
		let mut flights = self.flights.lock();

		flights.entry(client_id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
