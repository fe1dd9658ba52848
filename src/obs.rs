//! Optional observability hooks for broker operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to wrap every broker operation in a span named `embed_broker.flow` with the
//!   `flow` and `stage` fields, and to emit `debug` events for token-cache lookups.
//! - Enable `metrics` to increment `embed_broker_flow_total` (labeled by `flow` + `outcome`) and
//!   `embed_broker_token_cache_total` (labeled by `outcome`).
//!
//! Without either feature every hook compiles down to a no-op.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Broker operations observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Client-credentials service token lookup or fetch.
	ServiceToken,
	/// Embed-auth exchange for one embed identifier.
	EmbedToken,
	/// Full embed configuration assembly for a session.
	EmbedConfiguration,
	/// Identity login callback.
	Login,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::ServiceToken => "service_token",
			FlowKind::EmbedToken => "embed_token",
			FlowKind::EmbedConfiguration => "embed_configuration",
			FlowKind::Login => "login",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a broker operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How a service-token lookup was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheOutcome {
	/// A fresh entry was already cached.
	Hit,
	/// No fresh entry existed and this caller fetched a new token.
	Miss,
	/// Another caller fetched the token while this one waited on the singleflight guard.
	Coalesced,
}
impl CacheOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheOutcome::Hit => "hit",
			CacheOutcome::Miss => "miss",
			CacheOutcome::Coalesced => "coalesced",
		}
	}
}
impl Display for CacheOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
