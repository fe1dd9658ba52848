// self
use crate::obs::{CacheOutcome, FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"embed_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts a token-cache lookup (when `metrics` is enabled).
pub fn record_cache_metric(outcome: CacheOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("embed_broker_token_cache_total", "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_flow_outcome(FlowKind::EmbedConfiguration, FlowOutcome::Failure);
		record_cache_metric(CacheOutcome::Coalesced);
	}
}
