//! Repost Abuse Tracker
//!
//! Tracks originals vs. reposts per public key and rejects identities whose
//! activity would become mostly reposts. Counters restart after a period of
//! inactivity, and nothing is enforced until an identity has a minimum sample.
//!
//! The decision reads a snapshot under one lock and the counters are updated
//! under a second lock. Concurrent events from one identity can interleave
//! between the two, so the enforced ratio is approximate under load; this is
//! accepted for abuse mitigation.

use std::time::{Duration, Instant};

use regex::Regex;
use tracing::debug;

use crate::cache::TimedCache;
use crate::config::RepostAbuseConfig;
use crate::keying::IdentityKey;
use crate::prelude::*;

/// Content reference to another event (`note1…`, `nevent1…`, `naddr1…`)
const EVENT_REFERENCE_PATTERN: &str = r"\b(naddr1|nevent1|note1)[0-9a-z]+\b";

/// How a tracked event counts toward the ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostClass {
	Original,
	/// Dedicated repost kind
	Repost,
	/// Generic repost kind
	GenericRepost,
	/// Text note quoting another event
	Quote,
}

impl PostClass {
	pub fn is_repost(self) -> bool {
		!matches!(self, PostClass::Original)
	}
}

/// Rolling per-identity activity counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityStats {
	pub originals: u32,
	pub reposts: u32,
	pub last_activity: Option<Instant>,
}

impl ActivityStats {
	pub fn total(&self) -> u32 {
		self.originals.saturating_add(self.reposts)
	}

	/// Counters as seen at `now`: zeroed once the inactivity window has passed
	fn decayed(self, now: Instant, reset_after: Duration) -> Self {
		let idle = self
			.last_activity
			.is_some_and(|last| now.saturating_duration_since(last) > reset_after);
		if !reset_after.is_zero() && idle {
			Self { originals: 0, reposts: 0, ..self }
		} else {
			self
		}
	}
}

pub struct AbuseRatioTracker {
	enabled: bool,
	min_events: u32,
	max_ratio: f64,
	reset_after: Duration,
	count_reject_as_activity: bool,
	require_quote_reference: bool,
	event_reference: Regex,
	stats: TimedCache<IdentityKey, ActivityStats>,
	clock: SharedClock,
}

impl AbuseRatioTracker {
	pub fn new(config: &RepostAbuseConfig) -> RgResult<Self> {
		Self::with_clock(config, SystemClock::shared())
	}

	pub fn with_clock(config: &RepostAbuseConfig, clock: SharedClock) -> RgResult<Self> {
		if config.max_ratio.is_nan() {
			return Err(Error::ConfigError("repost abuse max ratio is not a number".into()));
		}
		let event_reference = Regex::new(EVENT_REFERENCE_PATTERN)
			.map_err(|e| Error::ConfigError(format!("event reference pattern: {}", e)))?;

		Ok(Self {
			enabled: config.enabled,
			min_events: config.min_events,
			max_ratio: config.max_ratio.clamp(0.0, 1.0),
			reset_after: config.reset_duration,
			count_reject_as_activity: config.count_reject_as_activity,
			require_quote_reference: config.require_quote_reference,
			event_reference,
			stats: TimedCache::new(config.cache_size, config.cache_ttl, clock.clone()),
			clock,
		})
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	pub fn max_ratio(&self) -> f64 {
		self.max_ratio
	}

	/// Classify an event; `None` for kinds this tracker ignores
	pub fn classify(&self, event: &Event) -> Option<PostClass> {
		match event.kind {
			kind::REPOST => Some(PostClass::Repost),
			kind::GENERIC_REPOST => Some(PostClass::GenericRepost),
			kind::TEXT_NOTE => {
				let quoted = event.has_tag("q")
					&& (!self.require_quote_reference
						|| self.event_reference.is_match(&event.content));
				Some(if quoted { PostClass::Quote } else { PostClass::Original })
			}
			_ => None,
		}
	}

	pub fn check(&self, event: &Event) -> Verdict {
		if !self.enabled || event.pubkey.is_empty() {
			return Verdict::Allow;
		}
		let Some(class) = self.classify(event) else {
			return Verdict::Allow;
		};

		let identity = IdentityKey::bare_pubkey(&event.pubkey);
		let now = self.clock.now();
		let snapshot = self.stats.get(&identity).unwrap_or_default().decayed(now, self.reset_after);

		let rejection = if class.is_repost() { self.judge(&snapshot) } else { None };

		let accepted = rejection.is_none();
		self.stats.upsert(identity, |fresh| {
			let mut fresh = fresh.unwrap_or_default().decayed(now, self.reset_after);
			if accepted || self.count_reject_as_activity {
				fresh.last_activity = Some(now);
			}
			if accepted {
				if class.is_repost() {
					fresh.reposts = fresh.reposts.saturating_add(1);
				} else {
					fresh.originals = fresh.originals.saturating_add(1);
				}
			}
			fresh
		});

		match rejection {
			Some(reason) => {
				debug!("repost ratio rejection for {}: {}", event.pubkey, reason);
				Verdict::Deny(reason)
			}
			None => Verdict::Allow,
		}
	}

	/// Reject reason if accepting one more repost would reach the limit
	fn judge(&self, stats: &ActivityStats) -> Option<String> {
		let total = stats.total();
		if total < self.min_events {
			return None;
		}

		let predicted = f64::from(stats.reposts) + 1.0;
		let ratio = predicted / (f64::from(total) + 1.0);
		if ratio >= self.max_ratio {
			Some(format!(
				"blocked: too many reposts. Your repost ratio would be {:.1}%, the limit is {:.1}%",
				ratio * 100.0,
				self.max_ratio * 100.0
			))
		} else {
			None
		}
	}

	/// Current counters for a public key, with inactivity reset applied
	pub fn stats_for(&self, pubkey: &str) -> Option<ActivityStats> {
		let now = self.clock.now();
		self.stats
			.get(&IdentityKey::bare_pubkey(pubkey))
			.map(|s| s.decayed(now, self.reset_after))
	}
}

impl Evaluator for AbuseRatioTracker {
	fn name(&self) -> &'static str {
		"repost_abuse"
	}

	fn evaluate(&self, event: &Event, _meta: &mut RequestMeta) -> RgResult<Verdict> {
		Ok(self.check(event))
	}
}


// vim: ts=4
